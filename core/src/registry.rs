//! Named client instances.
//!
//! A plain map from name to shared [`Api`], owned by whoever needs it. There
//! is no eviction; entries live as long as the registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::client::Api;
use crate::error::{ApiError, Result};

#[derive(Debug, Default)]
pub struct Registry {
    instances: RwLock<HashMap<String, Arc<Api>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `api` under `name`. Fails if the name is taken, unless
    /// `overwrite` is set.
    pub fn remember(
        &self,
        name: impl Into<String>,
        api: Arc<Api>,
        overwrite: bool,
    ) -> Result<Arc<Api>> {
        let name = name.into();
        let mut instances = self.instances.write();
        if !overwrite && instances.contains_key(&name) {
            return Err(ApiError::InstanceExists(name));
        }
        instances.insert(name, Arc::clone(&api));
        Ok(api)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Api>> {
        self.instances.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }
}
