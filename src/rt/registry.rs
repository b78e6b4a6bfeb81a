use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::anyhow;
use tracing::{debug, warn};

use super::Error;

type Entry = Arc<dyn Any + Send + Sync>;

/// Service implementations registered by the generated `register_*` functions, keyed by
/// fully qualified service name. One implementation per name: registering again replaces
/// the earlier one, and routes already added to a router serve the replacement from their
/// next request on. Clones share one table.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: Arc<RwLock<HashMap<String, Entry>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `server` under `name`, replacing any earlier implementation.
    pub fn register<S: Send + Sync + 'static>(&self, name: &str, server: S) -> Arc<S> {
        let server = Arc::new(server);
        let entry: Entry = server.clone();
        let replaced = self
            .services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), entry);
        if replaced.is_some() {
            warn!(service = name, "service implementation replaced");
        } else {
            debug!(service = name, "service registered");
        }
        server
    }

    /// The implementation registered under `name`, if it has type `S`.
    pub fn get<S: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<S>> {
        let entry = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()?;
        entry.downcast::<S>().ok()
    }

    /// The implementation generated handlers call for `name`. Fails when nothing of type `S`
    /// is registered under `name`.
    pub fn resolve<S: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<S>, Error> {
        self.get::<S>(name).ok_or_else(|| {
            anyhow!(
                "service {name} has no registered implementation of type {}",
                std::any::type_name::<S>()
            )
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.services.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.service_names())
            .finish()
    }
}
