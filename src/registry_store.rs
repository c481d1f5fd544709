//! A thread-safe holder of the currently active [`Registry`].
use std::sync::{Arc, RwLock};

use crate::Registry;

/// `RegistryStore` provides a thread-safe (`Sync`) storage for the active [`Registry`].
///
/// Configuration replaces the registry as a whole, so a reader that obtained a registry keeps a
/// consistent view even if a new configuration is stored while it is resolving.
#[derive(Debug, Default)]
pub struct RegistryStore {
    registry: RwLock<Option<Arc<Registry>>>,
}

impl RegistryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        RegistryStore::default()
    }

    /// Get the active registry. Returns `None` if nothing has been configured yet.
    pub fn get_registry(&self) -> Option<Arc<Registry>> {
        // Err() is possible only if the lock is poisoned (writer panicked while holding the lock),
        // which should never happen.
        let registry = self
            .registry
            .read()
            .expect("thread holding registry lock should not panic");

        registry.clone()
    }

    /// Set a new registry, returning the previous one.
    pub fn set_registry(&self, registry: Registry) -> Option<Arc<Registry>> {
        // Constructing new value before requesting the lock to minimize lock span.
        let new_value = Some(Arc::new(registry));

        let mut slot = self
            .registry
            .write()
            .expect("thread holding registry lock should not panic");

        std::mem::replace(&mut *slot, new_value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::RegistryStore;
    use crate::Registry;

    #[test]
    fn can_set_registry_from_another_thread() {
        let store = Arc::new(RegistryStore::new());

        assert!(store.get_registry().is_none());

        {
            let store = store.clone();
            let _ = std::thread::spawn(move || store.set_registry(Registry::new())).join();
        }

        assert!(store.get_registry().is_some());
    }

    #[test]
    fn readers_keep_their_registry() {
        let store = RegistryStore::new();
        store.set_registry(Registry::new());

        let before = store.get_registry().unwrap();
        let previous = store.set_registry(Registry::new()).unwrap();

        assert!(Arc::ptr_eq(&before, &previous));
        assert!(!Arc::ptr_eq(&before, &store.get_registry().unwrap()));
    }
}
