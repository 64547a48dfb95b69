//! Leaf certificate storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rustls::sign::CertifiedKey;

/// Storage for issued leaf certificates, keyed by server name.
///
/// Implementations must be safe for concurrent access; the TLS layer calls
/// `get`/`put` from whichever connection task is performing a handshake.
pub trait TlsStorage: Send + Sync {
    fn get(&self, server_name: &str) -> Option<Arc<CertifiedKey>>;
    fn put(&self, server_name: &str, key: Arc<CertifiedKey>);
}

/// Process-local, non-persistent storage. Certificates are lost on restart
/// and reissued from the CA on demand.
#[derive(Default)]
pub struct MemoryStorage {
    certs: RwLock<HashMap<String, Arc<CertifiedKey>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TlsStorage for MemoryStorage {
    // A panic in one handshake must not poison the map for every later
    // handshake; the stored values stay consistent either way.
    fn get(&self, server_name: &str) -> Option<Arc<CertifiedKey>> {
        self.certs
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(server_name)
            .cloned()
    }

    fn put(&self, server_name: &str, key: Arc<CertifiedKey>) {
        self.certs
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(server_name.to_string(), key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::{ca, DynamicResolver};

    #[test]
    fn test_memory_storage_get_miss() {
        let storage = MemoryStorage::new();
        assert!(storage.get("example.com").is_none());
    }

    #[test]
    fn test_memory_storage_survives_poisoned_lock() {
        let dir = tempfile::tempdir().unwrap();
        let ca = Arc::new(ca::load_or_gen(dir.path()).unwrap());
        let storage = Arc::new(MemoryStorage::new());
        let resolver = DynamicResolver::new(ca, storage.clone());

        // Panic while holding the write lock, poisoning it
        let poisoner = storage.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.certs.write().unwrap();
            panic!("poisoning the storage lock");
        })
        .join();

        // Later handshakes still issue and cache certificates
        let issued = resolver.lookup("example.com").unwrap();
        let stored = storage.get("example.com").unwrap();
        assert!(Arc::ptr_eq(&issued, &stored));
    }

    #[test]
    fn test_memory_storage_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let ca = Arc::new(ca::load_or_gen(dir.path()).unwrap());
        let storage = Arc::new(MemoryStorage::new());
        let resolver = DynamicResolver::new(ca, storage.clone());

        let issued = resolver.lookup("example.com").unwrap();
        let stored = storage.get("example.com").unwrap();
        assert!(Arc::ptr_eq(&issued, &stored));
    }
}
