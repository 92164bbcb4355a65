//! In-memory storage implementation

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::application::errors::StorageError;
use crate::domain::traits::StorageBackend;

/// Process-local store, lost on exit
#[derive(Default)]
pub struct MemoryStorage {
    strings: RwLock<HashMap<String, String>>,
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// No keys of either kind stored
    pub fn is_empty(&self) -> bool {
        let strings = self.strings.read().map(|s| s.is_empty()).unwrap_or(true);
        let hashes = self.hashes.read().map(|h| h.is_empty()).unwrap_or(true);
        strings && hashes
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StorageError> {
    lock.read().map_err(|e| StorageError::LockPoisoned(e.to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StorageError> {
    lock.write().map_err(|e| StorageError::LockPoisoned(e.to_string()))
}

impl StorageBackend for MemoryStorage {
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(read(&self.strings)?.get(key).cloned())
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        write(&self.strings)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_key(&self, key: &str) -> Result<(), StorageError> {
        write(&self.strings)?.remove(key);
        Ok(())
    }

    fn get_hash(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        Ok(read(&self.hashes)?.get(key).cloned().unwrap_or_default())
    }

    fn set_hash(&self, key: &str, value: &HashMap<String, String>) -> Result<(), StorageError> {
        let mut hashes = write(&self.hashes)?;
        if value.is_empty() {
            hashes.remove(key);
        } else {
            hashes.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    fn delete_hash(&self, key: &str) -> Result<(), StorageError> {
        write(&self.hashes)?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings() {
        let store = MemoryStorage::new();
        assert_eq!(store.get_string("a").unwrap(), None);

        store.set_string("a", "1").unwrap();
        store.set_string("a", "2").unwrap();
        assert_eq!(store.get_string("a").unwrap().as_deref(), Some("2"));

        store.delete_key("a").unwrap();
        store.delete_key("a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_hash_is_replaced_whole() {
        let store = MemoryStorage::new();
        assert!(store.get_hash("h").unwrap().is_empty());

        store
            .set_hash("h", &HashMap::from([("x".to_string(), "1".to_string()), ("y".to_string(), "2".to_string())]))
            .unwrap();
        store.set_hash("h", &HashMap::from([("z".to_string(), "3".to_string())])).unwrap();

        let hash = store.get_hash("h").unwrap();
        assert_eq!(hash.len(), 1);
        assert_eq!(hash.get("z").map(String::as_str), Some("3"));

        store.delete_hash("h").unwrap();
        assert!(store.is_empty());
    }
}
