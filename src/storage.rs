use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub const KEYRING_SERVICE: &str = "com.devotional.app";
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const ONBOARDING_COMPLETED_KEY: &str = "onboarding_completed";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("secure storage is unavailable")]
    Unavailable(#[source] keyring::Error),
    #[error("secure storage operation failed")]
    Keyring(#[source] keyring::Error),
}

/// Key-value secret storage. Implementations treat a missing key as
/// `Ok(None)` on read and as success on delete.
pub trait SecureStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

fn classify(err: keyring::Error) -> StorageError {
    match err {
        keyring::Error::NoStorageAccess(_) | keyring::Error::PlatformFailure(_) => {
            StorageError::Unavailable(err)
        }
        other => StorageError::Keyring(other),
    }
}

/// OS keychain / secret service backed store.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service, key).map_err(classify)
    }
}

impl SecureStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::BadEncoding(_)) => Ok(None),
            Err(keyring::Error::Ambiguous(_)) => Ok(None),
            Err(err) => Err(classify(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value).map_err(classify)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(classify(err)),
        }
    }
}

/// Process-local store, used where no OS keychain exists and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl SecureStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        guard.remove(key);
        Ok(())
    }
}

/// Typed access to the two persisted keys. Cheap to clone.
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn SecureStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self { store }
    }

    /// The stored access token. A blank value counts as no token.
    pub fn access_token(&self) -> Result<Option<String>, StorageError> {
        let token = self.store.get(ACCESS_TOKEN_KEY)?;
        Ok(token.and_then(|t| {
            let trimmed = t.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }))
    }

    pub fn has_access_token(&self) -> bool {
        matches!(self.access_token(), Ok(Some(_)))
    }

    pub fn store_access_token(&self, token: &str) -> Result<(), StorageError> {
        self.store.set(ACCESS_TOKEN_KEY, token.trim())
    }

    pub fn clear_access_token(&self) -> Result<(), StorageError> {
        self.store.delete(ACCESS_TOKEN_KEY)
    }

    pub fn has_completed_onboarding(&self) -> bool {
        matches!(
            self.store.get(ONBOARDING_COMPLETED_KEY),
            Ok(Some(value)) if value == "true"
        )
    }

    pub fn complete_onboarding(&self) -> Result<(), StorageError> {
        self.store.set(ONBOARDING_COMPLETED_KEY, "true")
    }
}
