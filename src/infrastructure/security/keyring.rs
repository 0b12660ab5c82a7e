use crate::domain::error::{AppError, Result};
use keyring::Entry;

const KEYRING_USER: &str = "fundscope";

pub struct KeyringManager {
    service: String,
}

impl KeyringManager {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&format!("{}.{}", self.service, key), KEYRING_USER)
            .map_err(|e| AppError::SecurityError(format!("Failed to create entry: {}", e)))
    }

    pub fn get_secret(&self, key: &str) -> Result<String> {
        self.entry(key)?
            .get_password()
            .map_err(|e| AppError::SecurityError(format!("Failed to get secret '{}': {}", key, e)))
    }
}

/// Where a credential lives.
///
/// - `env:NAME` reads the environment variable `NAME`
/// - `keychain:NAME` reads the OS keychain entry `NAME`
/// - `plain:VALUE` is the value itself (development only)
/// - anything else is treated as the literal value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef {
    Env(String),
    Keychain(String),
    Plain(String),
}

impl SecretRef {
    pub fn parse(reference: &str) -> Self {
        if let Some(name) = reference.strip_prefix("env:") {
            SecretRef::Env(name.to_string())
        } else if let Some(name) = reference.strip_prefix("keychain:") {
            SecretRef::Keychain(name.to_string())
        } else if let Some(value) = reference.strip_prefix("plain:") {
            SecretRef::Plain(value.to_string())
        } else {
            SecretRef::Plain(reference.to_string())
        }
    }

    pub fn resolve(&self, keyring: &KeyringManager) -> Result<String> {
        match self {
            SecretRef::Env(name) => std::env::var(name).map_err(|_| {
                AppError::SecurityError(format!("Environment variable '{}' is not set", name))
            }),
            SecretRef::Keychain(name) => keyring.get_secret(name),
            SecretRef::Plain(value) => Ok(value.clone()),
        }
    }
}
