use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_KEY_LENGTH: usize = 128;
pub const MAX_VALUE_SIZE: usize = 4 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyNamespace {
    Vehicle,
}

impl KeyNamespace {
    pub fn prefix(&self) -> &str {
        match self {
            KeyNamespace::Vehicle => "vehicle",
        }
    }
}

/// Namespaced key as it is handed to the shell's key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey {
    namespace: KeyNamespace,
    key: String,
}

impl KvKey {
    pub fn new(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, KvError> {
        let key = key.into();
        Self::validate_key(&key)?;
        Ok(Self { namespace, key })
    }

    pub fn raw(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.key)
    }

    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn validate_key(key: &str) -> Result<(), KvError> {
        if key.trim().is_empty() {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot be empty".to_string(),
            });
        }

        if key.len() > MAX_KEY_LENGTH {
            return Err(KvError::InvalidKey {
                key: key.chars().take(32).collect::<String>() + "...",
                reason: format!("key exceeds maximum length of {MAX_KEY_LENGTH} bytes"),
            });
        }

        if key.contains(':') {
            return Err(KvError::InvalidKey {
                key: key.to_string(),
                reason: "key cannot contain the namespace separator".to_string(),
            });
        }

        if key.chars().any(char::is_control) {
            return Err(KvError::InvalidKey {
                key: key.replace('\0', "\\0"),
                reason: "key contains control characters".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes (max {max})")]
    ValueTooLarge { size: usize, max: usize },

    #[error("value for '{key}' is not valid UTF-8")]
    NotUtf8 { key: String },

    #[error("storage error: {message}")]
    Storage { message: String },
}

impl KvError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

/// Encodes a text value for the store.
pub fn encode_text(value: &str) -> Result<Vec<u8>, KvError> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(KvError::ValueTooLarge {
            size: value.len(),
            max: MAX_VALUE_SIZE,
        });
    }
    Ok(value.as_bytes().to_vec())
}

/// Decodes what the shell returned for `key`. A missing or empty value is
/// `None`.
pub fn decode_text(key: &KvKey, stored: Option<Vec<u8>>) -> Result<Option<String>, KvError> {
    match stored {
        None => Ok(None),
        Some(bytes) if bytes.is_empty() => Ok(None),
        Some(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| KvError::NotUtf8 { key: key.raw() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation_empty() {
        assert!(KvKey::new(KeyNamespace::Vehicle, "").is_err());
        assert!(KvKey::new(KeyNamespace::Vehicle, "   ").is_err());
    }

    #[test]
    fn test_key_validation_separator() {
        assert!(KvKey::new(KeyNamespace::Vehicle, "a:b").is_err());
    }

    #[test]
    fn test_key_validation_control_chars() {
        assert!(KvKey::new(KeyNamespace::Vehicle, "num\0ber").is_err());
        assert!(KvKey::new(KeyNamespace::Vehicle, "num\nber").is_err());
    }

    #[test]
    fn test_key_validation_too_long() {
        let long = "k".repeat(MAX_KEY_LENGTH + 1);
        assert!(matches!(
            KvKey::new(KeyNamespace::Vehicle, long),
            Err(KvError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_raw_key_is_namespaced() {
        let key = KvKey::new(KeyNamespace::Vehicle, "number").unwrap();
        assert_eq!(key.raw(), "vehicle:number");
        assert_eq!(key.key(), "number");
        assert_eq!(key.namespace(), &KeyNamespace::Vehicle);
    }

    #[test]
    fn test_decode_text() {
        let key = KvKey::new(KeyNamespace::Vehicle, "model").unwrap();
        assert_eq!(decode_text(&key, None), Ok(None));
        assert_eq!(decode_text(&key, Some(Vec::new())), Ok(None));
        assert_eq!(
            decode_text(&key, Some(b"Dzire".to_vec())),
            Ok(Some("Dzire".to_string()))
        );
        assert_eq!(
            decode_text(&key, Some(vec![0xff, 0xfe])),
            Err(KvError::NotUtf8 { key: "vehicle:model".into() })
        );
    }

    #[test]
    fn test_encode_limit() {
        assert!(encode_text("KA 01 AB 1234").is_ok());
        assert!(matches!(
            encode_text(&"x".repeat(MAX_VALUE_SIZE + 1)),
            Err(KvError::ValueTooLarge { .. })
        ));
    }

    #[test]
    fn test_error_retryable() {
        assert!(KvError::Storage { message: "disk full".into() }.is_retryable());
        assert!(!KvError::NotUtf8 { key: "k".into() }.is_retryable());
    }
}
