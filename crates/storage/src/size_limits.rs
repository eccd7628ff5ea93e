//! Key and value size validation for ledger writes.
//!
//! Hosts cap the size of state keys and values; checking locally turns an
//! oversized write into a [`StorageError::SizeLimitExceeded`] at commit time
//! instead of an opaque rejection from the host.
//!
//! | Limit | Default |
//! |-------|---------|
//! | `max_key_size` | 256 bytes |
//! | `max_value_size` | 1 MiB |

use crate::{ConfigError, StorageError};

/// Default maximum key size in bytes.
pub const DEFAULT_MAX_KEY_SIZE: usize = 256;

/// Default maximum value size in bytes (1 MiB).
pub const DEFAULT_MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Configurable size limits for keys and values.
///
/// # Example
///
/// ```
/// use datashare_storage::SizeLimits;
///
/// let limits = SizeLimits::new(64, 4096).unwrap();
/// assert_eq!(limits.max_key_size(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    max_key_size: usize,
    max_value_size: usize,
}

impl SizeLimits {
    /// Creates size limits with the given bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if either limit is zero.
    pub fn new(max_key_size: usize, max_value_size: usize) -> Result<Self, ConfigError> {
        for (field, value) in [("max_key_size", max_key_size), ("max_value_size", max_value_size)] {
            if value == 0 {
                return Err(ConfigError::BelowMinimum {
                    field,
                    min: "1".into(),
                    value: value.to_string(),
                });
            }
        }
        Ok(Self { max_key_size, max_value_size })
    }

    /// Returns the maximum allowed key size in bytes.
    #[must_use]
    pub fn max_key_size(&self) -> usize {
        self.max_key_size
    }

    /// Returns the maximum allowed value size in bytes.
    #[must_use]
    pub fn max_value_size(&self) -> usize {
        self.max_value_size
    }

    /// Checks one `(key, value)` write against these limits.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SizeLimitExceeded`] naming the part that is
    /// too large. The key is checked first.
    pub fn check_write(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.check_key(key)?;
        if value.len() > self.max_value_size {
            return Err(StorageError::size_limit_exceeded(
                "value",
                value.len(),
                self.max_value_size,
            ));
        }
        Ok(())
    }

    /// Checks a key on its own, for deletes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SizeLimitExceeded`] if the key is too large.
    pub fn check_key(&self, key: &[u8]) -> Result<(), StorageError> {
        if key.len() > self.max_key_size {
            return Err(StorageError::size_limit_exceeded("key", key.len(), self.max_key_size));
        }
        Ok(())
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self { max_key_size: DEFAULT_MAX_KEY_SIZE, max_value_size: DEFAULT_MAX_VALUE_SIZE }
    }
}
