//! Contract configuration.
//!
//! The defaults reproduce the contract's historical behavior: references
//! between records are not enforced and pending-request listings are
//! unbounded. Both can be tightened per deployment.
//!
//! ```
//! use datashare_contract::ContractConfig;
//!
//! let config = ContractConfig::builder()
//!     .strict_references(true)
//!     .max_pending_results(500)
//!     .build()?;
//! assert!(config.strict_references());
//! # Ok::<(), datashare_storage::ConfigError>(())
//! ```
//!
//! Configuration can also be loaded from JSON; unknown fields are rejected:
//!
//! ```
//! use datashare_contract::ContractConfig;
//!
//! let config: ContractConfig = serde_json::from_str(r#"{"max_pending_results": 10}"#)?;
//! assert_eq!(config.max_pending_results(), Some(10));
//! assert!(!config.strict_references());
//! # Ok::<(), serde_json::Error>(())
//! ```

use datashare_storage::ConfigError;
use serde::{Deserialize, Serialize};

/// Smallest accepted `max_pending_results`.
pub const MIN_PENDING_RESULTS: usize = 1;

/// Settings for [`DataSharingContract`](crate::DataSharingContract).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractConfig {
    /// Require `requestData` / `handleRequest` references to point at a
    /// record of the expected kind.
    #[serde(default)]
    pub(crate) strict_references: bool,

    /// Upper bound on the number of entries a pending-request listing may
    /// return. `None` means unbounded.
    #[serde(default)]
    pub(crate) max_pending_results: Option<usize>,
}

#[bon::bon]
impl ContractConfig {
    /// Creates a validated configuration.
    ///
    /// # Optional Fields
    ///
    /// * `strict_references` - Enforce record references (default: false).
    /// * `max_pending_results` - Listing bound (default: unbounded).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if `max_pending_results` is zero.
    #[builder]
    pub fn new(
        #[builder(default)] strict_references: bool,
        max_pending_results: Option<usize>,
    ) -> Result<Self, ConfigError> {
        let config = Self { strict_references, max_pending_results };
        config.validate()?;
        Ok(config)
    }

    /// Checks every setting against its allowed range.
    ///
    /// Deserialized configurations are not validated until this is called;
    /// [`DataSharingContract::new`](crate::DataSharingContract::new) calls it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if `max_pending_results` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(limit) = self.max_pending_results
            && limit < MIN_PENDING_RESULTS
        {
            return Err(ConfigError::BelowMinimum {
                field: "max_pending_results",
                min: MIN_PENDING_RESULTS.to_string(),
                value: limit.to_string(),
            });
        }
        Ok(())
    }

    /// Returns whether record references are enforced.
    #[must_use]
    pub fn strict_references(&self) -> bool {
        self.strict_references
    }

    /// Returns the pending-request listing bound, if any.
    #[must_use]
    pub fn max_pending_results(&self) -> Option<usize> {
        self.max_pending_results
    }
}
