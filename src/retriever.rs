//! Secret retrieval capability.
//!
//! The long-lived IAM key lives in an external secrets manager. The pipeline
//! only sees the [`SecretRetriever`] trait, so it can be exercised with
//! [`MockRetriever`](crate::backends::mock::MockRetriever) instead of a real
//! binary.

use crate::{LongLivedSecret, Result};
use async_trait::async_trait;

/// Where the long-lived key pair lives and how its fields are labelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretLocator {
    /// Vault name or ID
    pub vault: String,
    /// Item name or ID
    pub item: String,
    /// Label of the field holding the access key ID
    pub access_key_id_field: String,
    /// Label of the field holding the secret access key
    pub secret_access_key_field: String,
}

impl SecretLocator {
    /// Builds the locator described by a run configuration.
    pub fn from_config(config: &crate::Config) -> Self {
        Self {
            vault: config.vault.clone(),
            item: config.item.clone(),
            access_key_id_field: config.access_key_id_field.clone(),
            secret_access_key_field: config.secret_access_key_field.clone(),
        }
    }
}

/// Fetches the long-lived key pair from a secrets manager.
///
/// Implementations must be `Send + Sync`.
///
/// # Implementations
///
/// - **CLI-based**: 1Password (`op`)
/// - **Testing**: Mock retriever with error injection
#[async_trait]
pub trait SecretRetriever: Send + Sync {
    /// Returns the retriever name (e.g., "onepassword").
    fn name(&self) -> &str;

    /// Retrieves the key pair named by `locator`.
    ///
    /// No retry is attempted; the first failure is returned.
    ///
    /// # Errors
    ///
    /// - [`HelperError::CommandFailed`](crate::HelperError::CommandFailed):
    ///   the external tool exited non-zero (stderr attached)
    /// - [`HelperError::MalformedOutput`](crate::HelperError::MalformedOutput):
    ///   the tool's output could not be parsed
    /// - [`HelperError::MissingField`](crate::HelperError::MissingField):
    ///   one or both labels are absent from the item
    async fn retrieve(&self, locator: &SecretLocator) -> Result<LongLivedSecret>;
}
