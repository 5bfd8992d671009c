//! Error types for credential acquisition.

use thiserror::Error;

/// Result type alias using [`HelperError`].
pub type Result<T> = std::result::Result<T, HelperError>;

/// Errors that can occur while acquiring a session credential.
///
/// Every variant except [`HelperError::CacheWrite`] is fatal to a run.
/// Cache read failures never surface as errors at all; they degrade to a
/// cache miss inside [`CredentialCache::load`](crate::cache::CredentialCache::load).
#[derive(Debug, Error)]
pub enum HelperError {
    /// Profile is not present in the shared AWS config file.
    #[error("profile not found in AWS config: {0}")]
    ProfileNotFound(String),

    /// Profile exists but has no `mfa_serial` entry.
    #[error("profile {0} has no mfa_serial configured")]
    MissingMfaSerial(String),

    /// Shared configuration could not be located or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Required CLI tool is not installed.
    #[error("secrets manager CLI not installed: {0}")]
    RetrieverNotInstalled(String),

    /// External command exited unsuccessfully.
    #[error("{program} failed with exit code {code}: {stderr}")]
    CommandFailed {
        /// Program that was executed
        program: String,
        /// Exit code, or -1 when terminated by a signal
        code: i32,
        /// Captured diagnostic output
        stderr: String,
    },

    /// Secrets manager output was not the expected JSON shape.
    #[error("malformed secrets manager output: {0}")]
    MalformedOutput(String),

    /// One or both configured field labels were absent from the item.
    #[error("missing credential field(s) in item {item}: {}", .fields.join(", "))]
    MissingField {
        /// Item that was queried
        item: String,
        /// Labels that were absent or empty
        fields: Vec<String>,
    },

    /// Controlling terminal could not be opened or read.
    #[error("cannot read MFA code from terminal: {0}")]
    MfaPrompt(#[source] std::io::Error),

    /// Terminal read succeeded but the line was blank.
    #[error("no MFA code entered")]
    EmptyMfaCode,

    /// Token service rejected the request or could not be reached.
    #[error("GetSessionToken failed: {0}")]
    Exchange(String),

    /// Credential could not be persisted for reuse.
    #[error("failed to write credential cache {path}: {source}")]
    CacheWrite {
        /// Record path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Caller-supplied value failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Run was cancelled before completing.
    #[error("cancelled")]
    Cancelled,

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HelperError {
    /// Returns true when the error points at wrong settings rather than a
    /// broken tool or service.
    ///
    /// # Example
    ///
    /// ```
    /// use op_aws_credential_helper::HelperError;
    ///
    /// let missing = HelperError::MissingField {
    ///     item: "aws".to_string(),
    ///     fields: vec!["username".to_string()],
    /// };
    /// assert!(missing.is_misconfiguration());
    ///
    /// let failed = HelperError::CommandFailed {
    ///     program: "op".to_string(),
    ///     code: 1,
    ///     stderr: "network unreachable".to_string(),
    /// };
    /// assert!(!failed.is_misconfiguration());
    /// ```
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. }
                | Self::ProfileNotFound(_)
                | Self::MissingMfaSerial(_)
                | Self::Config(_)
                | Self::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = HelperError::ProfileNotFound("prod".to_string());
        assert_eq!(err.to_string(), "profile not found in AWS config: prod");
    }

    #[test]
    fn test_missing_field_lists_labels() {
        let err = HelperError::MissingField {
            item: "aws-iam".to_string(),
            fields: vec!["username".to_string(), "credential".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "missing credential field(s) in item aws-iam: username, credential"
        );
    }

    #[test]
    fn test_command_failed_carries_stderr() {
        let err = HelperError::CommandFailed {
            program: "op".to_string(),
            code: 1,
            stderr: "[ERROR] item not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("item not found"));
        assert!(!err.is_misconfiguration());
    }

    #[test]
    fn test_cache_write_source_chain() {
        let err = HelperError::CacheWrite {
            path: "/tmp/x.json".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.source().is_some());
    }
}
