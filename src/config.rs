//! Run configuration threaded into the pipeline at construction.

use crate::validation::{validate_field_label, validate_profile, validate_reference};
use crate::{HelperError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Profile used when none is given.
pub const DEFAULT_PROFILE: &str = "default";

/// Requested session lifetime when none is given.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(12 * 60 * 60);

/// Shortest session STS `GetSessionToken` will issue.
pub const MIN_SESSION_DURATION: Duration = Duration::from_secs(15 * 60);

/// Longest session STS `GetSessionToken` will issue for an IAM user.
pub const MAX_SESSION_DURATION: Duration = Duration::from_secs(36 * 60 * 60);

/// 1Password field holding the access key ID.
pub const DEFAULT_ACCESS_KEY_ID_FIELD: &str = "username";

/// 1Password field holding the secret access key.
pub const DEFAULT_SECRET_ACCESS_KEY_FIELD: &str = "credential";

/// 1Password CLI, resolved through `PATH`.
pub const DEFAULT_OP_CLI_PATH: &str = "op";

/// Directory name under the user cache directory.
pub const CACHE_DIR_NAME: &str = "op-aws-credential-helper";

/// Configuration for a single credential acquisition run.
///
/// Use the builder pattern for ergonomic configuration:
///
/// ```
/// use op_aws_credential_helper::Config;
/// use std::time::Duration;
///
/// let config = Config::new("Private", "AWS IAM")
///     .with_profile("prod")
///     .with_duration(Duration::from_secs(3600))
///     .with_fields("Access key ID", "Secret access key");
///
/// assert_eq!(config.profile, "prod");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// AWS profile; also the cache key
    pub profile: String,

    /// Requested session lifetime
    pub duration: Duration,

    /// 1Password vault holding the IAM key
    pub vault: String,

    /// 1Password item holding the IAM key
    pub item: String,

    /// Field label for the access key ID
    pub access_key_id_field: String,

    /// Field label for the secret access key
    pub secret_access_key_field: String,

    /// Path to the `op` executable
    pub op_cli_path: String,

    /// Cache directory override (default: XDG cache directory)
    pub cache_dir: Option<PathBuf>,

    /// Build version reported by `--version`
    pub version: String,
}

impl Config {
    /// Creates a configuration for the given vault and item with all other
    /// settings at their defaults.
    pub fn new(vault: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            duration: DEFAULT_SESSION_DURATION,
            vault: vault.into(),
            item: item.into(),
            access_key_id_field: DEFAULT_ACCESS_KEY_ID_FIELD.to_string(),
            secret_access_key_field: DEFAULT_SECRET_ACCESS_KEY_FIELD.to_string(),
            op_cli_path: DEFAULT_OP_CLI_PATH.to_string(),
            cache_dir: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Sets the AWS profile name.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Sets the requested session lifetime.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Sets both 1Password field labels.
    pub fn with_fields(
        mut self,
        access_key_id_field: impl Into<String>,
        secret_access_key_field: impl Into<String>,
    ) -> Self {
        self.access_key_id_field = access_key_id_field.into();
        self.secret_access_key_field = secret_access_key_field.into();
        self
    }

    /// Sets the path to the `op` executable.
    pub fn with_op_cli_path(mut self, path: impl Into<String>) -> Self {
        self.op_cli_path = path.into();
        self
    }

    /// Overrides the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Sets the reported build version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Requested duration in whole seconds, as STS expects it.
    pub fn duration_seconds(&self) -> i32 {
        i32::try_from(self.duration.as_secs()).unwrap_or(i32::MAX)
    }

    /// Checks the whole configuration before any I/O happens.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError::InvalidInput`] naming the first offending value.
    pub fn validate(&self) -> Result<()> {
        validate_profile(&self.profile)?;
        validate_reference("vault", &self.vault)?;
        validate_reference("item", &self.item)?;
        validate_field_label(&self.access_key_id_field)?;
        validate_field_label(&self.secret_access_key_field)?;

        if self.access_key_id_field == self.secret_access_key_field {
            return Err(HelperError::InvalidInput(format!(
                "access key and secret key fields must differ (both are {:?})",
                self.access_key_id_field
            )));
        }

        if self.duration < MIN_SESSION_DURATION || self.duration > MAX_SESSION_DURATION {
            return Err(HelperError::InvalidInput(format!(
                "session duration {} is outside the allowed range {} to {}",
                humantime::format_duration(self.duration),
                humantime::format_duration(MIN_SESSION_DURATION),
                humantime::format_duration(MAX_SESSION_DURATION)
            )));
        }

        Ok(())
    }
}
