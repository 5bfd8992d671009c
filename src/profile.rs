//! Shared AWS config resolution (profile -> region and MFA device).

use crate::{HelperError, Result};
use async_trait::async_trait;
use ini::Ini;
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default AWS region for STS operations when no region is configured.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// What the pipeline needs to know about a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSettings {
    /// Region used for the STS call
    pub region: String,
    /// MFA device serial number or ARN
    pub mfa_serial: String,
}

/// Resolves a profile name to its settings.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    /// Looks up `profile`.
    ///
    /// # Errors
    ///
    /// - [`HelperError::ProfileNotFound`]: no such profile
    /// - [`HelperError::MissingMfaSerial`]: profile has no `mfa_serial`
    /// - [`HelperError::Config`]: config file missing or unparsable
    async fn resolve(&self, profile: &str) -> Result<ProfileSettings>;
}

/// Get the AWS config file path.
/// Respects AWS_CONFIG_FILE environment variable if set.
pub fn get_aws_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("AWS_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| home.join(".aws").join("config"))
}

/// Reads profiles from the shared AWS config file (`~/.aws/config`).
#[derive(Debug, Clone)]
pub struct SharedConfigResolver {
    path: PathBuf,
    fallback_region: Option<String>,
}

impl SharedConfigResolver {
    /// Creates a resolver for an explicit config file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            fallback_region: None,
        }
    }

    /// Creates a resolver from the environment: `AWS_CONFIG_FILE` for the
    /// file, `AWS_REGION` then `AWS_DEFAULT_REGION` for the fallback region.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError::Config`] if no home directory can be found.
    pub fn from_env() -> Result<Self> {
        let path = get_aws_config_path()
            .ok_or_else(|| HelperError::Config("failed to determine AWS config path".to_string()))?;

        let fallback_region = ["AWS_REGION", "AWS_DEFAULT_REGION"]
            .iter()
            .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()));

        Ok(Self {
            path,
            fallback_region,
        })
    }

    /// Sets the region used when the profile has none.
    pub fn with_fallback_region(mut self, region: impl Into<String>) -> Self {
        self.fallback_region = Some(region.into());
        self
    }

    /// Config file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn settings_from_ini(&self, ini: &Ini, profile: &str) -> Result<ProfileSettings> {
        let section = section_names(profile)
            .iter()
            .find_map(|name| ini.section(Some(name.as_str())))
            .ok_or_else(|| HelperError::ProfileNotFound(profile.to_string()))?;

        let mfa_serial = section
            .get("mfa_serial")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| HelperError::MissingMfaSerial(profile.to_string()))?
            .to_string();

        let region = match section.get("region").map(str::trim).filter(|s| !s.is_empty()) {
            Some(region) => region.to_string(),
            None => {
                let region = self
                    .fallback_region
                    .clone()
                    .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());
                info!("No region configured for profile {}, using {}", profile, region);
                region
            }
        };

        Ok(ProfileSettings { region, mfa_serial })
    }
}

/// Section names a profile may appear under, in lookup order.
fn section_names(profile: &str) -> Vec<String> {
    if profile == "default" {
        vec!["default".to_string(), "profile default".to_string()]
    } else {
        vec![format!("profile {profile}")]
    }
}

#[async_trait]
impl ProfileResolver for SharedConfigResolver {
    async fn resolve(&self, profile: &str) -> Result<ProfileSettings> {
        debug!("Resolving profile {} from {}", profile, self.path.display());

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            HelperError::Config(format!(
                "failed to read AWS config file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let ini = Ini::load_from_str(&content).map_err(|e| {
            HelperError::Config(format!(
                "failed to parse AWS config file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        self.settings_from_ini(&ini, profile)
    }
}
