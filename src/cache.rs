//! Per-profile credential cache.
//!
//! One JSON file per profile, named by the SHA-256 of the profile name, under
//! `$XDG_CACHE_HOME/op-aws-credential-helper` (or `~/.cache/...`). The record
//! is exactly the `credential_process` document that was last emitted.

use crate::config::CACHE_DIR_NAME;
use crate::{HelperError, Result, SessionCredential};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Minimum remaining validity for a cached credential to be reused.
pub const CACHE_MARGIN: Duration = Duration::minutes(5);

/// Returns the default cache directory.
///
/// Respects `XDG_CACHE_HOME` if set, otherwise uses `~/.cache`.
pub fn default_cache_dir() -> Option<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CACHE_HOME").filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir).join(CACHE_DIR_NAME));
    }

    dirs::home_dir().map(|home| home.join(".cache").join(CACHE_DIR_NAME))
}

/// Derives the record file name for a profile.
///
/// The name is a fixed-length hex digest, so it never contains path
/// separators or reserved names regardless of the profile.
///
/// # Example
///
/// ```
/// use op_aws_credential_helper::cache::cache_file_name;
///
/// let name = cache_file_name("default");
/// assert_eq!(name, cache_file_name("default"));
/// assert_ne!(name, cache_file_name("prod"));
/// assert!(name.ends_with(".json"));
/// ```
pub fn cache_file_name(profile: &str) -> String {
    format!("{}.json", hex::encode(Sha256::digest(profile.as_bytes())))
}

/// Credential cache handles persistence of session credentials to disk.
///
/// # Security
///
/// - The cache directory is created with mode 0700 (owner access only)
/// - Records are written with mode 0600 (owner read/write only)
/// - Writes go to a temporary file that is renamed over the record, so a
///   reader never observes a partial record
/// - Record contents are never logged
///
/// # Example
///
/// ```no_run
/// use op_aws_credential_helper::cache::CredentialCache;
///
/// #[tokio::main]
/// async fn main() -> op_aws_credential_helper::Result<()> {
///     let cache = CredentialCache::new("/tmp/op-aws-cache");
///
///     if let Some(cred) = cache.load_fresh("default").await {
///         println!("{}", cred.to_json()?);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CredentialCache {
    dir: PathBuf,
}

impl CredentialCache {
    /// Creates a cache rooted at `dir`. Nothing is touched on disk until the
    /// first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Creates a cache at the default location.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError::Config`] if no home directory can be found.
    pub fn from_env() -> Result<Self> {
        default_cache_dir().map(Self::new).ok_or_else(|| {
            HelperError::Config("cannot determine cache directory; set XDG_CACHE_HOME".to_string())
        })
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record path for a profile.
    pub fn path_for(&self, profile: &str) -> PathBuf {
        self.dir.join(cache_file_name(profile))
    }

    /// Loads the cached credential for a profile.
    ///
    /// Returns `None` if:
    /// - File does not exist or cannot be read
    /// - File contains invalid JSON
    /// - Record carries an unknown protocol version
    ///
    /// Freshness is not checked here; see [`load_fresh`](Self::load_fresh).
    pub async fn load(&self, profile: &str) -> Option<SessionCredential> {
        let path = self.path_for(profile);

        let data = match fs::read(&path).await {
            Ok(d) => d,
            Err(e) => {
                debug!("Cache miss for {}: {}", path.display(), e);
                return None;
            }
        };

        let cred: SessionCredential = match serde_json::from_slice(&data) {
            Ok(c) => c,
            Err(e) => {
                debug!("Ignoring malformed cache record {}: {}", path.display(), e);
                return None;
            }
        };

        if cred.version != crate::credential::PROTOCOL_VERSION {
            debug!(
                "Ignoring cache record {} with version {}",
                path.display(),
                cred.version
            );
            return None;
        }

        Some(cred)
    }

    /// Loads the cached credential only if it outlives [`CACHE_MARGIN`].
    pub async fn load_fresh(&self, profile: &str) -> Option<SessionCredential> {
        let cred = self.load(profile).await?;

        if cred.is_fresh_at(Utc::now(), CACHE_MARGIN) {
            Some(cred)
        } else {
            debug!("Cached credential expires at {}, refreshing", cred.expiration);
            None
        }
    }

    /// Saves a credential for a profile, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError::CacheWrite`] if the directory cannot be created
    /// or the record cannot be written. A failed write leaves any previous
    /// record intact.
    pub async fn save(&self, profile: &str, cred: &SessionCredential) -> Result<()> {
        let path = self.path_for(profile);
        let write_err = |source: std::io::Error| HelperError::CacheWrite {
            path: path.display().to_string(),
            source,
        };

        self.ensure_dir().await.map_err(write_err)?;

        let json = serde_json::to_vec(cred)?;
        let tmp = self
            .dir
            .join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));

        if let Err(e) = write_private(&tmp, &json).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        debug!("Cached credential at {}", path.display());
        Ok(())
    }

    async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.dir).await?.permissions();
            if perms.mode() & 0o777 != 0o700 {
                perms.set_mode(0o700);
                fs::set_permissions(&self.dir, perms).await?;
            }
        }

        Ok(())
    }
}

async fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
