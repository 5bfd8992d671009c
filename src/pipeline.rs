//! Credential acquisition pipeline.
//!
//! ```text
//! CACHE_CHECK ─┬─ fresh ──────────────────────────────────────────────▶ emit
//!              └─ miss/stale ─▶ RETRIEVE ─▶ PROMPT ─▶ EXCHANGE ─▶ WRITE ─▶ emit
//! ```
//!
//! The cache lookup and profile resolution run together. A fresh cached
//! credential wins regardless of the profile lookup; otherwise a profile
//! failure aborts the run before the secrets manager is contacted.

use crate::backends::onepassword::OnePasswordRetriever;
use crate::cache::CredentialCache;
use crate::exchange::{ensure_unexpired, ExchangeRequest, SessionExchanger, StsExchanger};
use crate::profile::{ProfileResolver, SharedConfigResolver};
use crate::prompt::{MfaPrompter, TtyPrompter};
use crate::retriever::{SecretLocator, SecretRetriever};
use crate::{Config, HelperError, Result, SessionCredential};
use chrono::Utc;
use std::future::Future;
use tracing::{debug, info, warn};

/// Where the emitted credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Reused from the cache
    Cache,
    /// Freshly issued by the token service
    Exchange,
}

/// Result of a successful run.
#[derive(Debug)]
pub struct Acquisition {
    /// Credential to emit
    pub credential: SessionCredential,
    /// Where it came from
    pub origin: Origin,
    /// Set when a fresh credential could not be cached
    pub cache_error: Option<HelperError>,
}

/// Ties cache, secret retrieval, MFA prompt, and exchange together.
///
/// # Example
///
/// ```
/// use op_aws_credential_helper::backends::mock::{
///     MockExchanger, MockRetriever, ScriptedPrompter, StaticResolver,
/// };
/// use op_aws_credential_helper::cache::CredentialCache;
/// use op_aws_credential_helper::pipeline::{Origin, Pipeline};
/// use op_aws_credential_helper::Config;
///
/// #[tokio::main]
/// async fn main() -> op_aws_credential_helper::Result<()> {
///     let dir = tempfile::tempdir()?;
///     let pipeline = Pipeline::new(
///         Config::new("Private", "aws"),
///         CredentialCache::new(dir.path()),
///         StaticResolver::new().with_profile("default", "us-east-1", "arn:aws:iam::1:mfa/me"),
///         MockRetriever::default(),
///         ScriptedPrompter::new(["123456"]),
///         MockExchanger::new(),
///     );
///
///     let first = pipeline.run().await?;
///     assert_eq!(first.origin, Origin::Exchange);
///
///     let second = pipeline.run().await?;
///     assert_eq!(second.origin, Origin::Cache);
///     assert_eq!(second.credential, first.credential);
///     Ok(())
/// }
/// ```
pub struct Pipeline {
    config: Config,
    cache: CredentialCache,
    resolver: Box<dyn ProfileResolver>,
    retriever: Box<dyn SecretRetriever>,
    prompter: Box<dyn MfaPrompter>,
    exchanger: Box<dyn SessionExchanger>,
}

impl Pipeline {
    /// Creates a pipeline from explicit collaborators.
    pub fn new(
        config: Config,
        cache: CredentialCache,
        resolver: impl ProfileResolver + 'static,
        retriever: impl SecretRetriever + 'static,
        prompter: impl MfaPrompter + 'static,
        exchanger: impl SessionExchanger + 'static,
    ) -> Self {
        Self {
            config,
            cache,
            resolver: Box::new(resolver),
            retriever: Box::new(retriever),
            prompter: Box::new(prompter),
            exchanger: Box::new(exchanger),
        }
    }

    /// Creates the production pipeline: XDG cache, `~/.aws/config`, the
    /// `op` CLI, the controlling terminal, and STS.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError::Config`] if the cache directory or AWS config
    /// path cannot be determined.
    pub fn from_config(config: Config) -> Result<Self> {
        let cache = match config.cache_dir {
            Some(ref dir) => CredentialCache::new(dir),
            None => CredentialCache::from_env()?,
        };
        let retriever = OnePasswordRetriever::new(config.op_cli_path.clone());

        Ok(Self::new(
            config,
            cache,
            SharedConfigResolver::from_env()?,
            retriever,
            TtyPrompter::new(),
            StsExchanger::new(),
        ))
    }

    /// Configuration this pipeline runs with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the pipeline once.
    ///
    /// # Errors
    ///
    /// Any failure after the cache check is returned unchanged. A failed
    /// cache write is not an error; it is reported in
    /// [`Acquisition::cache_error`].
    pub async fn run(&self) -> Result<Acquisition> {
        self.config.validate()?;
        let profile = self.config.profile.as_str();

        info!(
            "Acquiring credentials for profile {} (version {})",
            profile, self.config.version
        );

        let (cached, settings) = tokio::join!(
            self.cache.load_fresh(profile),
            self.resolver.resolve(profile)
        );

        if let Some(credential) = cached {
            info!("Using cached credential expiring at {}", credential.expiration);
            return Ok(Acquisition {
                credential,
                origin: Origin::Cache,
                cache_error: None,
            });
        }

        let settings = settings?;
        debug!("Profile {} uses region {}", profile, settings.region);

        let locator = SecretLocator::from_config(&self.config);
        info!(
            "Retrieving {} from vault {} via {}",
            locator.item,
            locator.vault,
            self.retriever.name()
        );
        let secret = self.retriever.retrieve(&locator).await?;

        let mfa_code = self.prompter.prompt().await?;

        let request = ExchangeRequest {
            region: settings.region,
            secret,
            mfa_serial: settings.mfa_serial,
            mfa_code,
            duration_seconds: self.config.duration_seconds(),
        };
        let credential = self.exchanger.exchange(&request).await?;
        ensure_unexpired(&credential, Utc::now())?;

        let cache_error = match self.cache.save(profile, &credential).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Credential obtained but not cached: {}", e);
                Some(e)
            }
        };

        Ok(Acquisition {
            credential,
            origin: Origin::Exchange,
            cache_error,
        })
    }

    /// Runs the pipeline until it finishes or `cancel` resolves.
    ///
    /// Dropping the in-flight run kills a running secrets-manager process and
    /// aborts a pending network call.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError::Cancelled`] if `cancel` resolves first.
    pub async fn run_until<F>(&self, cancel: F) -> Result<Acquisition>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                warn!("Cancelled before a credential was obtained");
                Err(HelperError::Cancelled)
            }
            result = self.run() => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::{MockExchanger, MockRetriever, ScriptedPrompter, StaticResolver};
    use chrono::Duration;
    use tempfile::{tempdir, TempDir};

    const MFA_SERIAL: &str = "arn:aws:iam::111122223333:mfa/alice";

    struct Harness {
        _dir: TempDir,
        cache: CredentialCache,
        retriever: MockRetriever,
        prompter: ScriptedPrompter,
        exchanger: MockExchanger,
        pipeline: Pipeline,
    }

    fn harness_with(config: Config, cache_dir: Option<std::path::PathBuf>) -> Harness {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::new(cache_dir.unwrap_or_else(|| dir.path().join("cache")));
        let retriever = MockRetriever::new("AKIALONGLIVED", "long-lived-secret");
        let prompter = ScriptedPrompter::new(["123456"]);
        let exchanger = MockExchanger::new();
        let resolver = StaticResolver::new()
            .with_profile("default", "eu-west-1", MFA_SERIAL)
            .with_profile("prod", "us-west-2", MFA_SERIAL);

        let pipeline = Pipeline::new(
            config,
            cache.clone(),
            resolver,
            retriever.clone(),
            prompter.clone(),
            exchanger.clone(),
        );

        Harness {
            _dir: dir,
            cache,
            retriever,
            prompter,
            exchanger,
            pipeline,
        }
    }

    fn harness() -> Harness {
        harness_with(Config::new("Private", "aws-iam"), None)
    }

    async fn assert_untouched(h: &Harness) {
        assert_eq!(h.retriever.calls(), 0);
        assert_eq!(h.prompter.calls(), 0);
        assert_eq!(h.exchanger.calls().await, 0);
    }

    #[tokio::test]
    async fn test_cache_miss_runs_full_exchange() {
        let h = harness();
        let acquisition = h.pipeline.run().await.unwrap();

        assert_eq!(acquisition.origin, Origin::Exchange);
        assert!(acquisition.cache_error.is_none());
        assert_eq!(h.retriever.calls(), 1);
        assert_eq!(h.prompter.calls(), 1);

        let requests = h.exchanger.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].region, "eu-west-1");
        assert_eq!(requests[0].mfa_serial, MFA_SERIAL);
        assert_eq!(requests[0].mfa_code, "123456");
        assert_eq!(requests[0].secret.access_key_id, "AKIALONGLIVED");
        assert_eq!(requests[0].duration_seconds, 12 * 3600);

        let cached = h.cache.load("default").await.unwrap();
        assert_eq!(cached, acquisition.credential);
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_everything() {
        let h = harness();
        let cred = SessionCredential::new("ASIACACHED", "s", "t", Utc::now() + Duration::hours(1));
        h.cache.save("default", &cred).await.unwrap();

        let acquisition = h.pipeline.run().await.unwrap();

        assert_eq!(acquisition.origin, Origin::Cache);
        assert_eq!(acquisition.credential, cred);
        assert_untouched(&h).await;
    }

    #[tokio::test]
    async fn test_cache_within_margin_refreshes() {
        let h = harness();
        let cred = SessionCredential::new("ASIASTALE", "s", "t", Utc::now() + Duration::minutes(4));
        h.cache.save("default", &cred).await.unwrap();

        let acquisition = h.pipeline.run().await.unwrap();

        assert_eq!(acquisition.origin, Origin::Exchange);
        assert_ne!(acquisition.credential.access_key_id, "ASIASTALE");
        assert_eq!(h.exchanger.calls().await, 1);
        assert_eq!(
            h.cache.load("default").await.unwrap(),
            acquisition.credential
        );
    }

    #[tokio::test]
    async fn test_cache_is_per_profile() {
        let h = harness_with(Config::new("Private", "aws-iam").with_profile("prod"), None);
        let cred = SessionCredential::new("ASIADEFAULT", "s", "t", Utc::now() + Duration::hours(1));
        h.cache.save("default", &cred).await.unwrap();

        let acquisition = h.pipeline.run().await.unwrap();
        assert_eq!(acquisition.origin, Origin::Exchange);
        assert_eq!(h.exchanger.requests().await[0].region, "us-west-2");
    }

    #[tokio::test]
    async fn test_unknown_profile_fails_before_secret() {
        let h = harness_with(Config::new("Private", "aws-iam").with_profile("staging"), None);

        let err = h.pipeline.run().await.unwrap_err();
        assert!(matches!(err, HelperError::ProfileNotFound(_)));
        assert_untouched(&h).await;
    }

    #[tokio::test]
    async fn test_retrieval_failure_skips_prompt() {
        let h = harness();
        h.retriever
            .fail_with(HelperError::MissingField {
                item: "aws-iam".to_string(),
                fields: vec!["credential".to_string()],
            })
            .await;

        let err = h.pipeline.run().await.unwrap_err();
        assert!(matches!(err, HelperError::MissingField { .. }));
        assert_eq!(h.prompter.calls(), 0);
        assert_eq!(h.exchanger.calls().await, 0);
        assert!(h.cache.load("default").await.is_none());
    }

    #[tokio::test]
    async fn test_prompt_failure_skips_exchange() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::new(dir.path());
        let exchanger = MockExchanger::new();
        let pipeline = Pipeline::new(
            Config::new("Private", "aws-iam"),
            cache.clone(),
            StaticResolver::new().with_profile("default", "eu-west-1", MFA_SERIAL),
            MockRetriever::default(),
            ScriptedPrompter::failing(HelperError::MfaPrompt(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such device or address",
            ))),
            exchanger.clone(),
        );

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, HelperError::MfaPrompt(_)));
        assert_eq!(exchanger.calls().await, 0);
        assert!(cache.load("default").await.is_none());
    }

    #[tokio::test]
    async fn test_rejected_code_is_not_retried() {
        let h = harness();
        h.exchanger
            .fail_with(HelperError::Exchange(
                "AccessDenied: MultiFactorAuthentication failed with invalid MFA one time pass code"
                    .to_string(),
            ))
            .await;

        let err = h.pipeline.run().await.unwrap_err();
        assert!(matches!(err, HelperError::Exchange(_)));
        assert_eq!(h.prompter.calls(), 1);
        assert_eq!(h.exchanger.calls().await, 1);
        assert!(h.cache.load("default").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_exchange_result_is_rejected() {
        let dir = tempdir().unwrap();
        let cache = CredentialCache::new(dir.path());
        let pipeline = Pipeline::new(
            Config::new("Private", "aws-iam"),
            cache.clone(),
            StaticResolver::new().with_profile("default", "eu-west-1", MFA_SERIAL),
            MockRetriever::default(),
            ScriptedPrompter::new(["123456"]),
            MockExchanger::new().with_lifetime(Duration::seconds(-1)),
        );

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, HelperError::Exchange(_)));
        assert!(cache.load("default").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_delivers() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let h = harness_with(Config::new("Private", "aws-iam"), Some(blocker.join("cache")));
        let acquisition = h.pipeline.run().await.unwrap();

        assert_eq!(acquisition.origin, Origin::Exchange);
        assert!(matches!(
            acquisition.cache_error,
            Some(HelperError::CacheWrite { .. })
        ));
        assert!(acquisition.credential.expiration > Utc::now());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_first() {
        let h = harness_with(
            Config::new("Private", "aws-iam").with_fields("same", "same"),
            None,
        );
        let err = h.pipeline.run().await.unwrap_err();
        assert!(matches!(err, HelperError::InvalidInput(_)));
        assert_untouched(&h).await;
    }

    #[tokio::test]
    async fn test_label_with_equals_sign_uses_cache() {
        let h = harness_with(
            Config::new("Private", "aws-iam").with_fields("key=id", "secret"),
            None,
        );
        let cred = SessionCredential::new("ASIACACHED", "s", "t", Utc::now() + Duration::hours(1));
        h.cache.save("default", &cred).await.unwrap();

        let acquisition = h.pipeline.run().await.unwrap();
        assert_eq!(acquisition.origin, Origin::Cache);
        assert_eq!(acquisition.credential, cred);
        assert_untouched(&h).await;
    }

    #[tokio::test]
    async fn test_cancellation_wins_over_run() {
        let h = harness();
        let err = h.pipeline.run_until(async {}).await.unwrap_err();
        assert!(matches!(err, HelperError::Cancelled));
        assert_untouched(&h).await;
    }

    #[tokio::test]
    async fn test_run_until_completes_without_cancel() {
        let h = harness();
        let acquisition = h
            .pipeline
            .run_until(std::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!(acquisition.origin, Origin::Exchange);
    }
}
