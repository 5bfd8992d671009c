//! Mock collaborators for testing.
//!
//! Every capability the pipeline depends on has an in-memory stand-in here,
//! with call counters and one-shot error injection for simulating failures.

use crate::exchange::{ExchangeRequest, SessionExchanger};
use crate::profile::{ProfileResolver, ProfileSettings};
use crate::prompt::MfaPrompter;
use crate::retriever::{SecretLocator, SecretRetriever};
use crate::*;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock secret retriever.
///
/// Returns a fixed key pair. Clones share counters and injected errors, so a
/// test can keep one handle while the pipeline owns another.
///
/// # Example
///
/// ```
/// use op_aws_credential_helper::backends::mock::MockRetriever;
/// use op_aws_credential_helper::retriever::{SecretLocator, SecretRetriever};
/// use op_aws_credential_helper::HelperError;
///
/// #[tokio::main]
/// async fn main() {
///     let retriever = MockRetriever::new("AKIAMOCK", "mock-secret");
///     retriever
///         .fail_with(HelperError::MissingField {
///             item: "aws".to_string(),
///             fields: vec!["username".to_string()],
///         })
///         .await;
///
///     let locator = SecretLocator {
///         vault: "v".to_string(),
///         item: "aws".to_string(),
///         access_key_id_field: "username".to_string(),
///         secret_access_key_field: "credential".to_string(),
///     };
///     assert!(retriever.retrieve(&locator).await.is_err());
///     assert!(retriever.retrieve(&locator).await.is_ok());
///     assert_eq!(retriever.calls(), 2);
/// }
/// ```
#[derive(Clone)]
pub struct MockRetriever {
    secret: LongLivedSecret,
    error: Arc<Mutex<Option<HelperError>>>,
    calls: Arc<AtomicUsize>,
}

impl MockRetriever {
    /// Creates a retriever returning the given key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            secret: LongLivedSecret::new(access_key_id, secret_access_key),
            error: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes the next call fail with `err`.
    pub async fn fail_with(&self, err: HelperError) {
        *self.error.lock().await = Some(err);
    }

    /// Number of `retrieve` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRetriever {
    fn default() -> Self {
        Self::new("AKIAMOCKEXAMPLE", "mock-secret-access-key")
    }
}

#[async_trait]
impl SecretRetriever for MockRetriever {
    fn name(&self) -> &str {
        "mock"
    }

    async fn retrieve(&self, _locator: &SecretLocator) -> Result<LongLivedSecret> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.error.lock().await.take() {
            return Err(err);
        }
        Ok(self.secret.clone())
    }
}

/// Prompter that replays scripted codes.
#[derive(Clone, Default)]
pub struct ScriptedPrompter {
    codes: Arc<Mutex<VecDeque<Result<String>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedPrompter {
    /// Creates a prompter that answers with `codes` in order.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: Arc::new(Mutex::new(
                codes.into_iter().map(|c| Ok(c.into())).collect(),
            )),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a prompter whose first answer is `err`.
    pub fn failing(err: HelperError) -> Self {
        Self {
            codes: Arc::new(Mutex::new(VecDeque::from([Err(err)]))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `prompt` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MfaPrompter for ScriptedPrompter {
    async fn prompt(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        self.codes.lock().await.pop_front().unwrap_or_else(|| {
            Err(HelperError::MfaPrompt(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no scripted MFA code left",
            )))
        })
    }
}

/// Mock token service.
///
/// Issues credentials that expire `lifetime` after the call (default: the
/// requested duration) and records every request it receives.
#[derive(Clone)]
pub struct MockExchanger {
    lifetime: Option<Duration>,
    error: Arc<Mutex<Option<HelperError>>>,
    requests: Arc<Mutex<Vec<ExchangeRequest>>>,
}

impl MockExchanger {
    /// Creates an exchanger honouring the requested duration.
    pub fn new() -> Self {
        Self {
            lifetime: None,
            error: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Overrides the lifetime of issued credentials.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Makes the next call fail with `err`.
    pub async fn fail_with(&self, err: HelperError) {
        *self.error.lock().await = Some(err);
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<ExchangeRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of `exchange` calls so far.
    pub async fn calls(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockExchanger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionExchanger for MockExchanger {
    async fn exchange(&self, request: &ExchangeRequest) -> Result<SessionCredential> {
        self.requests.lock().await.push(request.clone());

        if let Some(err) = self.error.lock().await.take() {
            return Err(err);
        }

        let lifetime = self
            .lifetime
            .unwrap_or_else(|| Duration::seconds(i64::from(request.duration_seconds)));
        let serial = self.requests.lock().await.len();

        Ok(SessionCredential::new(
            format!("ASIAMOCK{:04}", serial),
            format!("session-secret-{}", serial),
            format!("session-token-{}-{}", serial, request.mfa_code),
            Utc::now() + lifetime,
        ))
    }
}

/// Resolver backed by an in-memory profile table.
#[derive(Clone, Default)]
pub struct StaticResolver {
    profiles: HashMap<String, ProfileSettings>,
}

impl StaticResolver {
    /// Creates an empty resolver; every lookup fails with
    /// [`HelperError::ProfileNotFound`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a profile.
    pub fn with_profile(
        mut self,
        profile: impl Into<String>,
        region: impl Into<String>,
        mfa_serial: impl Into<String>,
    ) -> Self {
        self.profiles.insert(
            profile.into(),
            ProfileSettings {
                region: region.into(),
                mfa_serial: mfa_serial.into(),
            },
        );
        self
    }
}

#[async_trait]
impl ProfileResolver for StaticResolver {
    async fn resolve(&self, profile: &str) -> Result<ProfileSettings> {
        self.profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| HelperError::ProfileNotFound(profile.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(code: &str) -> ExchangeRequest {
        ExchangeRequest {
            region: "us-east-1".to_string(),
            secret: LongLivedSecret::new("AKIA", "secret"),
            mfa_serial: "arn:aws:iam::1:mfa/u".to_string(),
            mfa_code: code.to_string(),
            duration_seconds: 3600,
        }
    }

    #[tokio::test]
    async fn test_scripted_prompter_replays_in_order() {
        let prompter = ScriptedPrompter::new(["111111", "222222"]);
        assert_eq!(prompter.prompt().await.unwrap(), "111111");
        assert_eq!(prompter.prompt().await.unwrap(), "222222");
        assert!(prompter.prompt().await.is_err());
        assert_eq!(prompter.calls(), 3);
    }

    #[tokio::test]
    async fn test_exchanger_honours_duration() {
        let exchanger = MockExchanger::new();
        let before = Utc::now();
        let cred = exchanger.exchange(&request("123456")).await.unwrap();

        assert!(cred.expiration >= before + Duration::seconds(3600));
        assert!(cred.session_token.ends_with("123456"));
        assert_eq!(exchanger.calls().await, 1);
    }

    #[tokio::test]
    async fn test_exchanger_error_injection_is_one_shot() {
        let exchanger = MockExchanger::new();
        exchanger
            .fail_with(HelperError::Exchange("MultiFactorAuthentication failed".to_string()))
            .await;

        assert!(exchanger.exchange(&request("1")).await.is_err());
        assert!(exchanger.exchange(&request("2")).await.is_ok());
        assert_eq!(exchanger.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticResolver::new().with_profile("dev", "eu-west-1", "arn:mfa");
        assert_eq!(resolver.resolve("dev").await.unwrap().region, "eu-west-1");
        assert!(matches!(
            resolver.resolve("prod").await,
            Err(HelperError::ProfileNotFound(_))
        ));
    }
}
