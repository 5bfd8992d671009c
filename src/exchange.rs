//! Temporary credential exchange via AWS STS.

use crate::{HelperError, LongLivedSecret, Result, SessionCredential};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::config::Credentials;
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client as StsClient;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, info};

/// Provider name attached to the static long-lived credentials.
const PROVIDER_NAME: &str = "op-aws-credential-helper";

/// Everything one exchange needs.
#[derive(Clone)]
pub struct ExchangeRequest {
    /// Region whose STS endpoint is called
    pub region: String,
    /// Long-lived key pair used to sign the request
    pub secret: LongLivedSecret,
    /// MFA device serial number or ARN
    pub mfa_serial: String,
    /// One-time MFA code (never logged)
    pub mfa_code: String,
    /// Requested session lifetime in seconds
    pub duration_seconds: i32,
}

impl fmt::Debug for ExchangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeRequest")
            .field("region", &self.region)
            .field("secret", &self.secret)
            .field("mfa_serial", &self.mfa_serial)
            .field("mfa_code", &"[redacted]")
            .field("duration_seconds", &self.duration_seconds)
            .finish()
    }
}

/// Exchanges a long-lived key plus MFA code for a session credential.
#[async_trait]
pub trait SessionExchanger: Send + Sync {
    /// Performs exactly one exchange. The returned expiration is the
    /// service's, unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`HelperError::Exchange`] for any rejection or transport
    /// failure. Callers must not retry with the same code.
    async fn exchange(&self, request: &ExchangeRequest) -> Result<SessionCredential>;
}

/// STS `GetSessionToken` exchanger.
#[derive(Debug, Clone, Default)]
pub struct StsExchanger {
    endpoint: Option<String>,
}

impl StsExchanger {
    /// Creates an exchanger using the regional STS endpoint.
    pub fn new() -> Self {
        Self { endpoint: None }
    }

    /// Overrides the endpoint URL (for LocalStack testing).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    async fn client(&self, request: &ExchangeRequest) -> StsClient {
        let credentials = Credentials::new(
            request.secret.access_key_id.clone(),
            request.secret.secret_access_key.clone(),
            None,
            None,
            PROVIDER_NAME,
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(request.region.clone()))
            .credentials_provider(credentials);

        if let Some(ref endpoint) = self.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        StsClient::new(&loader.load().await)
    }
}

#[async_trait]
impl SessionExchanger for StsExchanger {
    async fn exchange(&self, request: &ExchangeRequest) -> Result<SessionCredential> {
        info!("Calling AWS STS GetSessionToken");
        debug!("Region: {}", request.region);
        debug!("MFA serial: {}", request.mfa_serial);
        debug!("Duration: {} seconds", request.duration_seconds);

        let client = self.client(request).await;

        let response = client
            .get_session_token()
            .duration_seconds(request.duration_seconds)
            .serial_number(&request.mfa_serial)
            .token_code(&request.mfa_code)
            .send()
            .await
            .map_err(|e| HelperError::Exchange(DisplayErrorContext(&e).to_string()))?;

        let sts_creds = response
            .credentials()
            .ok_or_else(|| HelperError::Exchange("AWS STS returned no credentials".to_string()))?;

        let expiration = to_chrono(sts_creds.expiration())?;

        let credential = SessionCredential::new(
            sts_creds.access_key_id(),
            sts_creds.secret_access_key(),
            sts_creds.session_token(),
            expiration,
        );

        info!("Obtained session credential expiring at {}", expiration);
        Ok(credential)
    }
}

fn to_chrono(dt: &aws_smithy_types::DateTime) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()).ok_or_else(|| {
        HelperError::Exchange(format!("expiration out of range: {}", dt))
    })
}

/// Rejects a credential that is already expired when issued.
pub(crate) fn ensure_unexpired(credential: &SessionCredential, now: DateTime<Utc>) -> Result<()> {
    if credential.expiration <= now {
        return Err(HelperError::Exchange(format!(
            "token service returned a credential that expired at {}",
            credential.expiration
        )));
    }
    Ok(())
}
