//! Credential data structures.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version tag required by the `credential_process` output protocol.
pub const PROTOCOL_VERSION: u8 = 1;

/// Temporary credential in the `credential_process` output format.
///
/// This is both the stdout payload and the cache payload; the JSON shape is
/// fixed by the AWS SDKs that consume it:
///
/// ```json
/// {
///   "Version": 1,
///   "AccessKeyId": "ASIA...",
///   "SecretAccessKey": "...",
///   "SessionToken": "...",
///   "Expiration": "2025-01-01T12:00:00Z"
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionCredential {
    /// Protocol version, always [`PROTOCOL_VERSION`]
    pub version: u8,
    /// Temporary access key ID
    pub access_key_id: String,
    /// Temporary secret access key
    pub secret_access_key: String,
    /// Session token
    pub session_token: String,
    /// Absolute expiry, as issued by the token service
    pub expiration: DateTime<Utc>,
}

impl SessionCredential {
    /// Creates a credential tagged with the current protocol version.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
            expiration,
        }
    }

    /// Returns true if the credential stays valid for more than `margin`
    /// past `now`.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use op_aws_credential_helper::SessionCredential;
    ///
    /// let now = Utc::now();
    /// let cred = SessionCredential::new("AKID", "secret", "token", now + Duration::minutes(10));
    ///
    /// assert!(cred.is_fresh_at(now, Duration::minutes(5)));
    /// assert!(!cred.is_fresh_at(now, Duration::minutes(10)));
    /// ```
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expiration > now + margin
    }

    /// Serializes to the single-line protocol document.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("version", &self.version)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[redacted]")
            .field("session_token", &"[redacted]")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Long-lived IAM access key pair read from the secrets manager.
///
/// Held in memory for one run only and never written anywhere.
#[derive(Clone, PartialEq, Eq)]
pub struct LongLivedSecret {
    /// IAM access key ID
    pub access_key_id: String,
    /// IAM secret access key
    pub secret_access_key: String,
}

impl LongLivedSecret {
    /// Creates a new key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for LongLivedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongLivedSecret")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[redacted]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> SessionCredential {
        SessionCredential::new(
            "ASIAEXAMPLE",
            "wJalrXUtnFEMI",
            "FwoGZXIvYXdzEJr",
            Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
        )
    }

    #[test]
    fn test_protocol_field_names() {
        let json = sample().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"Version":1,"AccessKeyId":"ASIAEXAMPLE","SecretAccessKey":"wJalrXUtnFEMI","SessionToken":"FwoGZXIvYXdzEJr","Expiration":"2030-01-02T03:04:05Z"}"#
        );
    }

    #[test]
    fn test_parses_aws_cli_style_document() {
        let json = r#"{
            "Version": 1,
            "AccessKeyId": "ASIAEXAMPLE",
            "SecretAccessKey": "wJalrXUtnFEMI",
            "SessionToken": "FwoGZXIvYXdzEJr",
            "Expiration": "2030-01-02T03:04:05+00:00"
        }"#;
        let parsed: SessionCredential = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_freshness_margin_is_strict() {
        let now = Utc.with_ymd_and_hms(2030, 1, 2, 2, 59, 5).unwrap();
        let margin = Duration::minutes(5);

        let mut cred = sample();
        assert!(cred.is_fresh_at(now, margin));

        cred.expiration = now + margin;
        assert!(!cred.is_fresh_at(now, margin));

        cred.expiration = now - Duration::seconds(1);
        assert!(!cred.is_fresh_at(now, margin));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", sample());
        assert!(rendered.contains("ASIAEXAMPLE"));
        assert!(!rendered.contains("wJalrXUtnFEMI"));
        assert!(!rendered.contains("FwoGZXIvYXdzEJr"));

        let secret = LongLivedSecret::new("AKIAEXAMPLE", "topsecret");
        assert!(!format!("{:?}", secret).contains("topsecret"));
    }
}
