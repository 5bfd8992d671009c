//! 1Password retriever implementation.

use crate::command::run_command;
use crate::retriever::{SecretLocator, SecretRetriever};
use crate::{HelperError, LongLivedSecret, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

/// 1Password retriever.
///
/// Integrates with 1Password via the `op` CLI tool.
#[derive(Debug, Clone)]
pub struct OnePasswordRetriever {
    cli_path: String,
}

impl OnePasswordRetriever {
    /// Creates a retriever that runs the `op` binary at `cli_path`.
    pub fn new(cli_path: impl Into<String>) -> Self {
        Self {
            cli_path: cli_path.into(),
        }
    }

    /// Path of the `op` binary.
    pub fn cli_path(&self) -> &str {
        &self.cli_path
    }

    /// Builds the `--fields` selector for both labels.
    fn field_selector(locator: &SecretLocator) -> String {
        format!(
            "label={},label={}",
            locator.access_key_id_field, locator.secret_access_key_field
        )
    }
}

/// A field record as printed by `op item get --fields ... --format json`.
#[derive(Debug, Deserialize)]
pub(crate) struct OpField {
    label: String,
    #[serde(default)]
    value: Option<String>,
}

/// `op` prints a bare object when the selector matches one field and an
/// array otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OpFields {
    Many(Vec<OpField>),
    One(OpField),
}

impl OpFields {
    fn into_vec(self) -> Vec<OpField> {
        match self {
            Self::Many(fields) => fields,
            Self::One(field) => vec![field],
        }
    }
}

/// Parses `op` JSON output and builds the key pair from exactly the two
/// configured labels.
///
/// Records with other labels are ignored, as is their order. A label that is
/// absent or has an empty value counts as missing.
///
/// # Errors
///
/// - [`HelperError::MalformedOutput`]: output is not a field record or list
/// - [`HelperError::MissingField`]: one or both labels are missing
///
/// # Example
///
/// ```
/// use op_aws_credential_helper::backends::onepassword::extract_secret;
/// use op_aws_credential_helper::retriever::SecretLocator;
///
/// let locator = SecretLocator {
///     vault: "Private".to_string(),
///     item: "aws".to_string(),
///     access_key_id_field: "username".to_string(),
///     secret_access_key_field: "credential".to_string(),
/// };
/// let output = r#"[
///     {"id": "credential", "label": "credential", "value": "wJalr"},
///     {"id": "username", "label": "username", "value": "AKIA123"}
/// ]"#;
///
/// let secret = extract_secret(output, &locator).unwrap();
/// assert_eq!(secret.access_key_id, "AKIA123");
/// assert_eq!(secret.secret_access_key, "wJalr");
/// ```
pub fn extract_secret(output: &str, locator: &SecretLocator) -> Result<LongLivedSecret> {
    let fields: OpFields = serde_json::from_str(output)
        .map_err(|e| HelperError::MalformedOutput(format!("failed to parse op output: {}", e)))?;

    let mut access_key_id = None;
    let mut secret_access_key = None;

    for field in fields.into_vec() {
        let Some(value) = field.value.filter(|v| !v.is_empty()) else {
            continue;
        };

        if field.label == locator.access_key_id_field {
            access_key_id = Some(value);
        } else if field.label == locator.secret_access_key_field {
            secret_access_key = Some(value);
        }
    }

    match (access_key_id, secret_access_key) {
        (Some(access_key_id), Some(secret_access_key)) => Ok(LongLivedSecret {
            access_key_id,
            secret_access_key,
        }),
        (akid, secret) => {
            let mut fields = Vec::new();
            if akid.is_none() {
                fields.push(locator.access_key_id_field.clone());
            }
            if secret.is_none() {
                fields.push(locator.secret_access_key_field.clone());
            }
            Err(HelperError::MissingField {
                item: locator.item.clone(),
                fields,
            })
        }
    }
}

#[async_trait]
impl SecretRetriever for OnePasswordRetriever {
    fn name(&self) -> &str {
        "onepassword"
    }

    async fn retrieve(&self, locator: &SecretLocator) -> Result<LongLivedSecret> {
        info!(
            "Reading IAM key from 1Password item {} in vault {}",
            locator.item, locator.vault
        );

        let selector = Self::field_selector(locator);
        let args = [
            "item",
            "get",
            locator.item.as_str(),
            "--vault",
            locator.vault.as_str(),
            "--fields",
            selector.as_str(),
            "--format",
            "json",
        ];

        let output = run_command(&self.cli_path, &args).await?;
        let secret = extract_secret(&output, locator)?;

        debug!("Retrieved access key ID {}", secret.access_key_id);
        Ok(secret)
    }
}
