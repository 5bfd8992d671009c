//! Input validation for values that end up in file names or CLI selectors.

use crate::{HelperError, Result};

/// Separator between entries of an `op --fields` selector.
const SELECTOR_SEPARATOR: char = ',';

/// Maximum allowed length for field labels.
const MAX_LABEL_LENGTH: usize = 255;

/// Validates a profile name.
///
/// Profiles are opaque identifiers: the only requirement is that they are
/// non-empty. They are hashed before touching the filesystem, so slashes,
/// unicode, and length are all acceptable.
///
/// # Example
///
/// ```
/// use op_aws_credential_helper::validation::validate_profile;
///
/// assert!(validate_profile("default").is_ok());
/// assert!(validate_profile("team/prod").is_ok());
/// assert!(validate_profile("").is_err());
/// ```
pub fn validate_profile(profile: &str) -> Result<()> {
    if profile.is_empty() {
        return Err(HelperError::InvalidInput(
            "profile name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates a 1Password field label.
///
/// Labels are joined into a single `label=a,label=b` selector argument, so
/// they cannot contain the `,` separator.
///
/// # Errors
///
/// Returns [`HelperError::InvalidInput`] if validation fails.
///
/// # Example
///
/// ```
/// use op_aws_credential_helper::validation::validate_field_label;
///
/// assert!(validate_field_label("username").is_ok());
/// assert!(validate_field_label("Access key ID").is_ok());
/// assert!(validate_field_label("key=id").is_ok());
///
/// assert!(validate_field_label("").is_err());
/// assert!(validate_field_label("a,label=b").is_err());
/// ```
pub fn validate_field_label(label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(HelperError::InvalidInput(
            "field label cannot be empty".to_string(),
        ));
    }

    if label.len() > MAX_LABEL_LENGTH {
        return Err(HelperError::InvalidInput(format!(
            "field label exceeds maximum length of {} characters",
            MAX_LABEL_LENGTH
        )));
    }

    if label.chars().any(|c| c.is_control()) {
        return Err(HelperError::InvalidInput(
            "field label contains control characters".to_string(),
        ));
    }

    if label.contains(SELECTOR_SEPARATOR) {
        return Err(HelperError::InvalidInput(format!(
            "field label {:?} contains the selector separator {:?}",
            label, SELECTOR_SEPARATOR
        )));
    }

    Ok(())
}

/// Validates a vault or item reference passed to the secrets manager.
pub fn validate_reference(kind: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HelperError::InvalidInput(format!("{} cannot be empty", kind)));
    }

    if value.contains('\0') {
        return Err(HelperError::InvalidInput(format!(
            "{} contains null byte",
            kind
        )));
    }

    Ok(())
}
