use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const QUALIFIED_NAME_MAX_LEN: usize = 63;
const LABEL_VALUE_MAX_LEN: usize = 63;
const DNS1123_SUBDOMAIN_MAX_LEN: usize = 253;

const QUALIFIED_NAME_REGEX: &str = r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$";
const DNS1123_SUBDOMAIN_REGEX: &str =
    r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$";

static QUALIFIED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(QUALIFIED_NAME_REGEX).expect("should compile"));
static DNS1123_SUBDOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(DNS1123_SUBDOMAIN_REGEX).expect("should compile"));

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LabelError {
    #[error("label key must not be empty")]
    EmptyKey,

    /// A key may carry at most one `/`, separating the prefix from the name.
    #[error("label key {0:?} has more than one '/'")]
    TooManySlashes(String),

    #[error("label key {0:?} has an empty prefix")]
    EmptyPrefix(String),

    #[error(
        "label key prefix {0:?} must be a DNS-1123 subdomain of at most {max} characters",
        max = DNS1123_SUBDOMAIN_MAX_LEN
    )]
    InvalidPrefix(String),

    #[error(
        "label name {0:?} must be at most {max} characters, matching the regex: {re}",
        max = QUALIFIED_NAME_MAX_LEN,
        re = QUALIFIED_NAME_REGEX
    )]
    InvalidName(String),

    #[error(
        "label value {0:?} must be at most {max} characters, matching the regex: {re}",
        max = LABEL_VALUE_MAX_LEN,
        re = QUALIFIED_NAME_REGEX
    )]
    InvalidValue(String),
}

/// Validates a label key: an optional DNS subdomain prefix followed by `/`
/// and a name.
pub fn validate_qualified_name(key: &str) -> Result<(), LabelError> {
    if key.is_empty() {
        return Err(LabelError::EmptyKey);
    }

    let mut parts = key.split('/');
    let (prefix, name) = match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) => (None, name),
        (Some(prefix), Some(name), None) => (Some(prefix), name),
        _ => return Err(LabelError::TooManySlashes(key.to_string())),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            return Err(LabelError::EmptyPrefix(key.to_string()));
        }
        if prefix.len() > DNS1123_SUBDOMAIN_MAX_LEN || !DNS1123_SUBDOMAIN.is_match(prefix) {
            return Err(LabelError::InvalidPrefix(prefix.to_string()));
        }
    }

    if name.len() > QUALIFIED_NAME_MAX_LEN || !QUALIFIED_NAME.is_match(name) {
        return Err(LabelError::InvalidName(name.to_string()));
    }

    Ok(())
}

/// Validates a label value. Empty values are permitted.
pub fn validate_label_value(value: &str) -> Result<(), LabelError> {
    if value.is_empty() {
        return Ok(());
    }

    if value.len() > LABEL_VALUE_MAX_LEN || !QUALIFIED_NAME.is_match(value) {
        return Err(LabelError::InvalidValue(value.to_string()));
    }

    Ok(())
}
