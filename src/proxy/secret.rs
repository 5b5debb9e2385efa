//! Secret normalization and validation

use crate::proxy::models::SecretMode;

/// Exact hex length of standard and `dd` secrets (16 bytes)
pub const SECRET_HEX_LEN: usize = 32;

/// Minimum hex length of an `ee` secret (prefix, key and at least one domain byte)
pub const TLS_SECRET_MIN_HEX_LEN: usize = 34;

const SECURED_PREFIX: &str = "dd";
const TLS_PREFIX: &str = "ee";

/// A normalized secret that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSecret {
    secret: String,
    mode: SecretMode,
}

impl ValidSecret {
    pub fn as_str(&self) -> &str {
        &self.secret
    }

    pub fn mode(&self) -> SecretMode {
        self.mode
    }

    pub fn into_parts(self) -> (String, SecretMode) {
        (self.secret, self.mode)
    }
}

/// Validator for proxy secrets
pub struct SecretValidator;

impl SecretValidator {
    /// Validate a raw secret.
    ///
    /// The secret is trimmed and lowercased, must be pure hex, and must have
    /// a length valid for the mode selected by its prefix:
    /// - `dd`: exactly 32 characters
    /// - `ee`: at least 34 characters
    /// - anything else: exactly 32 characters
    ///
    /// Returns `None` for anything else; invalid secrets are filtered, not
    /// reported.
    pub fn validate(raw: &str) -> Option<ValidSecret> {
        let secret = raw.trim().to_ascii_lowercase();
        if secret.is_empty() || !secret.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let mode = Self::classify(&secret);
        let valid = match mode {
            SecretMode::Secured | SecretMode::Standard => secret.len() == SECRET_HEX_LEN,
            SecretMode::Tls => secret.len() >= TLS_SECRET_MIN_HEX_LEN,
        };

        valid.then_some(ValidSecret { secret, mode })
    }

    /// Classify a normalized secret by its prefix
    pub fn classify(secret: &str) -> SecretMode {
        if secret.starts_with(SECURED_PREFIX) {
            SecretMode::Secured
        } else if secret.starts_with(TLS_PREFIX) {
            SecretMode::Tls
        } else {
            SecretMode::Standard
        }
    }
}
