//! Teacher settings and the shared security code.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Code accepted until the teacher sets their own.
pub const DEFAULT_CODE: &str = "6251";
pub const MIN_CODE_LEN: usize = 4;

// ─── SecurityCode ────────────────────────────────────────────────────────────

/// The numeric code that confirms destructive actions.
///
/// Stored as an argon2 PHC string once changed; never stored in clear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum SecurityCode {
  #[default]
  Default,
  Hashed(String),
}

impl From<Option<String>> for SecurityCode {
  fn from(value: Option<String>) -> Self {
    match value {
      Some(hash) if !hash.is_empty() => Self::Hashed(hash),
      _ => Self::Default,
    }
  }
}

impl From<SecurityCode> for Option<String> {
  fn from(code: SecurityCode) -> Self {
    match code {
      SecurityCode::Default => None,
      SecurityCode::Hashed(hash) => Some(hash),
    }
  }
}

impl SecurityCode {
  /// Hash a new plain-text code.
  pub fn hash(plain: &str) -> Result<Self> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(plain.as_bytes(), &salt)
      .map_err(|e| Error::CodeHash(e.to_string()))?
      .to_string();
    Ok(Self::Hashed(hash))
  }

  /// Exact match against the candidate. A stored hash that does not parse
  /// accepts nothing.
  pub fn verify(&self, candidate: &str) -> bool {
    match self {
      Self::Default => candidate == DEFAULT_CODE,
      Self::Hashed(hash) => PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
          .verify_password(candidate.as_bytes(), &parsed)
          .is_ok()
      }),
    }
  }

  pub fn is_default(&self) -> bool { matches!(self, Self::Default) }
}

/// Check a proposed code against its confirmation and the format rules.
pub fn validate_new_code(new: &str, confirm: &str) -> Result<()> {
  if new != confirm {
    return Err(Error::CodeMismatch);
  }
  if new.chars().count() < MIN_CODE_LEN {
    return Err(Error::CodeTooShort(MIN_CODE_LEN));
  }
  if !new.chars().all(|c| c.is_ascii_digit()) {
    return Err(Error::CodeNotNumeric);
  }
  Ok(())
}

// ─── Settings ────────────────────────────────────────────────────────────────

/// Stored under its own key next to the gradebook document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
  #[serde(default)]
  pub teacher_name:  String,
  #[serde(default)]
  pub subject:       String,
  #[serde(
    default,
    rename = "securityCodeHash",
    skip_serializing_if = "SecurityCode::is_default"
  )]
  pub security_code: SecurityCode,
  /// Display preferences (language, theme, font size) owned by clients.
  #[serde(flatten)]
  pub extra:         Map<String, Value>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_code_is_accepted() {
    let code = SecurityCode::default();
    assert!(code.verify("6251"));
    assert!(!code.verify("6252"));
    assert!(!code.verify(" 6251"));
  }

  #[test]
  fn hashed_code_replaces_default() {
    let code = SecurityCode::hash("9090").unwrap();
    assert!(code.verify("9090"));
    assert!(!code.verify(DEFAULT_CODE));
    assert!(!SecurityCode::Hashed("not a phc string".into()).verify("9090"));
  }

  #[test]
  fn new_code_rules() {
    assert!(matches!(validate_new_code("1234", "1243"), Err(Error::CodeMismatch)));
    assert!(matches!(validate_new_code("123", "123"), Err(Error::CodeTooShort(4))));
    assert!(matches!(validate_new_code("12a4", "12a4"), Err(Error::CodeNotNumeric)));
    assert!(validate_new_code("0042", "0042").is_ok());
  }

  #[test]
  fn settings_keep_client_preferences() {
    let json = r#"{"teacherName":"M. H.","subject":"Música","themeMode":"dark"}"#;
    let settings: Settings = serde_json::from_str(json).unwrap();
    assert!(settings.security_code.is_default());
    assert_eq!(settings.subject, "Música");
    let back = serde_json::to_value(&settings).unwrap();
    assert_eq!(back["themeMode"], "dark");
    assert!(back.get("securityCodeHash").is_none());
  }
}
