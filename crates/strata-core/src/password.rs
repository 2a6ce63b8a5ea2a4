//! # Password-like Columns
//!
//! Columns whose name is in the configured password set are hashed with
//! argon2 when a statement binds their values. Rendering a statement never
//! hashes; binding does, exactly once.
//!
//! ```text
//! insert_into("users").columns(["email", "password"]).values([...])
//!                                            │
//!                                            ▼
//!                  'hunter2' → '$argon2id$v=19$m=19456,t=2,p=1$...'
//! ```

use std::collections::BTreeSet;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use crate::error::{CoreError, CoreResult};
use crate::value::Value;

/// Column names hashed by default.
pub const DEFAULT_PASSWORD_COLUMNS: [&str; 4] = ["password", "passwd", "pwd", "password_hash"];

const HASH_PREFIX: &str = "$argon2";

/// The set of column names treated as passwords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    columns: BTreeSet<String>,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        PasswordPolicy::new(DEFAULT_PASSWORD_COLUMNS)
    }
}

impl PasswordPolicy {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        PasswordPolicy {
            columns: columns
                .into_iter()
                .map(|c| c.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// A policy that hashes nothing.
    pub fn disabled() -> Self {
        PasswordPolicy {
            columns: BTreeSet::new(),
        }
    }

    /// Matches on the unqualified, case-folded column name.
    pub fn matches(&self, column: &str) -> bool {
        let bare = column.rsplit('.').next().unwrap_or(column);
        let bare = bare.trim_matches(|c| c == '`' || c == '"');
        self.columns.contains(&bare.to_lowercase())
    }

    /// Hashes `value` if `column` is password-like.
    ///
    /// NULL passes through, and text that is already an argon2 hash is left
    /// alone so re-saving a loaded entity does not double-hash.
    pub fn bind(&self, column: &str, value: Value) -> CoreResult<Value> {
        if !self.matches(column) {
            return Ok(value);
        }
        match value {
            Value::Null => Ok(Value::Null),
            Value::Text(ref s) if s.starts_with(HASH_PREFIX) => Ok(value),
            other => hash_password(column, &other.to_string()).map(Value::Text),
        }
    }
}

/// Hashes a plain-text password into a PHC string.
pub fn hash_password(column: &str, plain: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| CoreError::PasswordHash {
            column: column.to_string(),
            reason: e.to_string(),
        })?;

    Ok(hash.to_string())
}

/// Verifies a plain-text password against a stored hash.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_case_and_qualifier() {
        let policy = PasswordPolicy::default();
        assert!(policy.matches("password"));
        assert!(policy.matches("users.PASSWORD"));
        assert!(!policy.matches("email"));
    }

    #[test]
    fn test_bind_hashes_once() {
        let policy = PasswordPolicy::default();
        let hashed = policy.bind("password", Value::from("hunter2")).unwrap();
        let text = hashed.as_str().unwrap().to_string();
        assert!(text.starts_with("$argon2"));
        assert!(verify_password("hunter2", &text));

        let again = policy.bind("password", hashed).unwrap();
        assert_eq!(again.as_str().unwrap(), text);
    }

    #[test]
    fn test_other_columns_untouched() {
        let policy = PasswordPolicy::default();
        let v = policy.bind("email", Value::from("a@b.c")).unwrap();
        assert_eq!(v, Value::from("a@b.c"));
        assert_eq!(policy.bind("password", Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_disabled_policy() {
        let v = PasswordPolicy::disabled()
            .bind("password", Value::from("plain"))
            .unwrap();
        assert_eq!(v, Value::from("plain"));
    }
}
