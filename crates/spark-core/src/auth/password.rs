//! Password digests

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Length of a hex-encoded SHA-256 digest
const LEGACY_DIGEST_HEX_LEN: usize = 64;

/// Result of checking a password against a stored digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    /// Password matches. `needs_rehash` is set for legacy digests.
    Valid { needs_rehash: bool },
    Invalid,
}

/// Hash a password into an Argon2id PHC string with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Unsalted SHA-256 hex digest used by accounts created before Argon2
pub fn legacy_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Check a password against a stored digest of either scheme
pub fn verify_password(password: &str, stored: &str) -> PasswordCheck {
    if is_legacy_digest(stored) {
        return verify_legacy(password, stored);
    }

    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password digest is not a valid PHC string");
            return PasswordCheck::Invalid;
        }
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => PasswordCheck::Valid { needs_rehash: false },
        Err(_) => PasswordCheck::Invalid,
    }
}

fn is_legacy_digest(stored: &str) -> bool {
    stored.len() == LEGACY_DIGEST_HEX_LEN && stored.bytes().all(|b| b.is_ascii_hexdigit())
}

fn verify_legacy(password: &str, stored: &str) -> PasswordCheck {
    let Ok(expected) = hex::decode(stored) else {
        return PasswordCheck::Invalid;
    };
    let actual = Sha256::digest(password.as_bytes());

    if actual.as_slice() == expected.as_slice() {
        PasswordCheck::Valid { needs_rehash: true }
    } else {
        PasswordCheck::Invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("sciencefan1").unwrap();
        let b = hash_password("sciencefan1").unwrap();

        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b, "Two hashes of the same password must differ by salt");
    }

    #[test]
    fn test_verify_argon2() {
        let stored = hash_password("sciencefan1").unwrap();

        assert_eq!(
            verify_password("sciencefan1", &stored),
            PasswordCheck::Valid { needs_rehash: false }
        );
        assert_eq!(verify_password("wrong", &stored), PasswordCheck::Invalid);
    }

    #[test]
    fn test_legacy_digest_matches_known_vector() {
        // sha256("password")
        assert_eq!(
            legacy_digest("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn test_verify_legacy_requests_rehash() {
        let stored = legacy_digest("sciencefan1");

        assert_eq!(
            verify_password("sciencefan1", &stored),
            PasswordCheck::Valid { needs_rehash: true }
        );
        assert_eq!(verify_password("sciencefan2", &stored), PasswordCheck::Invalid);
    }

    #[test]
    fn test_verify_garbage_digest_is_invalid() {
        assert_eq!(verify_password("anything", "not-a-hash"), PasswordCheck::Invalid);
        assert_eq!(verify_password("anything", ""), PasswordCheck::Invalid);
    }
}
