//! Registration form rules

use std::fmt;

/// Minimum password length accepted at registration
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// Why a new password was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRejection {
    /// Password and confirmation differ
    Mismatch,
    /// Password has fewer characters than required
    TooShort { min_length: usize },
}

impl fmt::Display for PasswordRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordRejection::Mismatch => write!(f, "Passwords do not match."),
            PasswordRejection::TooShort { min_length } => {
                write!(f, "Password should be at least {} characters.", min_length)
            }
        }
    }
}

/// Validate a password chosen at registration.
///
/// The confirmation is checked before the length, so a mistyped
/// confirmation is reported even when the password is also too short.
pub fn validate_new_password(
    password: &str,
    confirmation: &str,
    min_length: usize,
) -> Result<(), PasswordRejection> {
    if password != confirmation {
        return Err(PasswordRejection::Mismatch);
    }
    if password.chars().count() < min_length {
        return Err(PasswordRejection::TooShort { min_length });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matching_password() {
        assert_eq!(
            validate_new_password("sciencefan1", "sciencefan1", DEFAULT_MIN_PASSWORD_LENGTH),
            Ok(())
        );
    }

    #[test]
    fn test_rejects_mismatch_first() {
        assert_eq!(
            validate_new_password("abc", "abd", DEFAULT_MIN_PASSWORD_LENGTH),
            Err(PasswordRejection::Mismatch)
        );
    }

    #[test]
    fn test_rejects_short_password() {
        let result = validate_new_password("abcde", "abcde", DEFAULT_MIN_PASSWORD_LENGTH);
        assert_eq!(result, Err(PasswordRejection::TooShort { min_length: 6 }));
        assert_eq!(
            result.unwrap_err().to_string(),
            "Password should be at least 6 characters."
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // six characters, twelve bytes
        assert_eq!(validate_new_password("éééééé", "éééééé", 6), Ok(()));
    }
}
