//! Credential store
//!
//! Registration and login verification against the `users` table.
//!
//! Passwords are stored as salted Argon2id PHC strings. Accounts created by
//! the original deployment carry an unsalted SHA-256 hex digest; those still
//! verify and are rehashed to Argon2id on the first successful login.

pub mod password;
pub mod store;
pub mod validation;

pub use password::PasswordCheck;
pub use store::{CredentialStore, LoginOutcome, RegisterOutcome, User, UserId};
pub use validation::{DEFAULT_MIN_PASSWORD_LENGTH, PasswordRejection, validate_new_password};
