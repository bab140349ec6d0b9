//! Error types for PhotoCap credentials

use thiserror::Error;

/// Malformed caller input. Always correctable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Enter a valid 10-digit mobile number.")]
    Mobile,

    #[error("PIN must be 4-6 digits.")]
    Pin,

    #[error("Date key must be YYYYMMDD, got {0:?}")]
    DateKey(String),

    #[error("Files ending in {0} can not be uploaded")]
    ReservedExtension(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] InputError),

    #[error("Account not found for {0}. Please register.")]
    NotFound(String),

    #[error("Corrupted account record for {0}. Recreate the user.")]
    Corrupted(String),

    #[error("Account {0} is not initialized properly")]
    Uninitialized(String),

    #[error("Too many attempts. Try again in {retry_after_secs} seconds.")]
    Throttled { retry_after_secs: i64 },

    #[error("Invalid PIN")]
    InvalidCredentials,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

impl AuthError {
    /// Errors the user can fix by re-entering input
    pub fn is_caller_correctable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidCredentials)
    }

    pub fn is_security_critical(&self) -> bool {
        matches!(self, Self::Throttled { .. } | Self::InvalidCredentials)
    }
}
