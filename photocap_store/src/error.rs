//! PhotoCap Store - Error Types

use photocap_auth::{AuthError, InputError};
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error types
#[derive(Error, Debug)]
pub enum StoreError {
    // ═══════════════════════════════════════════════════════════════
    // INPUT ERRORS
    // ═══════════════════════════════════════════════════════════════
    
    #[error(transparent)]
    Validation(#[from] InputError),
    
    #[error("File not found: {0}")]
    NotFound(String),
    
    // ═══════════════════════════════════════════════════════════════
    // SESSION ERRORS
    // ═══════════════════════════════════════════════════════════════
    
    #[error("No active session - sign in first")]
    NoActiveSession,
    
    #[error(transparent)]
    Auth(#[from] AuthError),
    
    // ═══════════════════════════════════════════════════════════════
    // FILE ERRORS
    // ═══════════════════════════════════════════════════════════════
    
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Check if the caller can fix this by changing its input
    pub fn is_caller_correctable(&self) -> bool {
        match self {
            StoreError::Validation(_) | StoreError::NotFound(_) | StoreError::NoActiveSession => true,
            StoreError::Auth(e) => e.is_caller_correctable(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
