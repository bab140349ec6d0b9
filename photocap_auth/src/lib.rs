//! # PhotoCap Auth
//!
//! Local, file-backed identity layer of the PhotoCap capture app.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   PHOTOCAP AUTH                       │
//! │  ┌──────────────┐  ┌─────────────┐  ┌─────────────┐  │
//! │  │ CREDENTIALS  │  │  THROTTLE   │  │  SESSION    │  │
//! │  │ PBKDF2 PINs  │  │  5 / 300s   │  │  pointer    │  │
//! │  └──────┬───────┘  └──────┬──────┘  └──────┬──────┘  │
//! │         └─────────────────┼────────────────┘         │
//! │                  ┌────────┴────────┐                  │
//! │                  │  ATOMIC WRITER  │                  │
//! │                  │ temp + rename   │                  │
//! │                  └─────────────────┘                  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! - The 10-digit mobile number is the only user key
//! - PINs are stored as salted PBKDF2-HMAC-SHA256 hashes, never in plaintext
//! - Every JSON document goes through the atomic writer

pub mod atomic;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod input;
pub mod migrate;
pub mod record;
pub mod session;
pub mod throttle;

pub use atomic::{remove_best_effort, stage_json, write_json_atomic, StagedWrite};
pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::ManualClock;
pub use config::CredentialConfig;
pub use credentials::{CredentialStore, Identity};
pub use error::{AuthError, AuthResult, InputError};
pub use input::{validate_date_key, validate_pin, Mobile};
pub use migrate::MigrationReport;
pub use session::SessionFile;
pub use throttle::{ThrottlePolicy, ThrottleState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
