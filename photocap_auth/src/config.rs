//! Credential store configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::crypto::{PinKdf, DEFAULT_ITERATIONS};
use crate::throttle::ThrottlePolicy;

/// Directory name under the platform data dir
pub const APP_DIR_NAME: &str = "photocap";

/// Credential store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Application data directory (holds `users/`, `session.json`, `trash/`)
    pub base_dir: PathBuf,
    /// Failures before the cooldown
    pub max_failed_attempts: u32,
    /// Cooldown after the last failure (seconds)
    pub throttle_window_secs: i64,
    /// PBKDF2 rounds
    pub pbkdf2_iterations: u32,
    /// Import `auth/users.json` on open
    pub migrate_legacy: bool,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            max_failed_attempts: 5,
            throttle_window_secs: 300,
            pbkdf2_iterations: DEFAULT_ITERATIONS,
            migrate_legacy: true,
        }
    }
}

impl CredentialConfig {
    pub fn with_base_dir<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            max_failed_attempts: self.max_failed_attempts,
            window_secs: self.throttle_window_secs,
        }
    }

    pub fn kdf(&self) -> PinKdf {
        PinKdf::new(self.pbkdf2_iterations)
    }
}

/// `<data dir>/photocap`, or `./photocap-data` without a platform data dir
pub fn default_base_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./photocap-data"))
}
