//! PhotoCap - Credential Store
//!
//! Per-user credential records keyed by the normalized mobile number:
//!
//! ```text
//! base_dir/
//!   users/<mobile>/auth.json    credentials only
//!   session.json                 current signed-in mobile
//!   trash/<mobile>_<epoch>/      archived user directories
//!   auth/users.json              legacy map, imported on open
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::atomic::write_json_atomic;
use crate::clock::{Clock, SystemClock};
use crate::config::CredentialConfig;
use crate::crypto::PinKdf;
use crate::error::{AuthError, AuthResult};
use crate::input::{validate_pin, Mobile};
use crate::migrate::{migrate_legacy, MigrationReport};
use crate::record::{CredentialRecord, LoadedRecord};
use crate::session::SessionFile;
use crate::throttle::{ThrottlePolicy, ThrottleState};

/// Directory holding one sub-directory per user
pub const USERS_DIR: &str = "users";

/// Credential file inside a user directory
pub const AUTH_FILE: &str = "auth.json";

/// Archive root for deleted users
pub const TRASH_DIR: &str = "trash";

/// Authenticated (or selected) user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub mobile: Mobile,
}

impl From<Mobile> for Identity {
    fn from(mobile: Mobile) -> Self {
        Self { mobile }
    }
}

/// File-backed credential store
#[derive(Debug)]
pub struct CredentialStore {
    base_dir: PathBuf,
    users_root: PathBuf,
    trash_root: PathBuf,
    session: SessionFile,
    policy: ThrottlePolicy,
    kdf: PinKdf,
    clock: Arc<dyn Clock>,
}

impl CredentialStore {
    // ═══════════════════════════════════════════════════════════════════════
    // INITIALIZATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Open with default settings and the system clock
    pub fn open<P: AsRef<Path>>(base_dir: P) -> AuthResult<Self> {
        Self::open_with(
            CredentialConfig::with_base_dir(base_dir.as_ref()),
            Arc::new(SystemClock),
        )
    }

    /// Open with explicit configuration and time source
    pub fn open_with(config: CredentialConfig, clock: Arc<dyn Clock>) -> AuthResult<Self> {
        let base_dir = config.base_dir.clone();
        let users_root = base_dir.join(USERS_DIR);
        fs::create_dir_all(&users_root)?;

        let store = Self {
            trash_root: base_dir.join(TRASH_DIR),
            session: SessionFile::new(&base_dir),
            policy: config.throttle_policy(),
            kdf: config.kdf(),
            base_dir,
            users_root,
            clock,
        };

        if config.migrate_legacy {
            store.run_migration();
        }

        Ok(store)
    }

    fn run_migration(&self) -> Option<MigrationReport> {
        match migrate_legacy(&self.base_dir, &self.users_root, self.clock.now_secs()) {
            Ok(report) => {
                if report.migrated > 0 {
                    log::info!(
                        "Migrated {} legacy account(s) ({} already present, {} invalid)",
                        report.migrated,
                        report.skipped,
                        report.invalid
                    );
                }
                Some(report)
            }
            Err(e) => {
                log::warn!("Legacy account migration failed: {}", e);
                None
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PATHS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn users_root(&self) -> &Path {
        &self.users_root
    }

    pub fn session(&self) -> &SessionFile {
        &self.session
    }

    pub fn user_dir(&self, mobile: &Mobile) -> PathBuf {
        self.users_root.join(mobile.as_str())
    }

    fn auth_path(&self, mobile: &Mobile) -> PathBuf {
        self.user_dir(mobile).join(AUTH_FILE)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // REGISTRATION / LOGIN
    // ═══════════════════════════════════════════════════════════════════════

    /// Create or reset an account.
    ///
    /// Calling this for an existing mobile installs the new PIN and clears
    /// throttling without asking for the old PIN.
    pub fn register(&self, mobile: &str, pin: &str) -> AuthResult<Identity> {
        let mobile = Mobile::parse(mobile)?;
        validate_pin(pin)?;

        let path = self.auth_path(&mobile);
        let now = self.clock.now_secs();

        let mut record = match CredentialRecord::load(&path)? {
            LoadedRecord::Found(r) => r,
            LoadedRecord::Missing => CredentialRecord::new(&mobile, now),
            LoadedRecord::Corrupt => {
                log::warn!("Replacing unreadable credentials for {}", mobile);
                CredentialRecord::new(&mobile, now)
            }
        };

        if record.created_at == 0 {
            record.created_at = now;
        }
        record.mobile = mobile.to_string();
        record.set_pin(self.kdf.hash_new(pin)?, now);
        record.clear_throttle();

        write_json_atomic(&path, &record)?;
        log::info!("Registered account {}", mobile);

        Ok(mobile.into())
    }

    /// Check the PIN, update throttle counters and start a session
    pub fn login(&self, mobile: &str, pin: &str) -> AuthResult<Identity> {
        let mobile = Mobile::parse(mobile)?;
        let path = self.auth_path(&mobile);

        let mut record = match CredentialRecord::load(&path)? {
            LoadedRecord::Missing => return Err(AuthError::NotFound(mobile.to_string())),
            LoadedRecord::Corrupt => return Err(AuthError::Corrupted(mobile.to_string())),
            LoadedRecord::Found(r) => r,
        };

        let now = self.clock.now_secs();

        // The PIN is not even looked at while throttled.
        let state = self.policy.evaluate(record.failed(), record.last_failed(), now);
        if let ThrottleState::Throttled { retry_after_secs } = state {
            log::warn!("Login for {} refused: throttled for {}s", mobile, retry_after_secs);
            return Err(AuthError::Throttled { retry_after_secs });
        }

        if !record.is_initialized() {
            return Err(AuthError::Uninitialized(mobile.to_string()));
        }

        let matches = match self.kdf.verify(pin, &record.pin_salt, &record.pin_hash) {
            Ok(m) => m,
            Err(AuthError::KeyDerivation(_)) => {
                return Err(AuthError::Corrupted(mobile.to_string()))
            }
            Err(e) => return Err(e),
        };

        if !matches {
            let failed = record.record_failure(now);
            write_json_atomic(&path, &record)?;
            if failed >= self.policy.max_failed_attempts {
                log::warn!("Account {} throttled after {} failed attempts", mobile, failed);
            } else {
                log::info!(
                    "Invalid PIN for {} ({} attempt(s) left)",
                    mobile,
                    self.policy.remaining_attempts(failed)
                );
            }
            return Err(AuthError::InvalidCredentials);
        }

        record.clear_throttle();
        record.updated_at = now;
        write_json_atomic(&path, &record)?;

        self.session.begin(&mobile, now)?;
        log::info!("Signed in {}", mobile);

        Ok(mobile.into())
    }

    /// End the session. Being logged out already is fine.
    pub fn logout(&self) -> AuthResult<()> {
        self.session.end()?;
        Ok(())
    }

    /// Signed-in user; `None` if absent, unreadable or invalid
    pub fn current_user(&self) -> Option<Identity> {
        self.session.current().map(Identity::from)
    }

    /// Switch the session to an existing user without asking for the PIN
    pub fn set_current_user(&self, mobile: &str) -> AuthResult<Identity> {
        let mobile = Mobile::parse(mobile)?;
        if !self.auth_path(&mobile).exists() {
            return Err(AuthError::NotFound(mobile.to_string()));
        }
        self.session.begin(&mobile, self.clock.now_secs())?;
        log::info!("Switched session to {}", mobile);
        Ok(mobile.into())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PIN MANAGEMENT
    // ═══════════════════════════════════════════════════════════════════════

    /// PIN check without side effects. Any failure reads as `false`.
    pub fn verify_pin(&self, mobile: &str, pin: &str) -> bool {
        match self.check_pin(mobile, pin) {
            Ok(ok) => ok,
            Err(e) => {
                log::debug!("PIN verification failed softly: {}", e);
                false
            }
        }
    }

    fn check_pin(&self, mobile: &str, pin: &str) -> AuthResult<bool> {
        let mobile = Mobile::parse(mobile)?;
        match CredentialRecord::load(&self.auth_path(&mobile))? {
            LoadedRecord::Found(r) if r.is_initialized() => {
                self.kdf.verify(pin, &r.pin_salt, &r.pin_hash)
            }
            _ => Ok(false),
        }
    }

    /// Replace the PIN after proving the old one. Throttle counters stay.
    pub fn change_pin(&self, mobile: &str, old_pin: &str, new_pin: &str) -> AuthResult<()> {
        if !self.verify_pin(mobile, old_pin) {
            return Err(AuthError::InvalidCredentials);
        }

        let mobile = Mobile::parse(mobile)?;
        let path = self.auth_path(&mobile);
        let mut record = match CredentialRecord::load(&path)? {
            LoadedRecord::Found(r) => r,
            LoadedRecord::Missing => return Err(AuthError::NotFound(mobile.to_string())),
            LoadedRecord::Corrupt => return Err(AuthError::Corrupted(mobile.to_string())),
        };

        record.set_pin(self.kdf.hash_new(new_pin)?, self.clock.now_secs());
        write_json_atomic(&path, &record)?;
        log::info!("PIN changed for {}", mobile);

        Ok(())
    }

    /// Current throttle state of an account
    pub fn throttle_state(&self, mobile: &str) -> AuthResult<ThrottleState> {
        let mobile = Mobile::parse(mobile)?;
        match CredentialRecord::load(&self.auth_path(&mobile))? {
            LoadedRecord::Found(r) => Ok(self.policy.evaluate(
                r.failed(),
                r.last_failed(),
                self.clock.now_secs(),
            )),
            LoadedRecord::Missing => Err(AuthError::NotFound(mobile.to_string())),
            LoadedRecord::Corrupt => Err(AuthError::Corrupted(mobile.to_string())),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // USER DIRECTORY
    // ═══════════════════════════════════════════════════════════════════════

    pub fn user_exists(&self, mobile: &str) -> bool {
        Mobile::parse(mobile)
            .map(|m| self.auth_path(&m).exists())
            .unwrap_or(false)
    }

    /// Sorted mobiles that have a credential file
    pub fn list_users(&self) -> Vec<Mobile> {
        let entries = match fs::read_dir(&self.users_root) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot list {}: {}", self.users_root.display(), e);
                return Vec::new();
            }
        };

        let mut users: Vec<Mobile> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().and_then(Mobile::from_exact))
            .filter(|m| self.auth_path(m).is_file())
            .collect();
        users.sort();
        users
    }

    /// Archive (default) or purge a user directory.
    ///
    /// Returns `false` if the user has no directory. Clears the session if
    /// it belonged to this user. Not atomic across files: a crash mid-way
    /// can leave a partially moved directory.
    pub fn delete_user(&self, mobile: &str, archive: bool) -> AuthResult<bool> {
        let mobile = Mobile::parse(mobile)?;
        let dir = self.user_dir(&mobile);
        if !dir.is_dir() {
            return Ok(false);
        }

        if archive {
            fs::create_dir_all(&self.trash_root)?;
            let target = self.trash_target(&mobile);
            fs::rename(&dir, &target)?;
            log::info!("Archived {} to {}", mobile, target.display());
        } else {
            fs::remove_dir_all(&dir)?;
            log::info!("Deleted {}", mobile);
        }

        self.session.end_if_owned_by(&mobile);
        Ok(true)
    }

    fn trash_target(&self, mobile: &Mobile) -> PathBuf {
        let stem = format!("{}_{}", mobile, self.clock.now_secs());
        let mut target = self.trash_root.join(&stem);
        let mut k = 1;
        while target.exists() {
            target = self.trash_root.join(format!("{}_{}", stem, k));
            k += 1;
        }
        target
    }
}
