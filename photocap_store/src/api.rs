//! PhotoCap Store - Unified Public API
//!
//! Single entry point for the capture app: accounts, the active session,
//! profiles and uploads. Operations on "the active user" read the session
//! pointer on every call, so another process switching users is picked up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use photocap_auth::{Clock, CredentialConfig, CredentialStore, Identity, Mobile, SystemClock};

use crate::error::{StoreError, StoreResult};
use crate::housekeeping::{prune_capture_temp_files, StorageUsage};
use crate::profile::Profile;
use crate::sidecar::{read_sidecar, write_sidecar, UploadSidecar};
use crate::store::UserDataStore;
use crate::uploads::UploadRecord;

/// Legacy single-user profile at the data dir root
pub const LEGACY_PROFILE_FILE: &str = "profile.json";

// ═══════════════════════════════════════════════════════════════════════════════
// API CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Credential settings, including the data directory
    #[serde(flatten)]
    pub credentials: CredentialConfig,
    /// Capture temp files kept by `prune`
    pub capture_keep_count: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            credentials: CredentialConfig::default(),
            capture_keep_count: 3,
        }
    }
}

impl ApiConfig {
    pub fn with_base_dir<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            credentials: CredentialConfig::with_base_dir(base_dir),
            ..Default::default()
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.credentials.base_dir
    }

    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Like [`ApiConfig::load`], but a missing file gives the defaults
    pub fn load_or_default(path: &Path) -> StoreResult<Self> {
        match Self::load(path) {
            Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PHOTOCAP API
// ═══════════════════════════════════════════════════════════════════════════════

/// PhotoCap API
///
/// # Example
///
/// ```rust,ignore
/// use photocap_store::api::{ApiConfig, PhotoCapApi};
///
/// let api = PhotoCapApi::open(ApiConfig::with_base_dir("/data/photocap"))?;
/// api.register_account("9876543210", "1234", "Asha")?;
/// api.sign_in("9876543210", "1234")?;
///
/// let upload = api.capture_upload("/tmp/capture_1.jpg".as_ref(), "site visit", None)?;
/// for record in api.active_uploads()? {
///     println!("{}", record.filename);
/// }
/// ```
#[derive(Debug)]
pub struct PhotoCapApi {
    auth: CredentialStore,
    store: UserDataStore,
    clock: Arc<dyn Clock>,
    config: ApiConfig,
}

impl PhotoCapApi {
    // ═══════════════════════════════════════════════════════════════════════
    // INITIALIZATION
    // ═══════════════════════════════════════════════════════════════════════

    pub fn open(config: ApiConfig) -> StoreResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: ApiConfig, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let auth = CredentialStore::open_with(config.credentials.clone(), clock.clone())?;
        let store = UserDataStore::open_with(config.base_dir(), clock.clone())?;
        log::debug!("PhotoCap opened at {}", config.base_dir().display());

        Ok(Self {
            auth,
            store,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Credential store, for account administration
    pub fn credentials(&self) -> &CredentialStore {
        &self.auth
    }

    /// Per-user data store
    pub fn data(&self) -> &UserDataStore {
        &self.store
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ACCOUNTS / SESSION
    // ═══════════════════════════════════════════════════════════════════════

    /// Register (or reset) an account and record `name` in its profile
    pub fn register_account(&self, mobile: &str, pin: &str, name: &str) -> StoreResult<Identity> {
        let identity = self.auth.register(mobile, pin)?;
        let key = identity.mobile.as_str();

        let name = name.trim();
        if !name.is_empty() {
            let mut profile = self.store.load_profile(key)?;
            profile.set("name", name);
            self.store.save_profile(key, &profile)?;
        } else {
            self.store.load_profile(key)?;
        }

        Ok(identity)
    }

    pub fn sign_in(&self, mobile: &str, pin: &str) -> StoreResult<Identity> {
        Ok(self.auth.login(mobile, pin)?)
    }

    pub fn sign_out(&self) -> StoreResult<()> {
        Ok(self.auth.logout()?)
    }

    /// Signed-in mobile, if any
    pub fn active_mobile(&self) -> Option<Mobile> {
        self.auth.current_user().map(|identity| identity.mobile)
    }

    fn require_session(&self) -> StoreResult<Mobile> {
        self.active_mobile().ok_or(StoreError::NoActiveSession)
    }

    /// Archive (or purge) an account and its data
    pub fn delete_account(&self, mobile: &str, archive: bool) -> StoreResult<bool> {
        Ok(self.auth.delete_user(mobile, archive)?)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PROFILE
    // ═══════════════════════════════════════════════════════════════════════

    pub fn active_profile(&self) -> StoreResult<Profile> {
        let mobile = self.require_session()?;
        self.store.load_profile(mobile.as_str())
    }

    /// Fill blank fields of the active profile from the legacy single-user
    /// `profile.json`. The legacy file belongs to whoever owned the device,
    /// so this only runs on request, never as part of registration.
    pub fn import_legacy_profile(&self) -> StoreResult<bool> {
        let mobile = self.require_session()?;
        let legacy = self.config.base_dir().join(LEGACY_PROFILE_FILE);
        self.store.import_legacy_profile(mobile.as_str(), &legacy)
    }

    /// Merge `changes` into the active user's profile and save it
    pub fn update_active_profile(&self, changes: Map<String, Value>) -> StoreResult<Profile> {
        let mobile = self.require_session()?;
        let mut profile = self.store.load_profile(mobile.as_str())?;
        for (key, value) in changes {
            profile.set(&key, value);
        }
        self.store.save_profile(mobile.as_str(), &profile)?;
        Ok(profile)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // UPLOADS
    // ═══════════════════════════════════════════════════════════════════════

    /// Store a captured file for the active user and describe it in a
    /// sidecar. A failed sidecar write does not undo the upload.
    pub fn capture_upload(
        &self,
        source: &Path,
        description: &str,
        date_key: Option<&str>,
    ) -> StoreResult<UploadRecord> {
        let mobile = self.require_session()?;
        let record = self.store.add_upload(mobile.as_str(), source, date_key)?;

        let created_at = self.clock.now_secs() as f64;
        if let Err(e) = write_sidecar(&record, &mobile, description, created_at) {
            log::warn!("Sidecar for {} not written: {}", record.filename, e);
        }

        Ok(record)
    }

    /// Uploads of the active user that still exist on disk
    pub fn active_uploads(&self) -> StoreResult<Vec<UploadRecord>> {
        let mobile = self.require_session()?;
        let uploads = self.store.list_uploads_for_mobile(mobile.as_str())?;
        Ok(uploads.into_iter().filter(UploadRecord::exists).collect())
    }

    /// Uploads of the active user paired with their sidecars
    pub fn upload_details(&self) -> StoreResult<Vec<(UploadRecord, Option<UploadSidecar>)>> {
        Ok(self
            .active_uploads()?
            .into_iter()
            .map(|record| {
                let sidecar = read_sidecar(&record.path);
                (record, sidecar)
            })
            .collect())
    }

    pub fn active_storage_usage(&self) -> StoreResult<StorageUsage> {
        let mobile = self.require_session()?;
        self.store.storage_usage(mobile.as_str())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // MAINTENANCE
    // ═══════════════════════════════════════════════════════════════════════

    /// Prune capture temp files in `dir`, keeping `keep` or the configured count
    pub fn prune_capture_temp(&self, dir: &Path, keep: Option<usize>) -> usize {
        prune_capture_temp_files(dir, keep.unwrap_or(self.config.capture_keep_count))
    }
}
