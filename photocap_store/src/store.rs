//! PhotoCap Store - Per-user data
//!
//! ```text
//! base_dir/users/<mobile>/
//!   profile.json                          profile record
//!   uploads/<mobile>_<YYYYMMDD>_<N>.<ext> media files
//!   uploads/<file>.json                   sidecars (UI-owned)
//! ```
//!
//! Uploads have no manifest. Every listing rescans the directory, so files
//! removed or renamed outside the store show up immediately.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use photocap_auth::{
    validate_date_key, write_json_atomic, Clock, InputError, Mobile, SystemClock,
};

use crate::error::{StoreError, StoreResult};
use crate::housekeeping::{directory_usage, StorageUsage};
use crate::media::{is_known_media, normalized_extension, MediaType};
use crate::profile::Profile;
use crate::sidecar::{is_sidecar_name, SIDECAR_SUFFIX};
use crate::uploads::{
    copy_new, modified_at, next_sequence, owner_prefix, upload_file_name, UploadRecord,
};

/// Directory holding one sub-directory per user
pub const USERS_DIR: &str = "users";

/// Profile file inside a user directory
pub const PROFILE_FILE: &str = "profile.json";

/// Upload directory inside a user directory
pub const UPLOADS_DIR: &str = "uploads";

/// File-backed per-user data store
#[derive(Debug)]
pub struct UserDataStore {
    users_root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl UserDataStore {
    // ═══════════════════════════════════════════════════════════════════════
    // INITIALIZATION
    // ═══════════════════════════════════════════════════════════════════════

    pub fn open<P: AsRef<Path>>(base_dir: P) -> StoreResult<Self> {
        Self::open_with(base_dir.as_ref(), Arc::new(SystemClock))
    }

    pub fn open_with(base_dir: &Path, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        let users_root = base_dir.join(USERS_DIR);
        fs::create_dir_all(&users_root)?;
        // Upload records carry absolute paths.
        let users_root = fs::canonicalize(&users_root).unwrap_or(users_root);
        Ok(Self { users_root, clock })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PATHS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn users_root(&self) -> &Path {
        &self.users_root
    }

    fn user_dir(&self, mobile: &Mobile) -> PathBuf {
        self.users_root.join(mobile.as_str())
    }

    fn profile_path(&self, mobile: &Mobile) -> PathBuf {
        self.user_dir(mobile).join(PROFILE_FILE)
    }

    fn uploads_dir(&self, mobile: &Mobile) -> PathBuf {
        self.user_dir(mobile).join(UPLOADS_DIR)
    }

    /// Upload directory of a user. Pure path computation.
    pub fn user_uploads_dir(&self, mobile: &str) -> StoreResult<PathBuf> {
        Ok(self.uploads_dir(&Mobile::parse(mobile)?))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PROFILE
    // ═══════════════════════════════════════════════════════════════════════

    /// Load a profile, creating it with defaults if needed.
    ///
    /// Reading has a write side effect on purpose: a missing or unreadable
    /// profile, or one lacking a fixed key, is persisted with the defaults
    /// filled in. That write is best-effort.
    pub fn load_profile(&self, mobile: &str) -> StoreResult<Profile> {
        let mobile = Mobile::parse(mobile)?;
        let path = self.profile_path(&mobile);

        let (mut profile, mut dirty) = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => (Profile::from_map(map), false),
                _ => {
                    log::warn!("Unreadable profile for {}, starting fresh", mobile);
                    (Profile::new(), true)
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => (Profile::new(), true),
            Err(e) => return Err(e.into()),
        };

        dirty |= profile.fill_defaults(&mobile);

        if dirty {
            if let Err(e) = write_json_atomic(&path, &profile) {
                log::warn!("Could not persist profile for {}: {}", mobile, e);
            }
        }

        Ok(profile)
    }

    /// Replace the stored profile with `profile` as given (no merge)
    pub fn save_profile(&self, mobile: &str, profile: &Profile) -> StoreResult<()> {
        let mobile = Mobile::parse(mobile)?;
        write_json_atomic(&self.profile_path(&mobile), profile)?;
        Ok(())
    }

    /// Fill blank fixed fields from an old single-user `profile.json`.
    ///
    /// Returns whether the stored profile changed. A missing or unreadable
    /// legacy file changes nothing.
    pub fn import_legacy_profile(&self, mobile: &str, legacy_path: &Path) -> StoreResult<bool> {
        let legacy = match fs::read(legacy_path) {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(map)) => map,
                _ => return Ok(false),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let mut profile = self.load_profile(mobile)?;
        if !profile.absorb_blank_fields(&legacy) {
            return Ok(false);
        }
        self.save_profile(mobile, &profile)?;
        log::info!("Imported legacy profile fields for {}", profile.mobile());
        Ok(true)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // UPLOADS
    // ═══════════════════════════════════════════════════════════════════════

    /// Copy `source` into the owner's upload directory under the next free
    /// name for `date_key` (today when `None`).
    pub fn add_upload(
        &self,
        owner: &str,
        source: &Path,
        date_key: Option<&str>,
    ) -> StoreResult<UploadRecord> {
        let mobile = Mobile::parse(owner)?;
        if !source.is_file() {
            return Err(StoreError::NotFound(source.display().to_string()));
        }

        let date_key = match date_key {
            Some(key) => {
                validate_date_key(key)?;
                key.to_string()
            }
            None => self.clock.date_key(),
        };

        // `<upload>.json` is the sidecar namespace
        let ext = normalized_extension(source);
        if ext == SIDECAR_SUFFIX {
            return Err(InputError::ReservedExtension(ext).into());
        }
        if !ext.is_empty() && !is_known_media(&ext) {
            log::debug!("Unrecognised extension {} stored as image", ext);
        }

        let dir = self.uploads_dir(&mobile);
        fs::create_dir_all(&dir)?;

        let mut seq = next_sequence(&dir, &mobile, &date_key)?;
        let (filename, path) = loop {
            let filename = upload_file_name(&mobile, &date_key, seq, &ext);
            let path = dir.join(&filename);
            match copy_new(source, &path) {
                Ok(()) => break (filename, path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    seq = seq.checked_add(1).ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::Other,
                            format!("no free upload number left for {}", date_key),
                        )
                    })?;
                }
                Err(e) => return Err(e.into()),
            }
        };

        log::info!("Stored upload {} for {}", filename, mobile);

        let created_at = modified_at(&path).unwrap_or_else(|| self.now_utc());
        Ok(UploadRecord {
            media_type: MediaType::from_extension(&ext),
            path,
            filename,
            created_at,
        })
    }

    /// Uploads of a user sorted by file name (date, then sequence as text).
    ///
    /// Files may vanish between this call and their use; callers check
    /// [`UploadRecord::exists`] before touching one.
    pub fn list_uploads_for_mobile(&self, owner: &str) -> StoreResult<Vec<UploadRecord>> {
        let mobile = Mobile::parse(owner)?;
        let dir = self.uploads_dir(&mobile);
        let prefix = owner_prefix(&mobile);

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(&prefix) && !is_sidecar_name(name))
            .collect();
        names.sort();

        let uploads = names
            .into_iter()
            .filter_map(|filename| {
                let path = dir.join(&filename);
                if !path.is_file() {
                    return None;
                }
                let created_at = modified_at(&path).unwrap_or_else(|| self.now_utc());
                Some(UploadRecord {
                    media_type: MediaType::from_path(&path),
                    path,
                    filename,
                    created_at,
                })
            })
            .collect();

        Ok(uploads)
    }

    /// Disk usage of everything under a user's directory
    pub fn storage_usage(&self, mobile: &str) -> StoreResult<StorageUsage> {
        let mobile = Mobile::parse(mobile)?;
        directory_usage(&self.user_dir(&mobile))
    }

    fn now_utc(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(self.clock.now_secs(), 0).unwrap_or_else(chrono::Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photocap_auth::ManualClock;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    const MOBILE: &str = "9876543210";
    const DAY: &str = "20240131";

    fn store() -> (TempDir, UserDataStore) {
        let dir = tempdir().unwrap();
        let store =
            UserDataStore::open_with(dir.path(), Arc::new(ManualClock::new(1_706_700_000))).unwrap();
        (dir, store)
    }

    fn source(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"media bytes").unwrap();
        path
    }

    #[test]
    fn test_load_profile_creates_defaults() {
        let (_dir, store) = store();
        let profile = store.load_profile("98765 43210").unwrap();
        assert_eq!(profile.mobile(), MOBILE);
        assert_eq!(profile.name(), "");

        let on_disk: Value = serde_json::from_slice(
            &fs::read(store.users_root().join(MOBILE).join(PROFILE_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(
            on_disk,
            json!({"mobile": MOBILE, "name": "", "email": "", "state": "", "district": "", "address": ""})
        );
    }

    #[test]
    fn test_load_profile_replaces_corrupt_file() {
        let (_dir, store) = store();
        let path = store.users_root().join(MOBILE).join(PROFILE_FILE);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{broken").unwrap();

        let profile = store.load_profile(MOBILE).unwrap();
        assert_eq!(profile.mobile(), MOBILE);
        let on_disk: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk["mobile"], MOBILE);
    }

    #[test]
    fn test_profile_round_trip_keeps_extra_keys() {
        let (_dir, store) = store();
        let mut data = Profile::new();
        data.set("name", "Asha");
        data.set("email", "asha@example.com");
        data.set("team", json!({"id": 4, "lead": true}));

        store.save_profile(MOBILE, &data).unwrap();
        let back = store.load_profile(MOBILE).unwrap();

        for (key, value) in data.fields() {
            assert_eq!(back.get(key), Some(value), "key {}", key);
        }
        assert_eq!(back.mobile(), MOBILE);
        assert_eq!(back.text("district"), "");
    }

    #[test]
    fn test_save_profile_overwrites_without_merge() {
        let (_dir, store) = store();
        let mut first = Profile::new();
        first.set("name", "Asha");
        first.set("hobby", "birds");
        store.save_profile(MOBILE, &first).unwrap();

        let mut second = Profile::new();
        second.set("name", "Ravi");
        store.save_profile(MOBILE, &second).unwrap();

        let back = store.load_profile(MOBILE).unwrap();
        assert_eq!(back.name(), "Ravi");
        assert!(back.get("hobby").is_none());
    }

    #[test]
    fn test_profile_rejects_bad_mobile() {
        let (_dir, store) = store();
        assert!(matches!(
            store.load_profile("12345"),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_import_legacy_profile() {
        let (dir, store) = store();
        let legacy = dir.path().join("profile.json");
        assert!(!store.import_legacy_profile(MOBILE, &legacy).unwrap());

        fs::write(&legacy, br#"{"name": "Old Name", "state": "KA", "email": ""}"#).unwrap();
        let mut current = store.load_profile(MOBILE).unwrap();
        current.set("state", "TN");
        store.save_profile(MOBILE, &current).unwrap();

        assert!(store.import_legacy_profile(MOBILE, &legacy).unwrap());
        let back = store.load_profile(MOBILE).unwrap();
        assert_eq!(back.name(), "Old Name");
        assert_eq!(back.text("state"), "TN");
    }

    #[test]
    fn test_add_upload_sequences() {
        let (dir, store) = store();
        let src = source(&dir, "capture_1.JPG");

        let names: Vec<String> = (0..3)
            .map(|_| store.add_upload(MOBILE, &src, Some(DAY)).unwrap().filename)
            .collect();
        assert_eq!(
            names,
            vec![
                "9876543210_20240131_1.jpg",
                "9876543210_20240131_2.jpg",
                "9876543210_20240131_3.jpg"
            ]
        );

        // deleting _2 leaves a gap; the next upload is _4
        let uploads_dir = store.user_uploads_dir(MOBILE).unwrap();
        fs::remove_file(uploads_dir.join("9876543210_20240131_2.jpg")).unwrap();
        let next = store.add_upload(MOBILE, &src, Some(DAY)).unwrap();
        assert_eq!(next.filename, "9876543210_20240131_4.jpg");

        // another day starts at 1
        let other = store.add_upload(MOBILE, &src, Some("20240201")).unwrap();
        assert_eq!(other.filename, "9876543210_20240201_1.jpg");

        // the source is copied, not moved
        assert!(src.exists());
    }

    #[test]
    fn test_add_upload_record_fields() {
        let (dir, store) = store();
        let src = source(&dir, "rec_5.mp4");

        let record = store.add_upload(MOBILE, &src, Some(DAY)).unwrap();
        assert_eq!(record.media_type, MediaType::Video);
        assert!(record.path.is_absolute());
        assert_eq!(record.path.file_name().unwrap(), record.filename.as_str());
        assert_eq!(fs::read(&record.path).unwrap(), b"media bytes");
        assert_eq!(Some(record.created_at), modified_at(&src));
    }

    #[test]
    fn test_add_upload_uses_clock_date() {
        let (dir, store) = store();
        let src = source(&dir, "capture.png");
        let record = store.add_upload(MOBILE, &src, None).unwrap();
        let expected = format!("{}_{}_1.png", MOBILE, photocap_auth::clock::date_key_for(1_706_700_000));
        assert_eq!(record.filename, expected);
    }

    #[test]
    fn test_add_upload_errors() {
        let (dir, store) = store();
        assert!(matches!(
            store.add_upload(MOBILE, &dir.path().join("missing.jpg"), Some(DAY)),
            Err(StoreError::NotFound(_))
        ));
        let src = source(&dir, "a.jpg");
        assert!(matches!(
            store.add_upload(MOBILE, &src, Some("2024-01-31")),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.add_upload("123", &src, Some(DAY)),
            Err(StoreError::Validation(_))
        ));
        // a directory is not an uploadable file
        assert!(matches!(
            store.add_upload(MOBILE, dir.path(), Some(DAY)),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_add_upload_rejects_json_source() {
        let (dir, store) = store();
        let src = source(&dir, "notes.JSON");
        assert!(matches!(
            store.add_upload(MOBILE, &src, Some(DAY)),
            Err(StoreError::Validation(InputError::ReservedExtension(_)))
        ));
        // nothing was stored that a listing could miss
        assert!(!store.user_uploads_dir(MOBILE).unwrap().exists());
        assert!(store.list_uploads_for_mobile(MOBILE).unwrap().is_empty());
    }

    #[test]
    fn test_add_upload_exhausted_sequence_is_an_error() {
        let (dir, store) = store();
        let src = source(&dir, "a.jpg");
        let uploads = store.user_uploads_dir(MOBILE).unwrap();
        fs::create_dir_all(&uploads).unwrap();
        fs::write(uploads.join(format!("{}_{}_{}.jpg", MOBILE, DAY, u32::MAX)), b"x").unwrap();

        assert!(matches!(
            store.add_upload(MOBILE, &src, Some(DAY)),
            Err(StoreError::Io(_))
        ));
        // other days are unaffected
        let record = store.add_upload(MOBILE, &src, Some("20240201")).unwrap();
        assert_eq!(record.filename, "9876543210_20240201_1.jpg");
    }

    #[test]
    fn test_sidecar_does_not_raise_sequence() {
        let (dir, store) = store();
        let src = source(&dir, "a.jpg");
        let uploads = store.user_uploads_dir(MOBILE).unwrap();
        fs::create_dir_all(&uploads).unwrap();
        // a sidecar does not count as an upload
        fs::write(uploads.join("9876543210_20240131_1.jpg.json"), b"{}").unwrap();

        let record = store.add_upload(MOBILE, &src, Some(DAY)).unwrap();
        assert_eq!(record.filename, "9876543210_20240131_1.jpg");
        assert!(uploads.join("9876543210_20240131_1.jpg.json").exists());
    }

    #[test]
    fn test_list_uploads() {
        let (dir, store) = store();
        assert!(store.list_uploads_for_mobile(MOBILE).unwrap().is_empty());

        let jpg = source(&dir, "a.jpg");
        let mp4 = source(&dir, "b.mp4");
        store.add_upload(MOBILE, &jpg, Some("20240201")).unwrap();
        store.add_upload(MOBILE, &mp4, Some(DAY)).unwrap();
        store.add_upload(MOBILE, &jpg, Some(DAY)).unwrap();

        let uploads = store.user_uploads_dir(MOBILE).unwrap();
        fs::write(uploads.join("9876543210_20240131_1.mp4.json"), b"{}").unwrap();
        fs::write(uploads.join("1111111111_20240131_1.jpg"), b"x").unwrap();
        fs::write(uploads.join("notes.txt"), b"x").unwrap();
        fs::create_dir(uploads.join("9876543210_folder")).unwrap();

        let listed = store.list_uploads_for_mobile(MOBILE).unwrap();
        let names: Vec<&str> = listed.iter().map(|u| u.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "9876543210_20240131_1.mp4",
                "9876543210_20240131_2.jpg",
                "9876543210_20240201_1.jpg"
            ]
        );
        assert_eq!(listed[0].media_type, MediaType::Video);
        assert_eq!(listed[1].media_type, MediaType::Image);
        assert!(listed.iter().all(UploadRecord::exists));

        // external deletion shows up on the next listing
        fs::remove_file(&listed[0].path).unwrap();
        assert!(!listed[0].exists());
        assert_eq!(store.list_uploads_for_mobile(MOBILE).unwrap().len(), 2);
    }

    #[test]
    fn test_user_uploads_dir_is_pure() {
        let (_dir, store) = store();
        let path = store.user_uploads_dir(MOBILE).unwrap();
        assert!(path.ends_with("users/9876543210/uploads"));
        assert!(!path.exists());
    }

    #[test]
    fn test_storage_usage() {
        let (dir, store) = store();
        assert_eq!(store.storage_usage(MOBILE).unwrap(), StorageUsage::default());

        let src = source(&dir, "a.jpg");
        store.add_upload(MOBILE, &src, Some(DAY)).unwrap();
        let usage = store.storage_usage(MOBILE).unwrap();
        assert_eq!(usage.files, 1);
        assert_eq!(usage.bytes, b"media bytes".len() as u64);
    }
}
