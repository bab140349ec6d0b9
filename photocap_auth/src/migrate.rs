//! One-way import of the legacy single-file credential map
//!
//! Older builds kept every account in `auth/users.json`:
//!
//! ```json
//! { "users_by_mobile": { "9876543210": { "pin_salt": "..", "pin_hash": "..",
//!                                        "created_at": 0, "updated_at": 0 } } }
//! ```
//!
//! Each valid entry becomes `users/<mobile>/auth.json`. The legacy file is
//! never modified and accounts that already have a per-user record are left
//! alone, so running this on every start is harmless.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::atomic::write_json_atomic;
use crate::credentials::AUTH_FILE;
use crate::error::AuthResult;
use crate::input::Mobile;
use crate::record::CredentialRecord;

pub const LEGACY_DIR: &str = "auth";
pub const LEGACY_FILE: &str = "users.json";

/// Outcome of one migration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Entries written to the per-user layout
    pub migrated: usize,
    /// Entries whose per-user record already existed
    pub skipped: usize,
    /// Entries with a bad mobile number or a non-object body
    pub invalid: usize,
}

pub fn legacy_map_path(base_dir: &Path) -> PathBuf {
    base_dir.join(LEGACY_DIR).join(LEGACY_FILE)
}

/// Import `auth/users.json` into `users_root`. A missing legacy file is an
/// empty report.
pub fn migrate_legacy(base_dir: &Path, users_root: &Path, now: i64) -> AuthResult<MigrationReport> {
    let mut report = MigrationReport::default();

    let bytes = match fs::read(legacy_map_path(base_dir)) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e.into()),
    };

    let db: Value = serde_json::from_slice(&bytes).map_err(io::Error::from)?;
    let users = match db.get("users_by_mobile").and_then(Value::as_object) {
        Some(users) => users,
        None => return Ok(report),
    };

    for (raw_mobile, entry) in users {
        let (mobile, entry) = match (Mobile::parse(raw_mobile), entry.as_object()) {
            (Ok(m), Some(e)) => (m, e),
            _ => {
                report.invalid += 1;
                continue;
            }
        };

        let dest = users_root.join(mobile.as_str()).join(AUTH_FILE);
        if dest.exists() {
            report.skipped += 1;
            continue;
        }

        let text = |key: &str| {
            entry
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let stamp = |key: &str| entry.get(key).and_then(Value::as_i64).unwrap_or(now);

        let record = CredentialRecord {
            mobile: mobile.to_string(),
            pin_salt: text("pin_salt"),
            pin_hash: text("pin_hash"),
            created_at: stamp("created_at"),
            updated_at: stamp("updated_at"),
            ..Default::default()
        };

        write_json_atomic(&dest, &record)?;
        report.migrated += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::CredentialConfig;
    use crate::credentials::CredentialStore;
    use crate::crypto::PinKdf;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn write_legacy(base: &Path, doc: Value) -> PathBuf {
        let path = legacy_map_path(base);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_no_legacy_file() {
        let dir = tempdir().unwrap();
        let report = migrate_legacy(dir.path(), &dir.path().join("users"), 0).unwrap();
        assert_eq!(report, MigrationReport::default());
    }

    #[test]
    fn test_migrates_and_is_repeatable() {
        let dir = tempdir().unwrap();
        let users = dir.path().join("users");
        let legacy = write_legacy(
            dir.path(),
            json!({"users_by_mobile": {
                "98765-43210": {"pin_salt": "aa", "pin_hash": "bb", "created_at": 5, "updated_at": 6},
                "123": {"pin_salt": "aa", "pin_hash": "bb"},
                "1111111111": "broken"
            }}),
        );
        let before = fs::read(&legacy).unwrap();

        let report = migrate_legacy(dir.path(), &users, 99).unwrap();
        assert_eq!(report.migrated, 1);
        assert_eq!(report.invalid, 2);

        let record: CredentialRecord = serde_json::from_slice(
            &fs::read(users.join("9876543210").join(AUTH_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(record.mobile, "9876543210");
        assert_eq!(record.pin_salt, "aa");
        assert_eq!(record.created_at, 5);
        assert_eq!(record.updated_at, 6);

        let again = migrate_legacy(dir.path(), &users, 100).unwrap();
        assert_eq!(again.migrated, 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(fs::read(&legacy).unwrap(), before);
    }

    #[test]
    fn test_store_open_imports_legacy_accounts() {
        let dir = tempdir().unwrap();
        let kdf = PinKdf::new(1_000);
        let hash = kdf.hash_new("4321").unwrap();
        write_legacy(
            dir.path(),
            json!({"users_by_mobile": {"9876543210": {
                "pin_salt": hash.salt_hex, "pin_hash": hash.hash_hex
            }}}),
        );

        let config = CredentialConfig {
            pbkdf2_iterations: 1_000,
            ..CredentialConfig::with_base_dir(dir.path())
        };
        let store = CredentialStore::open_with(config, Arc::new(ManualClock::new(7))).unwrap();
        assert_eq!(store.list_users().len(), 1);
        assert!(store.login("9876543210", "4321").is_ok());

        // A later PIN change survives re-opening.
        store.change_pin("9876543210", "4321", "8765").unwrap();
        let config = CredentialConfig {
            pbkdf2_iterations: 1_000,
            ..CredentialConfig::with_base_dir(dir.path())
        };
        let store = CredentialStore::open_with(config, Arc::new(ManualClock::new(8))).unwrap();
        assert!(store.verify_pin("9876543210", "8765"));
    }

    #[test]
    fn test_unreadable_legacy_is_an_error_not_a_panic() {
        let dir = tempdir().unwrap();
        let path = legacy_map_path(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{{{").unwrap();

        assert!(migrate_legacy(dir.path(), &dir.path().join("users"), 0).is_err());

        // Opening the store still succeeds.
        let config = CredentialConfig::with_base_dir(dir.path());
        assert!(CredentialStore::open_with(config, Arc::new(ManualClock::new(0))).is_ok());
    }
}
