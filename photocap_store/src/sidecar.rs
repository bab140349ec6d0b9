//! Upload sidecars: `<upload file>.json` next to each media file
//!
//! The capture UI keeps a caption and a few facts about each upload here.
//! Sidecars are never listed as uploads and no store operation deletes them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use photocap_auth::{write_json_atomic, Mobile};

use crate::error::StoreResult;
use crate::media::MediaType;
use crate::uploads::UploadRecord;

/// Sidecar suffix appended to the full upload file name
pub const SIDECAR_SUFFIX: &str = ".json";

/// Sidecar contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSidecar {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub description: String,
    /// Seconds since the epoch (fractional seconds allowed)
    #[serde(default)]
    pub created_at: f64,
    #[serde(default)]
    pub mobile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `photo.jpg` → `photo.jpg.json`
pub fn sidecar_path(upload_path: &Path) -> PathBuf {
    let mut name = upload_path.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

pub fn is_sidecar_name(name: &str) -> bool {
    name.ends_with(SIDECAR_SUFFIX)
}

/// Write the sidecar for a freshly added upload
pub fn write_sidecar(
    record: &UploadRecord,
    owner: &Mobile,
    description: &str,
    created_at: f64,
) -> StoreResult<UploadSidecar> {
    let sidecar = UploadSidecar {
        filename: record.filename.clone(),
        description: description.trim().to_string(),
        created_at,
        mobile: owner.to_string(),
        media_type: Some(record.media_type),
        extra: Map::new(),
    };
    write_json_atomic(&sidecar_path(&record.path), &sidecar)?;
    Ok(sidecar)
}

/// Read a sidecar; missing or unreadable reads as `None`
pub fn read_sidecar(upload_path: &Path) -> Option<UploadSidecar> {
    let bytes = fs::read(sidecar_path(upload_path)).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(sidecar) => Some(sidecar),
        Err(e) => {
            log::debug!("Ignoring unreadable sidecar for {}: {}", upload_path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/u/9876543210_20240101_1.jpg")),
            PathBuf::from("/u/9876543210_20240101_1.jpg.json")
        );
        assert!(is_sidecar_name("9876543210_20240101_1.jpg.json"));
        assert!(!is_sidecar_name("9876543210_20240101_1.jpg"));
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("9876543210_20240101_1.mp4");
        fs::write(&path, b"video").unwrap();
        let record = UploadRecord {
            path: path.clone(),
            filename: "9876543210_20240101_1.mp4".into(),
            media_type: MediaType::Video,
            created_at: Utc::now(),
        };
        let owner = Mobile::parse("9876543210").unwrap();

        write_sidecar(&record, &owner, "  site visit ", 1.5).unwrap();
        let back = read_sidecar(&path).unwrap();
        assert_eq!(back.description, "site visit");
        assert_eq!(back.media_type, Some(MediaType::Video));
        assert_eq!(back.mobile, "9876543210");
        assert_eq!(back.created_at, 1.5);
    }

    #[test]
    fn test_read_tolerates_foreign_sidecars() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");

        assert!(read_sidecar(&path).is_none());

        fs::write(sidecar_path(&path), br#"{"description": "x", "created_at": 17, "rating": 5}"#)
            .unwrap();
        let back = read_sidecar(&path).unwrap();
        assert_eq!(back.description, "x");
        assert_eq!(back.created_at, 17.0);
        assert_eq!(back.extra.get("rating"), Some(&Value::from(5)));

        fs::write(sidecar_path(&path), b"garbage").unwrap();
        assert!(read_sidecar(&path).is_none());
    }
}
