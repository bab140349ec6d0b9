//! Active session pointer
//!
//! One session per device, persisted as `session.json` next to `users/`.
//! Its absence means nobody is signed in.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::atomic::{remove_best_effort, write_json_atomic};
use crate::input::Mobile;

/// File name of the session pointer
pub const SESSION_FILE: &str = "session.json";

/// Persisted session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub mobile: String,
    pub login_at: i64,
}

/// Handle on the session pointer file
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            path: base_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace any previous session
    pub fn begin(&self, mobile: &Mobile, login_at: i64) -> io::Result<()> {
        let record = SessionRecord {
            mobile: mobile.to_string(),
            login_at,
        };
        write_json_atomic(&self.path, &record)
    }

    /// Raw record, `None` if missing or unreadable
    pub fn read(&self) -> Option<SessionRecord> {
        let bytes = fs::read(&self.path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Signed-in mobile, `None` if missing, unreadable or not a valid number
    pub fn current(&self) -> Option<Mobile> {
        let record = self.read()?;
        Mobile::parse(&record.mobile).ok()
    }

    /// Delete the pointer. A missing file is not an error.
    pub fn end(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Delete the pointer if it names `mobile`; failures are logged only
    pub fn end_if_owned_by(&self, mobile: &Mobile) {
        if self.current().as_ref() == Some(mobile) {
            remove_best_effort(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_begin_and_end() {
        let dir = tempdir().unwrap();
        let session = SessionFile::new(dir.path());
        let m = Mobile::parse("9876543210").unwrap();

        assert!(session.current().is_none());
        session.begin(&m, 42).unwrap();
        assert_eq!(session.current(), Some(m.clone()));
        assert_eq!(session.read().unwrap().login_at, 42);

        session.end().unwrap();
        assert!(session.current().is_none());
        // second logout is a no-op
        session.end().unwrap();
    }

    #[test]
    fn test_begin_overwrites() {
        let dir = tempdir().unwrap();
        let session = SessionFile::new(dir.path());
        let a = Mobile::parse("1111111111").unwrap();
        let b = Mobile::parse("2222222222").unwrap();

        session.begin(&a, 1).unwrap();
        session.begin(&b, 2).unwrap();
        assert_eq!(session.current(), Some(b));
    }

    #[test]
    fn test_garbage_session_reads_as_logged_out() {
        let dir = tempdir().unwrap();
        let session = SessionFile::new(dir.path());

        fs::write(session.path(), b"{not json").unwrap();
        assert!(session.current().is_none());

        fs::write(session.path(), br#"{"mobile": "123", "login_at": 1}"#).unwrap();
        assert!(session.current().is_none());
    }

    #[test]
    fn test_end_if_owned_by() {
        let dir = tempdir().unwrap();
        let session = SessionFile::new(dir.path());
        let a = Mobile::parse("1111111111").unwrap();
        let b = Mobile::parse("2222222222").unwrap();

        session.begin(&a, 1).unwrap();
        session.end_if_owned_by(&b);
        assert_eq!(session.current(), Some(a.clone()));
        session.end_if_owned_by(&a);
        assert!(session.current().is_none());
    }
}
