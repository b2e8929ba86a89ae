//! Record Store - one JSON file per user under `<data_dir>/records/`
//!
//! Records are replaced whole: the new contents go to a `.tmp` sibling which is
//! then renamed over the old file, so readers never see a partial record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use super::error::{Result, TrackerError};

/// Current on-disk schema version
pub const RECORD_VERSION: u32 = 1;

/// One user's event history as persisted
///
/// `intervals[i]` is the day count from `dates[i]` to `dates[i + 1]`;
/// `averages[i]` is the rolling two-term mean at the time `intervals[i]` was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
    #[serde(default)]
    pub intervals: Vec<i64>,
    #[serde(default)]
    pub averages: Vec<f64>,
}

fn default_version() -> u32 {
    RECORD_VERSION
}

impl Default for UserRecord {
    fn default() -> Self {
        Self {
            version: RECORD_VERSION,
            dates: Vec::new(),
            intervals: Vec::new(),
            averages: Vec::new(),
        }
    }
}

/// Reads and writes user records keyed by user identifier
#[derive(Debug, Clone)]
pub struct RecordStore {
    base_dir: PathBuf,
}

impl RecordStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed
    pub fn with_dir(base_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Load the record for `user`
    pub fn load(&self, user: &str) -> Result<UserRecord> {
        let path = self.record_path(user)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TrackerError::RecordNotFound { user: user.to_string() });
            }
            Err(e) => return Err(e.into()),
        };

        let record: UserRecord = serde_json::from_str(&contents).map_err(|e| {
            TrackerError::CorruptRecord {
                user: user.to_string(),
                reason: e.to_string(),
            }
        })?;

        if record.version > RECORD_VERSION {
            return Err(TrackerError::CorruptRecord {
                user: user.to_string(),
                reason: format!("unsupported record version {}", record.version),
            });
        }

        debug!("Loaded record for {} ({} dates)", user, record.dates.len());
        Ok(record)
    }

    /// Replace the record for `user`
    pub fn store(&self, record: &UserRecord, user: &str) -> Result<()> {
        let path = self.record_path(user)?;
        let json = serde_json::to_string_pretty(record).map_err(|e| {
            TrackerError::CorruptRecord {
                user: user.to_string(),
                reason: format!("serialization failed: {}", e),
            }
        })?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &path)?;

        debug!("Stored record for {} at {}", user, path.display());
        Ok(())
    }

    /// Whether a record file exists for `user`
    pub fn exists(&self, user: &str) -> bool {
        self.record_path(user).map(|p| p.exists()).unwrap_or(false)
    }

    /// Last modification time of the record file, if it exists
    pub fn modified(&self, user: &str) -> Option<SystemTime> {
        let path = self.record_path(user).ok()?;
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, user: &str) -> Result<PathBuf> {
        check_user_id(user)?;
        Ok(self.base_dir.join(format!("{}.json", user)))
    }
}

/// Reject identifiers that cannot safely name a file or a registry line
pub fn check_user_id(user: &str) -> Result<()> {
    let bad = user.is_empty()
        || user == "."
        || user == ".."
        || user
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control());

    if bad {
        Err(TrackerError::InvalidUserId { user: user.to_string() })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> UserRecord {
        UserRecord {
            dates: vec![day(2024, 1, 1), day(2024, 1, 8), day(2024, 1, 16)],
            intervals: vec![7, 8],
            averages: vec![7.0, 7.5],
            ..UserRecord::default()
        }
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::with_dir(dir.path().join("records")).unwrap();

        store.store(&sample(), "123").unwrap();
        assert!(store.exists("123"));
        assert_eq!(store.load("123").unwrap(), sample());
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::with_dir(dir.path().to_path_buf()).unwrap();

        let err = store.load("nobody").unwrap_err();
        assert!(matches!(err, TrackerError::RecordNotFound { .. }));
        assert!(!store.exists("nobody"));
        assert!(store.modified("nobody").is_none());
    }

    #[test]
    fn test_store_overwrites_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::with_dir(dir.path().to_path_buf()).unwrap();

        store.store(&sample(), "u1").unwrap();
        store.store(&UserRecord::default(), "u1").unwrap();

        assert_eq!(store.load("u1").unwrap(), UserRecord::default());
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["u1.json".to_string()]);
    }

    #[test]
    fn test_on_disk_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::with_dir(dir.path().to_path_buf()).unwrap();
        store.store(&sample(), "u1").unwrap();

        let raw = std::fs::read_to_string(dir.path().join("u1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["dates"][0], "2024-01-01");
        assert_eq!(value["intervals"][1], 8);
        assert_eq!(value["averages"][1], 7.5);
    }

    #[test]
    fn test_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::with_dir(dir.path().to_path_buf()).unwrap();
        std::fs::write(dir.path().join("u1.json"), "not json").unwrap();

        let err = store.load("u1").unwrap_err();
        assert!(matches!(err, TrackerError::CorruptRecord { .. }));
    }

    #[test]
    fn test_future_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::with_dir(dir.path().to_path_buf()).unwrap();
        std::fs::write(
            dir.path().join("u1.json"),
            r#"{"version":99,"dates":[],"intervals":[],"averages":[]}"#,
        )
        .unwrap();

        assert!(matches!(store.load("u1"), Err(TrackerError::CorruptRecord { .. })));
    }

    #[test]
    fn test_invalid_user_ids() {
        for bad in ["", ".", "..", "a/b", "a\\b", "a b", "a\nb"] {
            assert!(
                matches!(check_user_id(bad), Err(TrackerError::InvalidUserId { .. })),
                "accepted {:?}",
                bad
            );
        }
        assert!(check_user_id("123456789").is_ok());
        assert!(check_user_id("alice.smith").is_ok());
    }
}
