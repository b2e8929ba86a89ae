//! User Registry - line-delimited list of initialized user identifiers
//!
//! Registration writes the user's empty record before appending the registry
//! line, so a crash in between never leaves a registered user without a record.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::error::Result;
use super::store::{check_user_id, RecordStore, UserRecord};

/// Tracks which users have been initialized
#[derive(Debug, Clone)]
pub struct UserRegistry {
    path: PathBuf,
}

impl UserRegistry {
    /// Open the registry file at `path`, creating an empty one if missing
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self { path })
    }

    /// All registered identifiers in file order
    pub fn list_users(&self) -> Result<Vec<String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// Whether `user` has been registered
    pub fn has_user(&self, user: &str) -> Result<bool> {
        Ok(self.list_users()?.iter().any(|u| u == user))
    }

    /// Register `user`, creating an empty record in `store`
    ///
    /// Returns `false` without touching anything if the user already exists.
    pub fn register(&self, user: &str, store: &RecordStore) -> Result<bool> {
        check_user_id(user)?;
        if self.has_user(user)? {
            return Ok(false);
        }

        store.store(&UserRecord::default(), user)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", user)?;

        info!("Registered user {}", user);
        Ok(true)
    }

    /// Get the registry file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::TrackerError;
    use chrono::NaiveDate;

    fn setup() -> (tempfile::TempDir, UserRegistry, RecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let registry = UserRegistry::open(dir.path().join("users")).unwrap();
        let store = RecordStore::with_dir(dir.path().join("records")).unwrap();
        (dir, registry, store)
    }

    #[test]
    fn test_empty_registry() {
        let (_dir, registry, _store) = setup();
        assert!(registry.path().exists());
        assert!(registry.list_users().unwrap().is_empty());
        assert!(!registry.has_user("123").unwrap());
    }

    #[test]
    fn test_register_creates_record() {
        let (_dir, registry, store) = setup();

        assert!(registry.register("123", &store).unwrap());
        assert!(registry.has_user("123").unwrap());
        assert_eq!(store.load("123").unwrap(), UserRecord::default());
    }

    #[test]
    fn test_register_twice_keeps_record() {
        let (_dir, registry, store) = setup();
        assert!(registry.register("123", &store).unwrap());

        let record = UserRecord {
            dates: vec![NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()],
            ..UserRecord::default()
        };
        store.store(&record, "123").unwrap();

        assert!(!registry.register("123", &store).unwrap());
        assert_eq!(store.load("123").unwrap(), record);
        assert_eq!(registry.list_users().unwrap(), vec!["123".to_string()]);
    }

    #[test]
    fn test_list_preserves_file_order() {
        let (_dir, registry, store) = setup();
        for user in ["123111", "234555", "121110"] {
            registry.register(user, &store).unwrap();
        }
        assert_eq!(
            registry.list_users().unwrap(),
            vec!["123111", "234555", "121110"]
        );
    }

    #[test]
    fn test_tolerates_blank_and_padded_lines() {
        let (dir, registry, _store) = setup();
        std::fs::write(dir.path().join("users"), "alice\n\n  bob  \r\n").unwrap();
        assert_eq!(registry.list_users().unwrap(), vec!["alice", "bob"]);
        assert!(registry.has_user("bob").unwrap());
    }

    #[test]
    fn test_register_rejects_invalid_id() {
        let (_dir, registry, store) = setup();
        let err = registry.register("../etc", &store).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidUserId { .. }));
        assert!(registry.list_users().unwrap().is_empty());
    }
}
