//! Tracker core - date validation, user registry, record storage and the
//! per-user engine
//!
//! Data directory layout:
//!
//! ```text
//! <data_dir>/users              one user identifier per line
//! <data_dir>/records/<id>.json  dates, intervals and averages for one user
//! ```

pub mod date;
pub mod engine;
pub mod error;
pub mod registry;
pub mod store;

pub use engine::{UserData, TRIM_KEEP_DATES};
pub use error::{Result, TrackerError};
pub use registry::UserRegistry;
pub use store::{RecordStore, UserRecord};

use std::path::{Path, PathBuf};
use tracing::debug;

/// Registry file name inside the data directory
const REGISTRY_FILE: &str = "users";

/// Record directory name inside the data directory
const RECORDS_DIR: &str = "records";

/// Entry point for front ends: registration, lookup and engine construction
#[derive(Debug, Clone)]
pub struct Tracker {
    data_dir: PathBuf,
    registry: UserRegistry,
    store: RecordStore,
}

impl Tracker {
    /// Open (and if necessary set up) the data directory
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let registry = UserRegistry::open(data_dir.join(REGISTRY_FILE))?;
        let store = RecordStore::with_dir(data_dir.join(RECORDS_DIR))?;

        debug!("Opened tracker data at {}", data_dir.display());
        Ok(Self { data_dir, registry, store })
    }

    /// Register a user; `true` if newly created, `false` if already present
    pub fn register_user(&self, user: &str) -> Result<bool> {
        self.registry.register(user, &self.store)
    }

    /// Whether the user has been registered
    pub fn user_exists(&self, user: &str) -> Result<bool> {
        self.registry.has_user(user)
    }

    /// Registered users in registration order
    pub fn list_users(&self) -> Result<Vec<String>> {
        self.registry.list_users()
    }

    /// Load the engine for a registered user
    pub fn open_user(&self, user: &str) -> Result<UserData> {
        UserData::open(user, &self.registry, &self.store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
