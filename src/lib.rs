//! Cadence - Personal Date Tracker Library
//!
//! Records dates of recurring events per user, keeps the interval between
//! consecutive dates and a rolling two-term average, and predicts the next
//! expected date. Front ends:
//! - Interactive shell (`cadence shell`)
//! - Telegram chat bot (`cadence bot`)
//!
//! # Example
//!
//! ```no_run
//! use cadence::Tracker;
//!
//! fn main() -> cadence::tracker::Result<()> {
//!     let tracker = Tracker::open("./data")?;
//!     tracker.register_user("alice")?;
//!
//!     let mut data = tracker.open_user("alice")?;
//!     data.add("1/1/2024");
//!     data.add("29/1/2024");
//!     println!("{:?}", data.predict()); // Some("2024-02-26")
//!     data.save()
//! }
//! ```

// Core modules
pub mod types;
pub mod tracker;
pub mod config;

// Front ends
pub mod shell;
pub mod bot;
pub mod cli;

// Re-export commonly used types for convenience
pub use tracker::{
    Tracker,
    TrackerError,
    UserData,
    UserRecord,
};

pub use types::ViewLength;

pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Personal Date Tracker", NAME, VERSION)
}
