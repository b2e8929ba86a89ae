//! Shared types used across modules
//!
//! This module contains types that are used by both the core and the
//! front ends to avoid circular dependencies.

use serde::{Deserialize, Serialize};

/// How many entries a listing should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewLength {
    /// The most recent `n` entries
    Count(usize),
    /// Every stored entry
    All,
}

impl ViewLength {
    /// Resolve against the number of stored entries
    pub fn resolve(self, total: usize) -> usize {
        match self {
            ViewLength::Count(n) => n.min(total),
            ViewLength::All => total,
        }
    }
}

impl Default for ViewLength {
    fn default() -> Self {
        ViewLength::Count(7)
    }
}

impl std::str::FromStr for ViewLength {
    type Err = String;

    /// Parse `all`, `-1` (also meaning all) or a positive count
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") || s == "-1" {
            return Ok(ViewLength::All);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("Length must be at least 1".to_string()),
            Ok(n) => Ok(ViewLength::Count(n)),
            Err(_) => Err(format!("Invalid length '{}': use a number, -1 or `all`", s)),
        }
    }
}

impl std::fmt::Display for ViewLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewLength::Count(n) => write!(f, "{}", n),
            ViewLength::All => write!(f, "all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("all".parse::<ViewLength>(), Ok(ViewLength::All));
        assert_eq!("ALL".parse::<ViewLength>(), Ok(ViewLength::All));
        assert_eq!("-1".parse::<ViewLength>(), Ok(ViewLength::All));
        assert_eq!(" 3 ".parse::<ViewLength>(), Ok(ViewLength::Count(3)));
        assert!("0".parse::<ViewLength>().is_err());
        assert!("-2".parse::<ViewLength>().is_err());
        assert!("many".parse::<ViewLength>().is_err());
    }

    #[test]
    fn test_resolve() {
        assert_eq!(ViewLength::Count(3).resolve(10), 3);
        assert_eq!(ViewLength::Count(30).resolve(10), 10);
        assert_eq!(ViewLength::All.resolve(10), 10);
    }

    #[test]
    fn test_display() {
        assert_eq!(ViewLength::Count(7).to_string(), "7");
        assert_eq!(ViewLength::All.to_string(), "all");
    }
}
