//! Rebinding strategies.
//!
//! A strategy decides how the owning component is protected while the bound
//! provider of one dependency changes:
//! - **Suspend**: the component is taken out of its active state for the
//!   duration of the swap and the callbacks that report it
//! - **Locking**: the swap and its callbacks run inside a critical section
//!   scoped to the dependency; the component keeps running

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy applied when the bound provider of a dependency changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebindStrategy {
    /// Suspend the owning component around each swap.
    #[default]
    Suspend,
    /// Serialize swaps and dispatch on a dependency-scoped lock.
    Locking,
}

impl RebindStrategy {
    /// Stable lowercase name, as used in settings files and on the CLI.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Suspend => "suspend",
            Self::Locking => "locking",
        }
    }
}

impl fmt::Display for RebindStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RebindStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suspend" => Ok(Self::Suspend),
            "locking" => Ok(Self::Locking),
            other => Err(format!("unknown rebind strategy '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_suspend() {
        assert_eq!(RebindStrategy::default(), RebindStrategy::Suspend);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Locking".parse(), Ok(RebindStrategy::Locking));
        assert_eq!(" suspend ".parse(), Ok(RebindStrategy::Suspend));
        assert!("eager".parse::<RebindStrategy>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&RebindStrategy::Locking).unwrap();
        assert_eq!(json, "\"locking\"");
        let back: RebindStrategy = serde_json::from_str("\"suspend\"").unwrap();
        assert_eq!(back, RebindStrategy::Suspend);
    }
}
