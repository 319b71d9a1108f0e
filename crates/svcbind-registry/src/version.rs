//! Provider versions and version ranges.
//!
//! Versions are `major[.minor[.micro[.qualifier]]]`; missing numeric parts
//! are zero and qualifiers compare lexically. Ranges are either an interval
//! such as `[1.0.0,2.0.0)` or a bare version meaning "at least".

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors parsing versions and ranges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    #[error("Empty version")]
    Empty,

    #[error("Invalid version component '{component}' in '{input}'")]
    InvalidComponent { input: String, component: String },

    #[error("Invalid version range '{0}'")]
    InvalidRange(String),
}

/// A provider version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub qualifier: String,
}

impl Version {
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.micro, &self.qualifier).cmp(&(
            other.major,
            other.minor,
            other.micro,
            &other.qualifier,
        ))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let mut parts = input.splitn(4, '.');
        let mut numeric = [0_u32; 3];
        for slot in &mut numeric {
            let Some(part) = parts.next() else { break };
            *slot = part
                .parse()
                .map_err(|_| VersionParseError::InvalidComponent {
                    input: input.to_string(),
                    component: part.to_string(),
                })?;
        }
        let qualifier = parts.next().unwrap_or_default().to_string();

        Ok(Self {
            major: numeric[0],
            minor: numeric[1],
            micro: numeric[2],
            qualifier,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

/// One end of an interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

/// An accepted span of versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub low: Bound,
    /// `None` is unbounded.
    pub high: Option<Bound>,
}

impl VersionRange {
    /// Everything at or above `version`.
    pub const fn at_least(version: Version) -> Self {
        Self {
            low: Bound {
                version,
                inclusive: true,
            },
            high: None,
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        let above = match version.cmp(&self.low.version) {
            Ordering::Greater => true,
            Ordering::Equal => self.low.inclusive,
            Ordering::Less => false,
        };
        let below = self.high.as_ref().is_none_or(|high| match version.cmp(&high.version) {
            Ordering::Less => true,
            Ordering::Equal => high.inclusive,
            Ordering::Greater => false,
        });
        above && below
    }
}

impl FromStr for VersionRange {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let open = input.chars().next();
        if !matches!(open, Some('[' | '(')) {
            return input.parse().map(Self::at_least);
        }

        let invalid = || VersionParseError::InvalidRange(input.to_string());
        let close = input.chars().last().ok_or_else(invalid)?;
        if input.len() < 2 || !matches!(close, ']' | ')') {
            return Err(invalid());
        }
        let (low, high) = input[1..input.len() - 1]
            .split_once(',')
            .ok_or_else(invalid)?;

        let range = Self {
            low: Bound {
                version: low.parse()?,
                inclusive: open == Some('['),
            },
            high: Some(Bound {
                version: high.parse()?,
                inclusive: close == ']',
            }),
        };
        if range.high.as_ref().is_some_and(|high| high.version < range.low.version) {
            return Err(invalid());
        }
        Ok(range)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.high {
            None => write!(f, "{}", self.low.version),
            Some(high) => write!(
                f,
                "{}{},{}{}",
                if self.low.inclusive { '[' } else { '(' },
                self.low.version,
                high.version,
                if high.inclusive { ']' } else { ')' },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_version_parsing_pads_missing_parts() {
        assert_eq!(v("1"), Version::new(1, 0, 0));
        assert_eq!(v("1.2"), Version::new(1, 2, 0));
        assert_eq!(v(" 1.2.3 "), Version::new(1, 2, 3));
        assert_eq!(v("1.2.3.beta").qualifier, "beta");
        assert_eq!(v("1.2.3.beta.2").qualifier, "beta.2");
    }

    #[test]
    fn test_version_parse_errors() {
        assert_eq!("".parse::<Version>(), Err(VersionParseError::Empty));
        assert!(matches!(
            "1.x".parse::<Version>(),
            Err(VersionParseError::InvalidComponent { component, .. }) if component == "x"
        ));
    }

    #[test]
    fn test_version_ordering() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("2") > v("1.99.99"));
        assert!(v("1.0.0.b") > v("1.0.0.a"));
        assert!(v("1.0.0.a") > v("1.0.0"));
    }

    #[test]
    fn test_half_open_range() {
        let range: VersionRange = "[1.0.0,2.0.0)".parse().unwrap();
        assert!(range.contains(&v("1.0.0")));
        assert!(range.contains(&v("1.9.9")));
        assert!(!range.contains(&v("2.0.0")));
        assert!(!range.contains(&v("0.9")));
    }

    #[test]
    fn test_left_open_range() {
        let range: VersionRange = "(1.0,2.0]".parse().unwrap();
        assert!(!range.contains(&v("1.0")));
        assert!(range.contains(&v("1.0.1")));
        assert!(range.contains(&v("2.0")));
    }

    #[test]
    fn test_bare_version_is_at_least() {
        let range: VersionRange = "1.5".parse().unwrap();
        assert!(range.contains(&v("1.5")));
        assert!(range.contains(&v("42")));
        assert!(!range.contains(&v("1.4.9")));
        assert_eq!(range.to_string(), "1.5.0");
    }

    #[test]
    fn test_invalid_ranges() {
        for input in ["[1.0", "[1.0;2.0)", "[2.0,1.0)", "[a,2)", "["] {
            assert!(input.parse::<VersionRange>().is_err(), "{input}");
        }
    }

    #[test]
    fn test_range_display() {
        let range: VersionRange = "( 1.0 , 2.0 ]".parse().unwrap();
        assert_eq!(range.to_string(), "(1.0.0,2.0.0]");
    }
}
