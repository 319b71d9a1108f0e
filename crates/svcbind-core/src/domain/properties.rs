//! Provider properties and the snapshots handed to callbacks.
//!
//! The registry owns the live property table of every registration. Before a
//! callback sees any of it, the table is copied into a [`PropertySnapshot`]:
//! a detached, immutable map that stays valid however the registration is
//! changed or torn down afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Live, mutable property table of a registration.
pub type Properties = BTreeMap<String, String>;

/// Well-known property holding the registry-assigned service id.
pub const SERVICE_ID: &str = "service.id";

/// Well-known property holding the ranking used to pick the best provider.
pub const SERVICE_RANKING: &str = "service.ranking";

/// Well-known property holding the provided interface version.
pub const SERVICE_VERSION: &str = "service.version";

/// Well-known property holding the provider's language tag.
pub const SERVICE_LANGUAGE: &str = "LANG";

/// Immutable copy of a provider's properties at the time of one event.
///
/// Cloning is cheap; all clones share the same detached map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySnapshot {
    entries: Arc<BTreeMap<String, String>>,
}

impl PropertySnapshot {
    /// An empty snapshot, used when no registration can be resolved.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Copy (key, value) pairs into a fresh snapshot.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Look up one property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether the property is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned copy of the underlying map.
    pub fn to_properties(&self) -> Properties {
        (*self.entries).clone()
    }
}

impl From<&Properties> for PropertySnapshot {
    fn from(props: &Properties) -> Self {
        Self {
            entries: Arc::new(props.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_detached_from_source() {
        let mut live = Properties::new();
        live.insert("color".to_string(), "red".to_string());

        let snapshot = PropertySnapshot::from(&live);
        live.insert("color".to_string(), "blue".to_string());
        live.clear();

        assert_eq!(snapshot.get("color"), Some("red"));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_from_pairs_last_value_wins() {
        let snapshot = PropertySnapshot::from_pairs([("a", "1"), ("b", "2"), ("a", "3")]);
        assert_eq!(snapshot.get("a"), Some("3"));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_iteration_is_key_ordered() {
        let snapshot = PropertySnapshot::from_pairs([("z", "1"), ("a", "2"), ("m", "3")]);
        let keys: Vec<_> = snapshot.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = PropertySnapshot::empty();
        assert!(snapshot.is_empty());
        assert!(!snapshot.contains_key(SERVICE_ID));
    }
}
