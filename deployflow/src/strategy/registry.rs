//! String-to-strategy resolution.

use super::Strategy;
use tracing::debug;

/// Known strategy keys. Read-only and built at compile time, so resolution
/// needs no locking.
const STRATEGY_TABLE: &[(&str, Strategy)] = &[
    ("redblack", Strategy::RedBlack),
    ("highlander", Strategy::Highlander),
    ("none", Strategy::None),
];

/// Resolves strategy keys to strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyRegistry;

impl StrategyRegistry {
    /// Resolves a strategy key, falling back to [`Strategy::None`].
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace. An
    /// absent, empty or unrecognised key resolves to `None`; this never fails.
    #[must_use]
    pub fn resolve(key: Option<&str>) -> Strategy {
        let Some(raw) = key else {
            return Strategy::None;
        };

        Self::lookup(raw).unwrap_or_else(|| {
            if !raw.trim().is_empty() {
                debug!(strategy_key = raw, "Unknown strategy key, falling back to none");
            }
            Strategy::None
        })
    }

    /// Looks up a strategy key without the fallback.
    #[must_use]
    pub fn lookup(key: &str) -> Option<Strategy> {
        let key = key.trim();
        STRATEGY_TABLE
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(key))
            .map(|(_, strategy)| *strategy)
    }

    /// Returns every known key.
    pub fn keys() -> impl Iterator<Item = &'static str> {
        STRATEGY_TABLE.iter().map(|(key, _)| *key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_keys() {
        assert_eq!(StrategyRegistry::resolve(Some("redblack")), Strategy::RedBlack);
        assert_eq!(StrategyRegistry::resolve(Some("highlander")), Strategy::Highlander);
        assert_eq!(StrategyRegistry::resolve(Some("none")), Strategy::None);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(StrategyRegistry::resolve(Some("RedBlack")), Strategy::RedBlack);
        assert_eq!(StrategyRegistry::resolve(Some("HIGHLANDER")), Strategy::Highlander);
        assert_eq!(StrategyRegistry::resolve(Some("  redblack ")), Strategy::RedBlack);
    }

    #[test]
    fn test_resolve_unknown_or_absent_falls_back_to_none() {
        for key in [None, Some(""), Some("   "), Some("canary"), Some("red-black"), Some("rolling")] {
            assert_eq!(StrategyRegistry::resolve(key), Strategy::None, "key {key:?}");
        }
    }

    #[test]
    fn test_lookup_has_no_fallback() {
        assert_eq!(StrategyRegistry::lookup("canary"), None);
        assert_eq!(StrategyRegistry::lookup("none"), Some(Strategy::None));
    }

    #[test]
    fn test_every_strategy_key_is_registered() {
        let keys: Vec<&str> = StrategyRegistry::keys().collect();
        for strategy in Strategy::all() {
            assert!(keys.contains(&strategy.key()));
            assert_eq!(StrategyRegistry::lookup(strategy.key()), Some(strategy));
        }
    }
}
