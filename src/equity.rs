use crate::card::{card_label, Card};
use crate::error::FeatureError;
use crate::eval;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::RwLock;
use tracing::info;

/// Assumed number of random opponents for rough-equity estimates
const SIM_OPPONENTS: usize = 2;

/// Memoized rough-equity estimator
///
/// Keys are the sorted hole labels followed by the sorted community
/// labels; values are deterministic given the same inputs up to the
/// simulator's precision target, so concurrent last-writer-wins
/// insertion is acceptable.
#[derive(Debug, Default)]
pub struct HandEquityCache {
    entries: RwLock<HashMap<String, f64>>,
}

impl HandEquityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a previously saved cache
    ///
    /// A missing file is not an error; it yields an empty cache
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FeatureError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("no equity cache at {:?}, starting empty", path);
            return Ok(Self::new());
        }
        let entries: HashMap<String, f64> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        info!("loaded {} equity cache entries from {:?}", entries.len(), path);
        Ok(HandEquityCache {
            entries: RwLock::new(entries),
        })
    }

    /// Saves the cache for the next process invocation
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), FeatureError> {
        let entries = self.entries.read().expect("equity cache lock poisoned");
        serde_json::to_writer(File::create(path.as_ref())?, &*entries)?;
        info!("saved {} equity cache entries to {:?}", entries.len(), path.as_ref());
        Ok(())
    }

    /// Rough win probability of `hole` on `community` against
    /// `SIM_OPPONENTS` random opponents, memoized
    pub fn estimate(&self, hole: &[Card], community: &[Card]) -> f64 {
        let key = Self::key(hole, community);
        if let Some(hit) = self.entries.read().expect("equity cache lock poisoned").get(&key) {
            return *hit;
        }
        let proba = eval::win_rate(hole, community, SIM_OPPONENTS);
        self.entries
            .write()
            .expect("equity cache lock poisoned")
            .insert(key, proba);
        proba
    }

    /// Number of memoized entries
    pub fn len(&self) -> usize {
        self.entries.read().expect("equity cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(hole: &[Card], community: &[Card]) -> String {
        let mut hole_labels: Vec<String> = hole.iter().map(|c| card_label(*c)).collect();
        let mut community_labels: Vec<String> = community.iter().map(|c| card_label(*c)).collect();
        hole_labels.sort();
        community_labels.sort();
        hole_labels.into_iter().chain(community_labels).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::cards_from_labels;

    fn cards(labels: &[&str]) -> Vec<Card> {
        cards_from_labels(&labels.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn test_key_is_order_insensitive() {
        let a = HandEquityCache::key(&cards(&["SA", "HK"]), &cards(&["C2", "D5", "H9"]));
        let b = HandEquityCache::key(&cards(&["HK", "SA"]), &cards(&["H9", "C2", "D5"]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_estimate_is_memoized() {
        let cache = HandEquityCache::new();
        let hole = cards(&["SA", "HA"]);
        let board = cards(&["C2", "D7", "HJ"]);
        let first = cache.estimate(&hole, &board);
        let second = cache.estimate(&hole, &board);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert!(first > 0.0 && first <= 1.0);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let cache = HandEquityCache::new();
        let hole = cards(&["SK", "SQ"]);
        let board = cards(&["S2", "S7", "HJ"]);
        let proba = cache.estimate(&hole, &board);

        let path = std::env::temp_dir().join("poker_features_equity_cache_test.json");
        cache.save(&path).unwrap();
        let reloaded = HandEquityCache::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.estimate(&hole, &board), proba);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let cache = HandEquityCache::load("/nonexistent/equity_cache.json").unwrap();
        assert!(cache.is_empty());
    }
}
