use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::scorer;
use crate::types::{RunStats, ScoredResult, Snapshot};

#[derive(Debug, Default)]
struct RunState {
    snapshots: Vec<Snapshot>,
    results: Vec<ScoredResult>,
    provenance: Option<&'static str>,
    /// Bumped on every fetch.
    generation: u64,
    fetched_at: Option<DateTime<Utc>>,
    analyzed_at: Option<DateTime<Utc>>,
}

/// The most recent run: snapshots from the last fetch and results from the
/// last analysis over them.
///
/// A new fetch replaces the snapshots wholesale and discards the previous
/// results. Readers always receive owned copies.
pub struct RunStore {
    inner: RwLock<RunState>,
}

impl RunStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn read(&self) -> RwLockReadGuard<'_, RunState> {
        // A panic while holding the lock cannot leave RunState half-written:
        // every writer swaps whole fields.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RunState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn replace_snapshots(&self, provenance: &'static str, snapshots: Vec<Snapshot>) {
        let mut state = self.write();
        state.snapshots = snapshots;
        state.results.clear();
        state.provenance = Some(provenance);
        state.generation += 1;
        state.fetched_at = Some(Utc::now());
        state.analyzed_at = None;
    }

    /// Score the stored snapshots and keep the ranking. None when nothing
    /// has been fetched yet.
    ///
    /// Scoring runs outside the lock. If a fetch replaced the snapshots in
    /// the meantime, the ranking is returned but not stored.
    pub fn analyze(&self) -> Option<Vec<ScoredResult>> {
        let (snapshots, generation) = {
            let state = self.read();
            if state.snapshots.is_empty() {
                return None;
            }
            (state.snapshots.clone(), state.generation)
        };
        let results = scorer::score(&snapshots);

        let mut state = self.write();
        if state.generation == generation {
            state.results = results.clone();
            state.analyzed_at = Some(Utc::now());
        }
        Some(results)
    }

    pub fn results(&self) -> Vec<ScoredResult> {
        self.read().results.clone()
    }

    pub fn has_results(&self) -> bool {
        !self.read().results.is_empty()
    }

    /// The first `n` ranked results.
    pub fn top(&self, n: usize) -> Vec<ScoredResult> {
        self.read().results.iter().take(n).cloned().collect()
    }

    /// First result whose symbol matches exactly.
    pub fn find(&self, symbol: &str) -> Option<ScoredResult> {
        self.read().results.iter().find(|r| r.symbol == symbol).cloned()
    }

    pub fn provenance(&self) -> Option<&'static str> {
        self.read().provenance
    }

    pub fn stats(&self) -> RunStats {
        let state = self.read();
        let top_score = state
            .results
            .iter()
            .map(|r| r.momentum_score)
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))))
            .unwrap_or(0.0);
        RunStats {
            total_stocks: state.snapshots.len(),
            trending_stocks: state.results.len(),
            top_score,
            last_update: state.analyzed_at.or(state.fetched_at).unwrap_or_else(Utc::now),
        }
    }
}

impl Default for RunStore {
    fn default() -> Self {
        Self {
            inner: RwLock::new(RunState::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::snapshot;

    fn sample() -> Vec<Snapshot> {
        vec![
            snapshot("TCS", 100.0, 110.0, 1000.0, 1200.0),   // 200
            snapshot("INFY", 100.0, 95.0, 1000.0, 1200.0),   // excluded
            snapshot("SBIN", 100.0, 110.0, 1000.0, 1350.0),  // 350
            snapshot("ITC", 100.0, 110.0, 0.0, 500.0),       // 0
        ]
    }

    #[test]
    fn analyze_without_fetch_is_none() {
        let store = RunStore::new();
        assert!(store.analyze().is_none());
        assert!(!store.has_results());
    }

    #[test]
    fn analyze_ranks_stored_snapshots() {
        let store = RunStore::new();
        store.replace_snapshots("simulated", sample());
        let results = store.analyze().unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["SBIN", "TCS", "ITC"]);
        assert_eq!(store.results(), results);
        assert_eq!(store.provenance(), Some("simulated"));
    }

    #[test]
    fn new_fetch_discards_previous_results() {
        let store = RunStore::new();
        store.replace_snapshots("live", sample());
        store.analyze();
        assert!(store.has_results());

        store.replace_snapshots("simulated", vec![snapshot("LT", 10.0, 11.0, 1.0, 2.0)]);
        assert!(!store.has_results());
        assert_eq!(store.stats().total_stocks, 1);
        assert_eq!(store.stats().trending_stocks, 0);
    }

    #[test]
    fn top_slices_and_find_matches_exactly() {
        let store = RunStore::new();
        store.replace_snapshots("live", sample());
        store.analyze();

        assert_eq!(store.top(1).len(), 1);
        assert_eq!(store.top(1)[0].symbol, "SBIN");
        assert_eq!(store.top(100).len(), 3);
        assert!(store.top(0).is_empty());

        assert_eq!(store.find("TCS").unwrap().symbol, "TCS");
        assert!(store.find("tcs").is_none());
        assert!(store.find("INFY").is_none());
    }

    #[test]
    fn stats_report_counts_and_top_score() {
        let store = RunStore::new();
        let empty = store.stats();
        assert_eq!(empty.total_stocks, 0);
        assert_eq!(empty.top_score, 0.0);

        store.replace_snapshots("live", sample());
        store.analyze();
        let stats = store.stats();
        assert_eq!(stats.total_stocks, 4);
        assert_eq!(stats.trending_stocks, 3);
        assert!((stats.top_score - 350.0).abs() < 1e-9);
    }
}
