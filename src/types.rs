use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Raw observations
// ---------------------------------------------------------------------------

/// One price/volume sample for a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    /// Cumulative traded volume at `observed_at`.
    pub volume: f64,
    pub observed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Snapshot — scorer input
// ---------------------------------------------------------------------------

/// An instrument's reference and current observation for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub symbol: String,
    pub reference_price: f64,
    pub reference_volume: f64,
    pub current_price: f64,
    pub current_volume: f64,
    /// Time of the current sample.
    pub observed_at: DateTime<Utc>,
}

impl Snapshot {
    /// Pair a current quote with its reference observation.
    pub fn from_quotes(reference: &Quote, current: &Quote) -> Self {
        Self {
            symbol: current.symbol.clone(),
            reference_price: reference.price,
            reference_volume: reference.volume,
            current_price: current.price,
            current_volume: current.volume,
            observed_at: current.observed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// ScoredResult — scorer output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub symbol: String,
    pub reference_price: f64,
    pub current_price: f64,
    pub price_change_pct: f64,
    pub reference_volume: f64,
    pub current_volume: f64,
    /// 0 when the reference volume is 0.
    pub volume_change_pct: f64,
    /// price_change_pct × volume_change_pct
    pub momentum_score: f64,
    pub observed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Counters over the most recent run, served by /api/stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    pub total_stocks: usize,
    pub trending_stocks: usize,
    pub top_score: f64,
    pub last_update: DateTime<Utc>,
}
