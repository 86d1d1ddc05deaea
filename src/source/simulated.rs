use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::simulation::{PRICE_MAX, PRICE_MIN, VOLUME_MAX, VOLUME_MIN};
use crate::error::{AppError, Result};
use crate::source::baseline::Baseline;
use crate::source::{Batch, SnapshotSource};
use crate::types::Quote;

/// Generates plausible quotes for the whole universe, paired with the
/// synthetic baseline.
pub struct SimulatedSource {
    symbols: Vec<String>,
    rng: Mutex<StdRng>,
    baseline: Baseline,
}

impl SimulatedSource {
    pub fn new(symbols: Vec<String>) -> Self {
        Self::from_rng(symbols, StdRng::from_entropy())
    }

    /// Deterministic output for a given seed.
    pub fn with_seed(symbols: Vec<String>, seed: u64) -> Self {
        Self::from_rng(symbols, StdRng::seed_from_u64(seed))
    }

    fn from_rng(symbols: Vec<String>, rng: StdRng) -> Self {
        Self {
            symbols,
            rng: Mutex::new(rng),
            baseline: Baseline::synthetic(),
        }
    }

    pub fn quotes(&self) -> Result<Vec<Quote>> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| AppError::Acquisition("simulation rng poisoned".to_string()))?;
        let now = Utc::now();
        Ok(self
            .symbols
            .iter()
            .map(|symbol| {
                let price: f64 = rng.gen_range(PRICE_MIN..PRICE_MAX);
                Quote {
                    symbol: symbol.clone(),
                    price: (price * 100.0).round() / 100.0,
                    volume: rng.gen_range(VOLUME_MIN..=VOLUME_MAX) as f64,
                    observed_at: now,
                }
            })
            .collect())
    }
}

#[async_trait]
impl SnapshotSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn snapshots(&self) -> Result<Batch> {
        let quotes = self.quotes()?;
        Ok(Batch {
            provenance: self.name(),
            snapshots: self.baseline.pair(&quotes),
        })
    }
}
