use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use crate::config::{synthetic_baseline, Config};
use crate::error::Result;
use crate::export::read_json_records;
use crate::types::{Quote, Snapshot};

/// Where the reference half of each snapshot comes from.
#[derive(Debug, Clone)]
pub enum Baseline {
    /// Reference = current sample scaled by fixed ratios.
    Synthetic { price_ratio: f64, volume_ratio: f64 },
    /// Reference = quote recorded earlier in the session, keyed by symbol.
    Recorded(HashMap<String, Quote>),
}

impl Baseline {
    pub fn synthetic() -> Self {
        Baseline::Synthetic {
            price_ratio: synthetic_baseline::PRICE_RATIO,
            volume_ratio: synthetic_baseline::VOLUME_RATIO,
        }
    }

    /// The first quote per symbol wins.
    pub fn recorded(quotes: Vec<Quote>) -> Self {
        let mut by_symbol = HashMap::with_capacity(quotes.len());
        for q in quotes {
            by_symbol.entry(q.symbol.clone()).or_insert(q);
        }
        Baseline::Recorded(by_symbol)
    }

    /// Load quotes written by the `baseline` command.
    pub fn load(path: &Path) -> Result<Self> {
        let quotes: Vec<Quote> = read_json_records(path)?;
        info!("Loaded {} reference quotes from {}", quotes.len(), path.display());
        Ok(Self::recorded(quotes))
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        match &cfg.baseline_path {
            Some(path) => Self::load(path),
            None => Ok(Self::synthetic()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Baseline::Synthetic { .. } => "synthetic",
            Baseline::Recorded(_) => "recorded",
        }
    }

    pub fn reference_for(&self, current: &Quote) -> Option<Quote> {
        match self {
            Baseline::Synthetic { price_ratio, volume_ratio } => Some(Quote {
                symbol: current.symbol.clone(),
                price: current.price * price_ratio,
                volume: current.volume * volume_ratio,
                observed_at: current.observed_at,
            }),
            Baseline::Recorded(by_symbol) => by_symbol.get(&current.symbol).cloned(),
        }
    }

    /// Build snapshots for every quote that has a reference observation.
    pub fn pair(&self, quotes: &[Quote]) -> Vec<Snapshot> {
        quotes
            .iter()
            .filter_map(|q| match self.reference_for(q) {
                Some(reference) => Some(Snapshot::from_quotes(&reference, q)),
                None => {
                    warn!(symbol = %q.symbol, "no recorded reference quote, dropping");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn quote(symbol: &str, price: f64, volume: f64, hour: u32) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price,
            volume,
            observed_at: Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn synthetic_scales_current_quote() {
        let snaps = Baseline::synthetic().pair(&[quote("TCS", 1000.0, 2_000_000.0, 11)]);
        assert_eq!(snaps.len(), 1);
        let s = &snaps[0];
        assert!((s.reference_price - 990.0).abs() < 1e-9);
        assert!((s.reference_volume - 600_000.0).abs() < 1e-6);
        assert_eq!(s.current_price, 1000.0);
        assert_eq!(s.current_volume, 2_000_000.0);
        assert_eq!(s.observed_at, Utc.with_ymd_and_hms(2024, 3, 4, 11, 0, 0).unwrap());
    }

    #[test]
    fn recorded_pairs_by_symbol_and_drops_unmatched() {
        let baseline = Baseline::recorded(vec![
            quote("TCS", 950.0, 100_000.0, 4),
            quote("TCS", 1.0, 1.0, 5),
            quote("INFY", 1500.0, 50_000.0, 4),
        ]);
        let snaps = baseline.pair(&[
            quote("TCS", 1000.0, 400_000.0, 10),
            quote("WIPRO", 470.0, 10_000.0, 10),
        ]);
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].symbol, "TCS");
        assert_eq!(snaps[0].reference_price, 950.0);
        assert_eq!(snaps[0].reference_volume, 100_000.0);
        assert_eq!(snaps[0].current_volume, 400_000.0);
    }

    #[test]
    fn load_reads_quote_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline_quotes.json");
        let quotes = vec![quote("SBIN", 760.0, 120_000.0, 4)];
        std::fs::write(&path, serde_json::to_string(&quotes).unwrap()).unwrap();

        let baseline = Baseline::load(&path).unwrap();
        assert_eq!(baseline.label(), "recorded");
        let reference = baseline.reference_for(&quote("SBIN", 770.0, 300_000.0, 10)).unwrap();
        assert_eq!(reference.price, 760.0);
    }

    #[test]
    fn load_skips_malformed_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline_quotes.json");
        let good = serde_json::to_value(quote("SBIN", 760.0, 120_000.0, 4)).unwrap();
        let mut bad = serde_json::to_value(quote("TCS", 3800.0, 80_000.0, 4)).unwrap();
        bad["price"] = serde_json::Value::Null;
        std::fs::write(&path, serde_json::to_string(&vec![bad, good]).unwrap()).unwrap();

        let baseline = Baseline::load(&path).unwrap();
        assert!(baseline.reference_for(&quote("SBIN", 770.0, 1.0, 10)).is_some());
        assert!(baseline.reference_for(&quote("TCS", 3900.0, 1.0, 10)).is_none());
    }

    #[test]
    fn missing_baseline_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Baseline::load(&dir.path().join("absent.json")).is_err());
    }
}
