use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{ScoredResult, Snapshot};

/// Why a snapshot could not be scored. Only that snapshot is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    #[error("snapshot has an empty symbol")]
    EmptySymbol,

    #[error("{symbol}: reference price must be positive, got {price}")]
    InvalidReferencePrice { symbol: String, price: f64 },

    #[error("{symbol}: current price is not a finite number ({price})")]
    InvalidCurrentPrice { symbol: String, price: f64 },

    #[error("{symbol}: volumes must be non-negative (reference={reference}, current={current})")]
    InvalidVolume {
        symbol: String,
        reference: f64,
        current: f64,
    },
}

fn validate(s: &Snapshot) -> Result<(), SnapshotError> {
    if s.symbol.trim().is_empty() {
        return Err(SnapshotError::EmptySymbol);
    }
    if !s.reference_price.is_finite() || s.reference_price <= 0.0 {
        return Err(SnapshotError::InvalidReferencePrice {
            symbol: s.symbol.clone(),
            price: s.reference_price,
        });
    }
    if !s.current_price.is_finite() {
        return Err(SnapshotError::InvalidCurrentPrice {
            symbol: s.symbol.clone(),
            price: s.current_price,
        });
    }
    let volume_ok = |v: f64| v.is_finite() && v >= 0.0;
    if !volume_ok(s.reference_volume) || !volume_ok(s.current_volume) {
        return Err(SnapshotError::InvalidVolume {
            symbol: s.symbol.clone(),
            reference: s.reference_volume,
            current: s.current_volume,
        });
    }
    Ok(())
}

/// Score a single snapshot.
///
/// `Ok(None)` means the snapshot is valid but not trending: price and volume
/// must both have strictly increased since the reference observation.
pub fn evaluate(s: &Snapshot) -> Result<Option<ScoredResult>, SnapshotError> {
    validate(s)?;

    let price_change = s.current_price - s.reference_price;
    let price_change_pct = price_change / s.reference_price * 100.0;

    let volume_change = s.current_volume - s.reference_volume;
    let volume_change_pct = if s.reference_volume > 0.0 {
        volume_change / s.reference_volume * 100.0
    } else {
        0.0
    };

    if price_change <= 0.0 || volume_change <= 0.0 {
        return Ok(None);
    }

    Ok(Some(ScoredResult {
        symbol: s.symbol.clone(),
        reference_price: s.reference_price,
        current_price: s.current_price,
        price_change_pct,
        reference_volume: s.reference_volume,
        current_volume: s.current_volume,
        volume_change_pct,
        momentum_score: price_change_pct * volume_change_pct,
        observed_at: s.observed_at,
    }))
}

/// Score a batch and rank it by momentum score, highest first.
///
/// Invalid snapshots are logged and skipped. Equal scores keep their input
/// order.
pub fn score(snapshots: &[Snapshot]) -> Vec<ScoredResult> {
    let mut results = Vec::with_capacity(snapshots.len());
    let mut skipped = 0usize;

    for s in snapshots {
        match evaluate(s) {
            Ok(Some(r)) => results.push(r),
            Ok(None) => debug!(symbol = %s.symbol, "not trending"),
            Err(e) => {
                skipped += 1;
                warn!("Skipping snapshot: {e}");
            }
        }
    }

    // sort_by is stable
    results.sort_by(|a, b| b.momentum_score.total_cmp(&a.momentum_score));

    debug!(
        input = snapshots.len(),
        trending = results.len(),
        skipped,
        "scored batch"
    );
    results
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snap(symbol: &str, ref_price: f64, cur_price: f64, ref_vol: f64, cur_vol: f64) -> Snapshot {
        Snapshot {
            symbol: symbol.to_string(),
            reference_price: ref_price,
            reference_volume: ref_vol,
            current_price: cur_price,
            current_volume: cur_vol,
            observed_at: Utc.with_ymd_and_hms(2024, 3, 4, 10, 15, 0).unwrap(),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rising_price_and_volume_is_scored() {
        let out = score(&[snap("TCS", 100.0, 110.0, 1000.0, 1200.0)]);
        assert_eq!(out.len(), 1);
        let r = &out[0];
        assert!(approx(r.price_change_pct, 10.0), "price_change_pct={}", r.price_change_pct);
        assert!(approx(r.volume_change_pct, 20.0), "volume_change_pct={}", r.volume_change_pct);
        assert!(approx(r.momentum_score, 200.0), "momentum_score={}", r.momentum_score);
        assert_eq!(r.reference_price, 100.0);
        assert_eq!(r.current_price, 110.0);
    }

    #[test]
    fn price_decline_is_excluded() {
        let out = score(&[snap("INFY", 100.0, 95.0, 1000.0, 1200.0)]);
        assert!(out.is_empty());
    }

    #[test]
    fn flat_price_or_volume_is_excluded() {
        let out = score(&[
            snap("A", 100.0, 100.0, 1000.0, 1200.0),
            snap("B", 100.0, 110.0, 1000.0, 1000.0),
            snap("C", 100.0, 110.0, 1000.0, 900.0),
        ]);
        assert!(out.is_empty());
    }

    #[test]
    fn zero_reference_volume_passes_filter_with_zero_score() {
        let out = score(&[snap("ITC", 100.0, 110.0, 0.0, 500.0)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].volume_change_pct, 0.0);
        assert_eq!(out[0].momentum_score, 0.0);
        assert!(approx(out[0].price_change_pct, 10.0));
    }

    #[test]
    fn zero_reference_and_zero_current_volume_is_excluded() {
        assert!(score(&[snap("ITC", 100.0, 110.0, 0.0, 0.0)]).is_empty());
    }

    #[test]
    fn results_are_ranked_descending() {
        // 10% × 20% = 200, 10% × 35% = 350
        let out = score(&[
            snap("LOW", 100.0, 110.0, 1000.0, 1200.0),
            snap("HIGH", 100.0, 110.0, 1000.0, 1350.0),
        ]);
        let scores: Vec<f64> = out.iter().map(|r| r.momentum_score).collect();
        assert_eq!(out[0].symbol, "HIGH");
        assert!(approx(scores[0], 350.0));
        assert!(approx(scores[1], 200.0));
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let out = score(&[
            snap("FIRST", 100.0, 110.0, 1000.0, 1200.0),
            snap("SECOND", 200.0, 220.0, 500.0, 600.0),
            snap("THIRD", 50.0, 55.0, 10.0, 12.0),
        ]);
        let order: Vec<&str> = out.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["FIRST", "SECOND", "THIRD"]);
    }

    #[test]
    fn duplicate_symbols_are_scored_independently() {
        let out = score(&[
            snap("SBIN", 100.0, 110.0, 1000.0, 1200.0),
            snap("SBIN", 100.0, 120.0, 1000.0, 1200.0),
        ]);
        assert_eq!(out.len(), 2);
        assert!(approx(out[0].momentum_score, 400.0));
        assert!(approx(out[1].momentum_score, 200.0));
    }

    #[test]
    fn invalid_snapshots_are_skipped_without_aborting_batch() {
        let out = score(&[
            snap("ZERO", 0.0, 110.0, 1000.0, 1200.0),
            snap("NEG", -5.0, 110.0, 1000.0, 1200.0),
            snap("NAN", 100.0, f64::NAN, 1000.0, 1200.0),
            snap("NEGVOL", 100.0, 110.0, -1.0, 1200.0),
            snap("", 100.0, 110.0, 1000.0, 1200.0),
            snap("OK", 100.0, 110.0, 1000.0, 1200.0),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].symbol, "OK");
    }

    #[test]
    fn evaluate_reports_reason() {
        assert_eq!(
            evaluate(&snap("ZERO", 0.0, 1.0, 1.0, 2.0)),
            Err(SnapshotError::InvalidReferencePrice {
                symbol: "ZERO".to_string(),
                price: 0.0
            })
        );
        assert_eq!(evaluate(&snap(" ", 1.0, 2.0, 1.0, 2.0)), Err(SnapshotError::EmptySymbol));
        assert!(matches!(
            evaluate(&snap("V", 1.0, 2.0, f64::INFINITY, 2.0)),
            Err(SnapshotError::InvalidVolume { .. })
        ));
        assert_eq!(evaluate(&snap("DOWN", 10.0, 9.0, 1.0, 2.0)), Ok(None));
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(score(&[]).is_empty());
    }

    #[test]
    fn scoring_is_idempotent_and_well_formed() {
        let input = vec![
            snap("RELIANCE", 2900.0, 2950.5, 1_200_000.0, 3_400_000.0),
            snap("TCS", 3800.0, 3790.0, 800_000.0, 900_000.0),
            snap("HDFCBANK", 1500.0, 1512.25, 2_000_000.0, 2_100_000.0),
            snap("INFY", 1600.0, 1660.0, 900_000.0, 3_000_000.0),
            snap("WIPRO", 470.0, 471.0, 0.0, 10.0),
            snap("LT", 3400.0, 3450.0, 500_000.0, 400_000.0),
        ];
        let first = score(&input);
        let second = score(&input);
        assert_eq!(first, second);

        for r in &first {
            assert!(r.current_price > r.reference_price);
            assert!(r.current_volume > r.reference_volume);
            assert!(r.momentum_score >= 0.0);
            assert!(approx(r.momentum_score, r.price_change_pct * r.volume_change_pct));
        }
        for pair in first.windows(2) {
            assert!(pair[0].momentum_score >= pair[1].momentum_score);
        }
        assert!(first.iter().all(|r| r.symbol != "TCS" && r.symbol != "LT"));
    }
}
