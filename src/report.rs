//! Console rendering of a ranking.

use std::fmt::Write;

use crate::config::REPORT_DETAIL_COUNT;
use crate::types::ScoredResult;

const WIDTH: usize = 100;

fn rule(out: &mut String, ch: char) {
    out.extend(std::iter::repeat(ch).take(WIDTH));
    out.push('\n');
}

fn centered(out: &mut String, title: &str) {
    let _ = writeln!(out, "{:^width$}", title, width = WIDTH);
}

/// Whole-number volume with comma thousands separators.
pub fn format_thousands(v: f64) -> String {
    let n = v.round() as i64;
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if n < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Price with two decimals and comma thousands separators.
pub fn format_price(v: f64) -> String {
    let cents = (v * 100.0).round() as i64;
    let whole = format_thousands((cents / 100) as f64);
    format!("{whole}.{:02}", (cents % 100).abs())
}

pub fn render(results: &[ScoredResult]) -> String {
    let mut out = String::new();

    if results.is_empty() {
        out.push_str("\n⚠ No stocks showing positive intraday trend at this time.\n");
        out.push_str("No stock has both price AND volume increases since the reference time.\n");
        return out;
    }

    let _ = writeln!(out, "\n✓ Found {} stocks with positive momentum\n", results.len());

    rule(&mut out, '=');
    centered(&mut out, "MOMENTUM RANKINGS");
    rule(&mut out, '=');
    let _ = writeln!(
        out,
        "{:<6} {:<12} {:<12} {:<12} {:<12} {:<12} {:<15}",
        "Rank", "Symbol", "Ref Price", "Current", "Price Chg", "Vol Chg", "Score"
    );
    rule(&mut out, '=');
    for (i, r) in results.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<6} {:<12} ₹{:>9.2}  ₹{:>9.2}  {:>9.2}%  {:>9.2}%  {:>13.2}",
            i + 1,
            r.symbol,
            r.reference_price,
            r.current_price,
            r.price_change_pct,
            r.volume_change_pct,
            r.momentum_score,
        );
    }
    rule(&mut out, '=');

    let _ = writeln!(out);
    rule(&mut out, '=');
    centered(&mut out, &format!("TOP {REPORT_DETAIL_COUNT} MOMENTUM STOCKS - DETAILED VIEW"));
    rule(&mut out, '=');
    for (i, r) in results.iter().take(REPORT_DETAIL_COUNT).enumerate() {
        let _ = writeln!(out, "\n#{}  {}", i + 1, r.symbol);
        let _ = writeln!(out, "    Time:               {}", r.observed_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "    Reference Price:    ₹{}", format_price(r.reference_price));
        let _ = writeln!(out, "    Current Price:      ₹{}", format_price(r.current_price));
        let _ = writeln!(out, "    Price Change:       +{:.2}%", r.price_change_pct);
        let _ = writeln!(out, "    Reference Volume:   {}", format_thousands(r.reference_volume));
        let _ = writeln!(out, "    Current Volume:     {}", format_thousands(r.current_volume));
        let _ = writeln!(out, "    Volume Change:      +{:.2}%", r.volume_change_pct);
        let _ = writeln!(out, "    Momentum Score:     {:.2}", r.momentum_score);
        let _ = writeln!(out, "    {}", "─".repeat(85));
    }
    let _ = writeln!(out);
    rule(&mut out, '=');
    out
}
