use std::path::PathBuf;

use crate::error::{AppError, Result};

pub const NSE_BASE_URL: &str = "https://www.nseindia.com";

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Fixed instrument universe (NIFTY 50 subset).
pub const NIFTY50_SYMBOLS: &[&str] = &[
    "RELIANCE", "TCS", "HDFCBANK", "INFY", "ICICIBANK",
    "HINDUNILVR", "ITC", "SBIN", "BHARTIARTL", "BAJFINANCE",
    "KOTAKBANK", "LT", "AXISBANK", "ASIANPAINT", "MARUTI",
    "SUNPHARMA", "TITAN", "ULTRACEMCO", "NESTLEIND", "WIPRO",
];

/// Synthetic reference observation as a fraction of the current one.
pub mod synthetic_baseline {
    pub const PRICE_RATIO: f64 = 0.99;
    pub const VOLUME_RATIO: f64 = 0.3;
}

/// Ranges used by the simulated source.
pub mod simulation {
    pub const PRICE_MIN: f64 = 500.0;
    pub const PRICE_MAX: f64 = 3500.0;
    pub const VOLUME_MIN: u64 = 500_000;
    pub const VOLUME_MAX: u64 = 15_000_000;
}

/// Number of results shown in the detailed section of the console report.
pub const REPORT_DETAIL_COUNT: usize = 5;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// NSE quotes only; an empty or failed fetch is an error.
    Live,
    /// Generated data only.
    Simulated,
    /// NSE quotes, falling back to generated data when too few arrive.
    Hybrid,
}

impl SourceMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(SourceMode::Live),
            "simulated" | "sim" => Ok(SourceMode::Simulated),
            "hybrid" => Ok(SourceMode::Hybrid),
            other => Err(AppError::Config(format!(
                "SOURCE_MODE must be one of live, simulated, hybrid (got {other:?})"
            ))),
        }
    }
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceMode::Live => "live",
            SourceMode::Simulated => "simulated",
            SourceMode::Hybrid => "hybrid",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    pub nse_base_url: String,
    /// Where snapshots come from (SOURCE_MODE)
    pub source_mode: SourceMode,
    /// Only the first N symbols of the universe are requested live (SYMBOL_LIMIT)
    pub symbol_limit: usize,
    /// Hybrid mode falls back to simulation below this many live snapshots (HYBRID_MIN_LIVE)
    pub hybrid_min_live: usize,
    /// Pause between consecutive quote requests (REQUEST_DELAY_MS)
    pub request_delay_ms: u64,
    pub quote_timeout_secs: u64,
    pub prime_timeout_secs: u64,
    /// Directory that receives exported result files (EXPORT_DIR)
    pub export_dir: PathBuf,
    /// Recorded open quotes used as the reference observation (BASELINE_PATH).
    /// Unset means the synthetic baseline is used.
    pub baseline_path: Option<PathBuf>,
    /// Fixed seed for the simulated source (SIM_SEED); unset draws from entropy.
    pub sim_seed: Option<u64>,
}

impl Config {
    /// Defaults overridden by whatever is set in the environment.
    pub fn from_env() -> Result<Self> {
        let d = Self::defaults();
        let parsed = |key: &str, default: u64| -> u64 {
            std::env::var(key)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or(d.log_level),
            api_port: match std::env::var("API_PORT") {
                Ok(v) => v
                    .parse::<u16>()
                    .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
                Err(_) => d.api_port,
            },
            nse_base_url: std::env::var("NSE_BASE_URL").unwrap_or(d.nse_base_url),
            source_mode: match std::env::var("SOURCE_MODE") {
                Ok(v) => SourceMode::parse(&v)?,
                Err(_) => d.source_mode,
            },
            symbol_limit: parsed("SYMBOL_LIMIT", d.symbol_limit as u64) as usize,
            hybrid_min_live: parsed("HYBRID_MIN_LIVE", d.hybrid_min_live as u64) as usize,
            request_delay_ms: parsed("REQUEST_DELAY_MS", d.request_delay_ms),
            quote_timeout_secs: parsed("QUOTE_TIMEOUT_SECS", d.quote_timeout_secs),
            prime_timeout_secs: parsed("PRIME_TIMEOUT_SECS", d.prime_timeout_secs),
            export_dir: std::env::var("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.export_dir),
            baseline_path: std::env::var("BASELINE_PATH")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            sim_seed: match std::env::var("SIM_SEED") {
                Ok(v) => Some(v.trim().parse::<u64>().map_err(|_| {
                    AppError::Config("SIM_SEED must be an unsigned integer".to_string())
                })?),
                Err(_) => d.sim_seed,
            },
        })
    }

    /// Built-in defaults, independent of the environment.
    pub fn defaults() -> Self {
        Self {
            log_level: "info".to_string(),
            api_port: 5000,
            nse_base_url: NSE_BASE_URL.to_string(),
            source_mode: SourceMode::Hybrid,
            symbol_limit: NIFTY50_SYMBOLS.len(),
            hybrid_min_live: 5,
            request_delay_ms: 500,
            quote_timeout_secs: 10,
            prime_timeout_secs: 3,
            export_dir: PathBuf::from("."),
            baseline_path: None,
            sim_seed: None,
        }
    }

    /// Symbols requested from the live source.
    pub fn live_symbols(&self) -> Vec<String> {
        NIFTY50_SYMBOLS
            .iter()
            .take(self.symbol_limit)
            .map(|s| s.to_string())
            .collect()
    }

    /// Symbols generated by the simulated source (always the full universe).
    pub fn universe(&self) -> Vec<String> {
        NIFTY50_SYMBOLS.iter().map(|s| s.to_string()).collect()
    }
}
