use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror api/routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StatsResponse {
    pub total_stocks: usize,
    pub trending_stocks: usize,
    pub top_score: f64,
    pub last_update: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultRow {
    pub symbol: String,
    pub reference_price: f64,
    pub current_price: f64,
    pub price_change_pct: f64,
    pub reference_volume: f64,
    pub current_volume: f64,
    pub volume_change_pct: f64,
    pub momentum_score: f64,
    pub observed_at: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TopPerformersResponse {
    top_performers: Vec<ResultRow>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct HealthResponse {
    pub version: Option<String>,
    pub source: Option<String>,
    pub last_fetch_source: Option<String>,
    pub fetch_count: Option<u64>,
    pub fetch_failures: Option<u64>,
    pub quote_latency_p50_ms: Option<f64>,
    pub quote_latency_p99_ms: Option<f64>,
}

/// Body of fetch-data / analyze replies; only the message is shown.
#[derive(Debug, Clone, Deserialize)]
struct ActionResponse {
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

/// Rows requested from /api/top-performers.
pub const TABLE_ROWS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub stats: StatsResponse,
    pub results: Vec<ResultRow>,
    pub health: HealthResponse,
    /// Message from the last fetch/analyze action.
    pub last_message: Option<String>,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            stats: StatsResponse::default(),
            results: Vec::new(),
            health: HealthResponse::default(),
            last_message: None,
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let stats_url = format!("{}/api/stats", self.base_url);
        let top_url = format!("{}/api/top-performers/{}", self.base_url, TABLE_ROWS);
        let health_url = format!("{}/api/health", self.base_url);

        let (stats_res, top_res, health_res) = tokio::join!(
            client.get(&stats_url).send(),
            client.get(&top_url).send(),
            client.get(&health_url).send(),
        );

        let stats = match stats_res {
            Ok(r) => r.json::<StatsResponse>().await,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };
        match stats {
            Ok(s) => self.stats = s,
            Err(e) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
                return;
            }
        }

        // 400 before the first analysis; show an empty table.
        self.results = match top_res {
            Ok(r) if r.status().is_success() => r
                .json::<TopPerformersResponse>()
                .await
                .map(|t| t.top_performers)
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        if let Ok(h) = health_res {
            if let Ok(health) = h.json::<HealthResponse>().await {
                self.health = health;
            }
        }

        self.status = ConnectionStatus::Connected;
        self.last_refresh = std::time::Instant::now();
    }

    /// Trigger a server-side action (`fetch-data` or `analyze`).
    pub async fn trigger(&mut self, client: &reqwest::Client, action: &str) {
        let url = format!("{}/api/{}", self.base_url, action);
        self.last_message = Some(match client.get(&url).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success();
                let message = resp
                    .json::<ActionResponse>()
                    .await
                    .ok()
                    .and_then(|a| a.message)
                    .unwrap_or_else(|| action.to_string());
                if ok {
                    message
                } else {
                    format!("✗ {message}")
                }
            }
            Err(e) => format!("✗ {action}: {e}"),
        });
        self.refresh(client).await;
    }

    pub fn selected(&self, index: Option<usize>) -> Option<&ResultRow> {
        index.and_then(|i| self.results.get(i))
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_pct(v: f64) -> String {
    format!("{:+.2}%", v)
}

/// Compact volume: 950 → "950", 12_500 → "12.5K", 3_400_000 → "3.40M".
pub fn format_volume(v: f64) -> String {
    if v >= 1_000_000.0 {
        format!("{:.2}M", v / 1_000_000.0)
    } else if v >= 1_000.0 {
        format!("{:.1}K", v / 1_000.0)
    } else {
        format!("{:.0}", v)
    }
}

/// "2024-03-04T10:15:00.123Z" → "10:15:00".
pub fn format_clock(ts: &str) -> String {
    ts.split('T')
        .nth(1)
        .map(|t| t.chars().take(8).collect())
        .unwrap_or_else(|| "—".to_string())
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
