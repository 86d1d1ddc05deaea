//! Snapshot acquisition.
//!
//! Every source produces snapshots for a fixed instrument universe. The
//! scorer and the API depend only on [`SnapshotSource`], never on a concrete
//! implementation.

pub mod baseline;
pub mod nse;
pub mod simulated;

pub use baseline::Baseline;
pub use nse::{LiveSource, NseClient};
pub use simulated::SimulatedSource;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::api::latency::LatencyStats;
use crate::config::{Config, SourceMode};
use crate::error::Result;
use crate::types::Snapshot;

/// Snapshots from one acquisition, tagged with the source that produced them.
#[derive(Debug, Clone)]
pub struct Batch {
    pub provenance: &'static str,
    pub snapshots: Vec<Snapshot>,
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn snapshots(&self) -> Result<Batch>;
}

/// Live data first, generated data when the live fetch fails or comes up
/// short.
pub struct HybridSource {
    live: Box<dyn SnapshotSource>,
    fallback: Box<dyn SnapshotSource>,
    min_live: usize,
}

impl HybridSource {
    pub fn new(
        live: Box<dyn SnapshotSource>,
        fallback: Box<dyn SnapshotSource>,
        min_live: usize,
    ) -> Self {
        Self { live, fallback, min_live }
    }
}

#[async_trait]
impl SnapshotSource for HybridSource {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    async fn snapshots(&self) -> Result<Batch> {
        match self.live.snapshots().await {
            Ok(batch) if batch.snapshots.len() >= self.min_live => return Ok(batch),
            Ok(batch) => warn!(
                "{} returned {} snapshots (need {}), using {}",
                self.live.name(),
                batch.snapshots.len(),
                self.min_live,
                self.fallback.name(),
            ),
            Err(e) => warn!("{} failed ({e}), using {}", self.live.name(), self.fallback.name()),
        }
        self.fallback.snapshots().await
    }
}

/// Build the source selected by `SOURCE_MODE`.
pub fn from_config(cfg: &Config, latency: Arc<LatencyStats>) -> Result<Arc<dyn SnapshotSource>> {
    let live = || -> Result<LiveSource> {
        let baseline = Baseline::from_config(cfg)?;
        info!(baseline = baseline.label(), "reference baseline configured");
        Ok(LiveSource::new(
            NseClient::new(cfg, Arc::clone(&latency)),
            cfg.live_symbols(),
            baseline,
        ))
    };
    let simulated = || match cfg.sim_seed {
        Some(seed) => SimulatedSource::with_seed(cfg.universe(), seed),
        None => SimulatedSource::new(cfg.universe()),
    };

    let source: Arc<dyn SnapshotSource> = match cfg.source_mode {
        SourceMode::Live => Arc::new(live()?),
        SourceMode::Simulated => Arc::new(simulated()),
        SourceMode::Hybrid => Arc::new(HybridSource::new(
            Box::new(live()?),
            Box::new(simulated()),
            cfg.hybrid_min_live,
        )),
    };
    Ok(source)
}
