//! Saved quote snapshots

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tokio::sync::{mpsc, watch};

use super::{QuoteEvent, QuoteSource, SourceReport};
use crate::error::{Error, Result};
use crate::models::{MarketQuote, Player};

/// One quote as it was observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub player: Player,
    pub quote: MarketQuote,
}

impl From<QuoteEvent> for QuoteRecord {
    fn from((player, quote): QuoteEvent) -> Self {
        Self { player, quote }
    }
}

/// Quotes from one run, in arrival order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub scraped_at: DateTime<Utc>,
    pub records: Vec<QuoteRecord>,
}

impl QuoteSnapshot {
    pub fn new(records: Vec<QuoteRecord>) -> Self {
        Self {
            scraped_at: Utc::now(),
            records,
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        tracing::info!("Saved {} quotes to {}", self.records.len(), path.display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Replays a snapshot as if it were being scraped
pub struct SnapshotSource {
    snapshot: QuoteSnapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: QuoteSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let snapshot = QuoteSnapshot::load(path)?;
        tracing::info!(
            "Loaded {} quotes scraped at {}",
            snapshot.records.len(),
            snapshot.scraped_at.to_rfc3339()
        );
        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl QuoteSource for SnapshotSource {
    fn name(&self) -> &'static str {
        "snapshot"
    }

    async fn run(
        &mut self,
        sink: mpsc::Sender<QuoteEvent>,
        cancel: watch::Receiver<bool>,
    ) -> Result<SourceReport> {
        let mut report = SourceReport::default();

        for record in &self.snapshot.records {
            let stop = *cancel.borrow();
            if stop {
                report.cancelled = true;
                break;
            }
            sink.send((record.player.clone(), record.quote))
                .await
                .map_err(|_| Error::Cancelled)?;
            report.quotes_emitted += 1;
        }

        Ok(report)
    }
}
