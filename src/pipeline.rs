//! Source → aggregator run loop
//!
//! The source and the consumer run concurrently over a bounded channel. Every
//! quote is recorded so a run can be saved and replayed later.

use serde::Serialize;
use std::time::Instant;
use tokio::sync::{mpsc, watch};

use crate::aggregator::{Aggregator, IncompletePlayerWarning};
use crate::error::Result;
use crate::models::Projection;
use crate::source::{QuoteRecord, QuoteSource, SourceReport};

const QUOTE_CHANNEL_CAPACITY: usize = 256;

/// Counts for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub source: &'static str,
    pub report: SourceReport,
    pub quotes_received: usize,
    pub quotes_rejected: usize,
    pub players_seen: usize,
    pub projections: usize,
    pub incomplete_players: usize,
    pub elapsed_ms: u64,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final table, highest total first
    pub projections: Vec<Projection>,
    pub warnings: Vec<IncompletePlayerWarning>,
    pub summary: RunSummary,
    /// Every quote received, in arrival order
    pub records: Vec<QuoteRecord>,
}

/// Drive `source` to completion, calling `on_projection` as each player completes
pub async fn run_pipeline<S, F>(
    source: &mut S,
    cancel: watch::Receiver<bool>,
    mut on_projection: F,
) -> Result<RunOutcome>
where
    S: QuoteSource + ?Sized,
    F: FnMut(&Projection) + Send,
{
    let started = Instant::now();
    let name = source.name();
    let (tx, mut rx) = mpsc::channel(QUOTE_CHANNEL_CAPACITY);
    let aggregator = Aggregator::new();

    tracing::info!("Starting {} run", name);

    let producer = source.run(tx, cancel);
    let consumer = async {
        let mut records = Vec::new();
        let mut rejected = 0;

        while let Some((player, quote)) = rx.recv().await {
            tracing::debug!(
                "{} {}: {:.3}/{:.3} line {:?}",
                player.name,
                quote.market,
                quote.over,
                quote.under,
                quote.line
            );
            match aggregator.ingest(&player, quote) {
                Ok(Some(projection)) => on_projection(&projection),
                Ok(None) => {}
                Err(e) => {
                    rejected += 1;
                    tracing::warn!("Rejected {} quote for {}: {}", quote.market, player.name, e);
                }
            }
            records.push(QuoteRecord::from((player, quote)));
        }

        (records, rejected)
    };

    let (report, (records, rejected)) = tokio::join!(producer, consumer);
    let report = report?;

    let aggregate = aggregator.finish();
    let summary = RunSummary {
        source: name,
        quotes_received: records.len(),
        quotes_rejected: rejected,
        players_seen: aggregator.player_count(),
        projections: aggregate.projections.len(),
        incomplete_players: aggregate.warnings.len(),
        elapsed_ms: started.elapsed().as_millis() as u64,
        report,
    };

    tracing::info!(
        "{} run finished: {} quotes, {} players, {} projections, {} incomplete",
        name,
        summary.quotes_received,
        summary.players_seen,
        summary.projections,
        summary.incomplete_players
    );

    Ok(RunOutcome {
        projections: aggregate.projections,
        warnings: aggregate.warnings,
        summary,
        records,
    })
}
