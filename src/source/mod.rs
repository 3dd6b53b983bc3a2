//! Quote sources
//!
//! A source yields `(Player, MarketQuote)` pairs into a channel. The caller
//! picks the source; the projection engine never knows where numbers came from.

mod live;
mod manual;
mod snapshot;

pub use live::LiveScrapeSource;
pub use manual::{LinePrompter, ManualEntrySource, Prompter};
pub use snapshot::{QuoteRecord, QuoteSnapshot, SnapshotSource};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::error::Result;
use crate::models::{MarketQuote, Player};

/// One observed quote for one player
pub type QuoteEvent = (Player, MarketQuote);

/// What a source did and what it had to skip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub games_discovered: usize,
    pub games_processed: usize,
    pub games_failed: usize,
    pub panels_found: usize,
    pub panels_skipped: usize,
    /// Lines dropped from otherwise usable panels for lack of a second side
    pub lines_skipped: usize,
    pub quotes_emitted: usize,
    /// The run was stopped by the cancellation signal
    pub cancelled: bool,
}

/// Capability that produces quotes
#[async_trait]
pub trait QuoteSource: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Send every quote into `sink` until done or cancelled
    async fn run(
        &mut self,
        sink: mpsc::Sender<QuoteEvent>,
        cancel: watch::Receiver<bool>,
    ) -> Result<SourceReport>;
}

/// Resolves once the cancellation flag is raised; never if the sender is gone
pub async fn cancelled(mut cancel: watch::Receiver<bool>) {
    if cancel.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}
