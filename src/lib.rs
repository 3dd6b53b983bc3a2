//! NFL props - fantasy point projections from sportsbook player-prop odds
//!
//! This library provides:
//! - Implied probability from two-sided decimal odds
//! - Fantasy point formulas for quarterbacks and RB/WR/TE
//! - Scraping of game pages and prop panels into market quotes
//! - Per-player aggregation that emits a projection once a player's markets are complete
//! - Delimited-text and JSON export of the projection table
//!
//! # Example
//!
//! ```
//! use nfl_props::aggregator::Aggregator;
//! use nfl_props::models::{MarketQuote, MarketType, Player};
//!
//! let aggregator = Aggregator::new();
//! let player = Player::new("Brandin Cooks");
//!
//! aggregator.ingest(&player, MarketQuote::binary(MarketType::AnytimeTd, 1.9, 1.9)?)?;
//! aggregator.ingest(&player, MarketQuote::over_under(MarketType::ReceivingYards, 1.9, 1.9, 40.0)?)?;
//! aggregator.ingest(&player, MarketQuote::over_under(MarketType::Receptions, 1.9, 1.9, 4.0)?)?;
//! let projection = aggregator
//!     .ingest(&player, MarketQuote::over_under(MarketType::RushingYards, 1.9, 1.9, 0.0)?)?
//!     .expect("all RB/WR/TE markets present");
//!
//! assert_eq!(projection.total, 11.0);
//! # Ok::<(), nfl_props::Error>(())
//! ```

pub mod aggregator;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod scraper;
pub mod source;

// Re-export commonly used types
pub use aggregator::{Aggregate, Aggregator, IncompletePlayerWarning};
pub use config::ScraperConfig;
pub use error::{Error, Result};
pub use models::{
    Game, GameId, MarketQuote, MarketType, Player, PlayerMarketSet, Position, Projection,
};
pub use pipeline::{run_pipeline, RunOutcome, RunSummary};
pub use source::{QuoteSource, SourceReport};
