//! Groups quotes per player and emits projections once a player's markets are complete

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::formulas::project;
use crate::error::Result;
use crate::models::{GameId, MarketQuote, MarketType, Player, PlayerMarketSet, Position, Projection};

/// Players are identified by game and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerKey {
    pub game: Option<GameId>,
    pub name: String,
}

impl From<&Player> for PlayerKey {
    fn from(player: &Player) -> Self {
        Self {
            game: player.game.clone(),
            name: player.name.clone(),
        }
    }
}

/// Player left out of the final table because markets were missing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncompletePlayerWarning {
    pub player: String,
    pub game: Option<GameId>,
    pub position: Position,
    pub missing: Vec<MarketType>,
}

#[derive(Debug)]
struct Entry {
    markets: PlayerMarketSet,
    explicit: Option<Position>,
    /// Set once a projection has been emitted
    locked: Option<Position>,
    seen: usize,
}

impl Entry {
    fn position(&self) -> Position {
        self.locked
            .or(self.explicit)
            .unwrap_or_else(|| self.markets.infer_position())
    }
}

/// Result of a finished aggregation
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    /// Sorted by total, highest first
    pub projections: Vec<Projection>,
    pub warnings: Vec<IncompletePlayerWarning>,
}

/// Thread-safe per-player market map
#[derive(Debug, Default)]
pub struct Aggregator {
    entries: Mutex<HashMap<PlayerKey, Entry>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a quote; returns the projection the first time the player's set is complete
    ///
    /// A later quote for the same market replaces the earlier one. Invalid
    /// quotes are rejected without touching the player's set.
    pub fn ingest(&self, player: &Player, quote: MarketQuote) -> Result<Option<Projection>> {
        quote.validate()?;

        let key = PlayerKey::from(player);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let seen = entries.len();
        let entry = entries.entry(key).or_insert_with(|| Entry {
            markets: PlayerMarketSet::new(),
            explicit: None,
            locked: None,
            seen,
        });

        if player.position.is_some() {
            entry.explicit = player.position;
        }
        if let Some(previous) = entry.markets.insert(quote) {
            tracing::debug!(
                "Replacing {} quote for {} ({:.3}/{:.3} -> {:.3}/{:.3})",
                quote.market,
                player.name,
                previous.over,
                previous.under,
                quote.over,
                quote.under
            );
        }

        if entry.locked.is_some() {
            return Ok(None);
        }

        let position = entry.position();
        if !entry.markets.is_complete(position) {
            return Ok(None);
        }

        let projection = project(&player.name, player.game.clone(), position, &entry.markets)?;
        entry.locked = Some(position);
        Ok(Some(projection))
    }

    /// Players seen so far
    pub fn player_count(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Players whose projection has been emitted
    pub fn emitted_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|e| e.locked.is_some())
            .count()
    }

    /// Build the final table from the latest quotes of every complete player
    pub fn finish(&self) -> Aggregate {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let mut ordered: Vec<(&PlayerKey, &Entry)> = entries.iter().collect();
        ordered.sort_by_key(|(_, entry)| entry.seen);

        let mut aggregate = Aggregate::default();
        for (key, entry) in ordered {
            let position = entry.position();
            let missing = entry.markets.missing(position);

            if !missing.is_empty() {
                tracing::warn!(
                    "{} ({}) incomplete, missing {:?}",
                    key.name,
                    position,
                    missing
                );
                aggregate.warnings.push(IncompletePlayerWarning {
                    player: key.name.clone(),
                    game: key.game.clone(),
                    position,
                    missing,
                });
                continue;
            }

            match project(&key.name, key.game.clone(), position, &entry.markets) {
                Ok(projection) => aggregate.projections.push(projection),
                Err(e) => tracing::warn!("Skipping {}: {}", key.name, e),
            }
        }

        aggregate.projections.sort_by(|a, b| b.total.total_cmp(&a.total));
        aggregate
    }
}
