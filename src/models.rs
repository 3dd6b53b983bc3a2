use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{validate_line, validate_odds, Error, Result};

/// Game identifier derived from the URL slug and numeric event id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId {
    pub slug: String,
    pub id: u64,
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.slug, self.id)
    }
}

/// A discovered game page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub home_team: String,
    pub away_team: String,
    pub url: String,
}

impl Game {
    /// Short "Away @ Home" description
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }
}

/// Scoring position. RB, WR and TE share one formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Quarterback,
    Skill,
}

impl Position {
    /// Market types needed before a projection can be computed
    pub fn required_markets(&self) -> &'static [MarketType] {
        match self {
            Position::Quarterback => &[
                MarketType::AnytimeTd,
                MarketType::Interceptions,
                MarketType::PassingYards,
                MarketType::RushingYards,
                MarketType::TdPasses,
            ],
            Position::Skill => &[
                MarketType::AnytimeTd,
                MarketType::ReceivingYards,
                MarketType::Receptions,
                MarketType::RushingYards,
            ],
        }
    }
}

impl std::str::FromStr for Position {
    type Err = Error;

    /// Accepts QB, RB, WR or TE in any case
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QB" => Ok(Position::Quarterback),
            "RB" | "WR" | "TE" | "RB/WR/TE" => Ok(Position::Skill),
            other => Err(Error::Config(format!(
                "unknown position {:?} (expected QB, RB, WR or TE)",
                other
            ))),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Quarterback => write!(f, "QB"),
            Position::Skill => write!(f, "RB/WR/TE"),
        }
    }
}

/// Prop market taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarketType {
    AnytimeTd,
    Interceptions,
    PassingYards,
    RushingYards,
    TdPasses,
    ReceivingYards,
    Receptions,
}

/// Binary yes/no or over/under around a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketKind {
    Binary,
    OverUnder,
}

/// Per-market description used by both the extractor and the formulas
#[derive(Debug, Clone, Copy)]
pub struct MarketDescriptor {
    pub market: MarketType,
    /// Label inside the panel header, e.g. "Receiving Yards"
    pub label: &'static str,
    pub kind: MarketKind,
    /// Fantasy points per unit of the stat
    pub points_per_unit: f64,
    /// Weight the scaled line by `p + 0.5` instead of using `p` directly
    pub centered: bool,
    /// Only quarterbacks are offered this market
    pub qb_only: bool,
}

pub const MARKETS: [MarketDescriptor; 7] = [
    MarketDescriptor {
        market: MarketType::AnytimeTd,
        label: "Anytime TD",
        kind: MarketKind::Binary,
        points_per_unit: 6.0,
        centered: false,
        qb_only: false,
    },
    MarketDescriptor {
        market: MarketType::Interceptions,
        label: "Interceptions",
        kind: MarketKind::OverUnder,
        points_per_unit: -2.0,
        centered: false,
        qb_only: true,
    },
    MarketDescriptor {
        market: MarketType::PassingYards,
        label: "Passing Yards",
        kind: MarketKind::OverUnder,
        points_per_unit: 0.04,
        centered: true,
        qb_only: true,
    },
    MarketDescriptor {
        market: MarketType::RushingYards,
        label: "Rushing Yards",
        kind: MarketKind::OverUnder,
        points_per_unit: 0.1,
        centered: true,
        qb_only: false,
    },
    MarketDescriptor {
        market: MarketType::TdPasses,
        label: "TD Passes",
        kind: MarketKind::OverUnder,
        points_per_unit: 4.0,
        centered: true,
        qb_only: true,
    },
    MarketDescriptor {
        market: MarketType::ReceivingYards,
        label: "Receiving Yards",
        kind: MarketKind::OverUnder,
        points_per_unit: 0.1,
        centered: true,
        qb_only: false,
    },
    MarketDescriptor {
        market: MarketType::Receptions,
        label: "Receptions",
        kind: MarketKind::OverUnder,
        points_per_unit: 1.0,
        centered: true,
        qb_only: false,
    },
];

impl MarketType {
    /// `MARKETS` is laid out in variant order
    pub fn descriptor(&self) -> &'static MarketDescriptor {
        &MARKETS[*self as usize]
    }

    /// Look up a market by its exact header label
    pub fn from_label(label: &str) -> Option<MarketType> {
        MARKETS
            .iter()
            .find(|d| d.label == label.trim())
            .map(|d| d.market)
    }

    pub fn label(&self) -> &'static str {
        self.descriptor().label
    }

    pub fn is_binary(&self) -> bool {
        self.descriptor().kind == MarketKind::Binary
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One two-sided market observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub market: MarketType,
    /// Decimal odds for Over (or Yes)
    pub over: f64,
    /// Decimal odds for Under (or No)
    pub under: f64,
    /// Stat threshold; absent for binary markets
    pub line: Option<f64>,
}

impl MarketQuote {
    /// Validated yes/no quote for a binary market
    pub fn binary(market: MarketType, yes: f64, no: f64) -> Result<Self> {
        let quote = Self {
            market,
            over: yes,
            under: no,
            line: None,
        };
        quote.validate()?;
        Ok(quote)
    }

    /// Validated over/under quote around a line
    pub fn over_under(market: MarketType, over: f64, under: f64, line: f64) -> Result<Self> {
        let quote = Self {
            market,
            over,
            under,
            line: Some(line),
        };
        quote.validate()?;
        Ok(quote)
    }

    /// Check the odds and line invariants
    pub fn validate(&self) -> Result<()> {
        validate_odds(self.over)?;
        validate_odds(self.under)?;
        match (self.market.is_binary(), self.line) {
            (true, _) => Ok(()),
            (false, Some(line)) => validate_line(self.market, line).map(|_| ()),
            (false, None) => Err(Error::InvalidLine {
                market: self.market,
                reason: "line is required".to_string(),
            }),
        }
    }
}

/// Player as observed by a source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    /// Known for manual entry; inferred from the markets for scraped players
    pub position: Option<Position>,
    pub game: Option<GameId>,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: None,
            game: None,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn in_game(mut self, game: GameId) -> Self {
        self.game = Some(game);
        self
    }
}

/// Latest quote per market type for one player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerMarketSet {
    quotes: BTreeMap<MarketType, MarketQuote>,
}

impl PlayerMarketSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quote, replacing any earlier quote for the same market
    pub fn insert(&mut self, quote: MarketQuote) -> Option<MarketQuote> {
        self.quotes.insert(quote.market, quote)
    }

    pub fn get(&self, market: MarketType) -> Option<&MarketQuote> {
        self.quotes.get(&market)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn quotes(&self) -> impl Iterator<Item = &MarketQuote> {
        self.quotes.values()
    }

    /// Required markets not yet present
    pub fn missing(&self, position: Position) -> Vec<MarketType> {
        position
            .required_markets()
            .iter()
            .copied()
            .filter(|m| !self.quotes.contains_key(m))
            .collect()
    }

    pub fn is_complete(&self, position: Position) -> bool {
        self.missing(position).is_empty()
    }

    /// QB if any quarterback-only market was seen
    pub fn infer_position(&self) -> Position {
        if self.quotes.keys().any(|m| m.descriptor().qb_only) {
            Position::Quarterback
        } else {
            Position::Skill
        }
    }
}

/// Points attributed to one market
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub market: MarketType,
    pub probability: f64,
    pub line: Option<f64>,
    pub points: f64,
}

/// Final per-player estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub player: String,
    pub game: Option<GameId>,
    pub position: Position,
    /// Rounded to 2 decimal places
    pub total: f64,
    pub contributions: Vec<Contribution>,
    pub quotes: PlayerMarketSet,
}

impl Projection {
    pub fn contribution(&self, market: MarketType) -> Option<&Contribution> {
        self.contributions.iter().find(|c| c.market == market)
    }
}
