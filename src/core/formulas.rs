//! Fantasy point projection formulas
//!
//! Each market contributes one term, built from its descriptor:
//!
//! ```text
//! centered:  line * points_per_unit * (p_over + 0.5)
//! raw count: points_per_unit * p
//! ```
//!
//! A coin-flip market (p = 0.5) gives full credit for the published line.
//! Anytime TD and Interceptions are count expectations and use p directly.
//!
//! ```text
//! RB/WR/TE = 6*p_td + rec_yds/10*(p+0.5) + receptions*(p+0.5) + rush_yds/10*(p+0.5)
//! QB       = 6*p_td - 2*p_int + pass_yds*0.04*(p+0.5) + rush_yds/10*(p+0.5) + td_passes*4*(p+0.5)
//! ```

use crate::core::odds::implied_probability;
use crate::error::{Error, Result};
use crate::models::{
    Contribution, GameId, MarketType, PlayerMarketSet, Position, Projection,
};

/// Offset added to the over-probability of line-based markets
pub const CENTER_OFFSET: f64 = 0.5;

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Points for one market given its implied probability and line
pub fn market_points(market: MarketType, probability: f64, line: Option<f64>) -> f64 {
    let d = market.descriptor();
    if d.centered {
        line.unwrap_or(0.0) * d.points_per_unit * (probability + CENTER_OFFSET)
    } else {
        d.points_per_unit * probability
    }
}

/// Inputs of the RB/WR/TE formula
#[derive(Debug, Clone, Copy)]
pub struct SkillInputs {
    pub p_td: f64,
    pub rec_yards_line: f64,
    pub p_rec_yards_over: f64,
    pub receptions_line: f64,
    pub p_receptions_over: f64,
    pub rush_yards_line: f64,
    pub p_rush_yards_over: f64,
}

impl SkillInputs {
    /// Projected points, rounded to 2 decimals
    ///
    /// # Examples
    /// ```
    /// use nfl_props::core::formulas::SkillInputs;
    /// let inputs = SkillInputs {
    ///     p_td: 0.5,
    ///     rec_yards_line: 40.0,
    ///     p_rec_yards_over: 0.5,
    ///     receptions_line: 4.0,
    ///     p_receptions_over: 0.5,
    ///     rush_yards_line: 0.0,
    ///     p_rush_yards_over: 0.5,
    /// };
    /// assert_eq!(inputs.total(), 11.0);
    /// ```
    pub fn total(&self) -> f64 {
        round2(
            market_points(MarketType::AnytimeTd, self.p_td, None)
                + market_points(
                    MarketType::ReceivingYards,
                    self.p_rec_yards_over,
                    Some(self.rec_yards_line),
                )
                + market_points(
                    MarketType::Receptions,
                    self.p_receptions_over,
                    Some(self.receptions_line),
                )
                + market_points(
                    MarketType::RushingYards,
                    self.p_rush_yards_over,
                    Some(self.rush_yards_line),
                ),
        )
    }
}

/// Inputs of the QB formula
#[derive(Debug, Clone, Copy)]
pub struct QbInputs {
    pub p_td: f64,
    pub p_int_over: f64,
    pub pass_yards_line: f64,
    pub p_pass_yards_over: f64,
    pub rush_yards_line: f64,
    pub p_rush_yards_over: f64,
    pub td_passes_line: f64,
    pub p_td_passes_over: f64,
}

impl QbInputs {
    /// Projected points, rounded to 2 decimals
    pub fn total(&self) -> f64 {
        round2(
            market_points(MarketType::AnytimeTd, self.p_td, None)
                + market_points(MarketType::Interceptions, self.p_int_over, None)
                + market_points(
                    MarketType::PassingYards,
                    self.p_pass_yards_over,
                    Some(self.pass_yards_line),
                )
                + market_points(
                    MarketType::RushingYards,
                    self.p_rush_yards_over,
                    Some(self.rush_yards_line),
                )
                + market_points(
                    MarketType::TdPasses,
                    self.p_td_passes_over,
                    Some(self.td_passes_line),
                ),
        )
    }
}

/// Compute a projection from a complete market set
///
/// Fails with `IncompletePlayer` when a required market is missing and with
/// `InvalidOdds` when a quote cannot be converted.
pub fn project(
    player: &str,
    game: Option<GameId>,
    position: Position,
    markets: &PlayerMarketSet,
) -> Result<Projection> {
    let missing = markets.missing(position);
    if !missing.is_empty() {
        return Err(Error::IncompletePlayer {
            player: player.to_string(),
            missing,
        });
    }

    let mut contributions = Vec::with_capacity(position.required_markets().len());
    for market in position.required_markets() {
        let quote = markets.get(*market).ok_or_else(|| Error::IncompletePlayer {
            player: player.to_string(),
            missing: vec![*market],
        })?;
        let probability = implied_probability(quote.over, quote.under)?;
        let line = if market.is_binary() { None } else { quote.line };

        contributions.push(Contribution {
            market: *market,
            probability,
            line,
            points: market_points(*market, probability, line),
        });
    }

    let total = round2(contributions.iter().map(|c| c.points).sum());

    Ok(Projection {
        player: player.to_string(),
        game,
        position,
        total,
        contributions,
        quotes: markets.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketQuote;

    fn even(market: MarketType, line: f64) -> MarketQuote {
        MarketQuote::over_under(market, 1.9, 1.9, line).unwrap()
    }

    #[test]
    fn test_skill_formula_coin_flip() {
        let inputs = SkillInputs {
            p_td: 0.5,
            rec_yards_line: 40.0,
            p_rec_yards_over: 0.5,
            receptions_line: 4.0,
            p_receptions_over: 0.5,
            rush_yards_line: 0.0,
            p_rush_yards_over: 0.5,
        };
        assert!((inputs.total() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_qb_formula_coin_flip() {
        let inputs = QbInputs {
            p_td: 0.5,
            p_int_over: 0.5,
            pass_yards_line: 250.0,
            p_pass_yards_over: 0.5,
            rush_yards_line: 20.0,
            p_rush_yards_over: 0.5,
            td_passes_line: 2.0,
            p_td_passes_over: 0.5,
        };
        assert!((inputs.total() - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_market_points_terms() {
        assert!((market_points(MarketType::AnytimeTd, 0.5, None) - 3.0).abs() < 1e-9);
        assert!((market_points(MarketType::Interceptions, 0.5, Some(0.5)) + 1.0).abs() < 1e-9);
        assert!((market_points(MarketType::PassingYards, 0.5, Some(250.0)) - 10.0).abs() < 1e-9);
        // Centering keeps 0.6 of the line credit at p = 0.1
        assert!((market_points(MarketType::Receptions, 0.1, Some(5.0)) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(11.004), 11.0);
        assert_eq!(round2(11.006), 11.01);
        assert_eq!(round2(-1.234), -1.23);
    }

    #[test]
    fn test_project_skill_from_quotes() {
        let mut set = PlayerMarketSet::new();
        set.insert(MarketQuote::binary(MarketType::AnytimeTd, 1.9, 1.9).unwrap());
        set.insert(even(MarketType::ReceivingYards, 40.0));
        set.insert(even(MarketType::Receptions, 4.0));
        set.insert(even(MarketType::RushingYards, 0.0));

        let projection = project("Brandin Cooks", None, Position::Skill, &set).unwrap();
        assert!((projection.total - 11.0).abs() < 1e-9);
        assert_eq!(projection.contributions.len(), 4);

        let td = projection.contribution(MarketType::AnytimeTd).unwrap();
        assert!((td.points - 3.0).abs() < 1e-9);
        assert_eq!(td.line, None);
    }

    #[test]
    fn test_project_qb_from_quotes() {
        let mut set = PlayerMarketSet::new();
        set.insert(MarketQuote::binary(MarketType::AnytimeTd, 1.9, 1.9).unwrap());
        set.insert(even(MarketType::Interceptions, 0.5));
        set.insert(even(MarketType::PassingYards, 250.0));
        set.insert(even(MarketType::RushingYards, 20.0));
        set.insert(even(MarketType::TdPasses, 2.0));

        let projection = project("Dak Prescott", None, Position::Quarterback, &set).unwrap();
        assert!((projection.total - 22.0).abs() < 1e-9);
        assert_eq!(projection.position, Position::Quarterback);
    }

    #[test]
    fn test_project_incomplete() {
        let mut set = PlayerMarketSet::new();
        set.insert(MarketQuote::binary(MarketType::AnytimeTd, 1.9, 1.9).unwrap());

        let err = project("Brandin Cooks", None, Position::Skill, &set).unwrap_err();
        match err {
            Error::IncompletePlayer { missing, .. } => assert_eq!(missing.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_project_propagates_invalid_odds() {
        let mut set = PlayerMarketSet::new();
        // Bypass the validated constructor to simulate a corrupt snapshot
        set.insert(MarketQuote {
            market: MarketType::AnytimeTd,
            over: 1.0,
            under: 1.9,
            line: None,
        });
        set.insert(even(MarketType::ReceivingYards, 40.0));
        set.insert(even(MarketType::Receptions, 4.0));
        set.insert(even(MarketType::RushingYards, 0.0));

        assert!(matches!(
            project("X", None, Position::Skill, &set),
            Err(Error::InvalidOdds(_))
        ));
    }

    #[test]
    fn test_project_favourite_scores_higher() {
        let mut base = PlayerMarketSet::new();
        base.insert(MarketQuote::binary(MarketType::AnytimeTd, 1.9, 1.9).unwrap());
        base.insert(even(MarketType::ReceivingYards, 60.0));
        base.insert(even(MarketType::Receptions, 5.0));
        base.insert(even(MarketType::RushingYards, 0.0));

        let mut juiced = base.clone();
        juiced.insert(MarketQuote::over_under(MarketType::ReceivingYards, 1.6, 2.4, 60.0).unwrap());

        let a = project("A", None, Position::Skill, &base).unwrap();
        let b = project("A", None, Position::Skill, &juiced).unwrap();
        assert!(b.total > a.total);
    }
}
