//! Error taxonomy shared by the scraper, the projection engine and the sources

use std::time::Duration;
use thiserror::Error;

use crate::models::MarketType;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Odds value that cannot be turned into a probability (fatal to one quote)
    #[error("invalid odds: {0} (decimal odds must be greater than 1.0)")]
    InvalidOdds(f64),

    /// Negative, non-finite or missing line where one is required
    #[error("invalid line for {market}: {reason}")]
    InvalidLine { market: MarketType, reason: String },

    /// Panel markup did not have the expected shape
    #[error("failed to parse market panel: {0}")]
    MarketParse(String),

    /// Only one side of a two-sided market was present
    #[error("incomplete market {market} for {player}: missing {missing} side")]
    IncompleteMarket {
        player: String,
        market: MarketType,
        missing: &'static str,
    },

    /// Page never became ready within the bounded wait
    #[error("page {url} not ready after {waited:?}")]
    DiscoveryTimeout { url: String, waited: Duration },

    /// Schedule page loaded but no game link matched
    #[error("no games found at {0}")]
    NoGamesFound(String),

    /// Game page loaded but no market panel matched
    #[error("no market panels found at {0}")]
    NoMarketsFound(String),

    /// Projection requested for a player whose market set is not complete
    #[error("{player} is missing markets: {missing:?}")]
    IncompletePlayer {
        player: String,
        missing: Vec<MarketType>,
    },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request to {url} failed after {attempts} attempts")]
    FetchFailed { url: String, attempts: u32 },

    /// Browser session could not be started or a WebDriver command failed
    #[error("WebDriver error: {0}")]
    WebDriver(String),

    /// No page session could be checked out in time
    #[error("no page session available after {0:?}")]
    SessionUnavailable(Duration),

    #[error("run cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error should abort a whole scrape run rather than one game or panel
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            Error::NoGamesFound(_) | Error::SessionUnavailable(_) | Error::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Validate a decimal odds value
pub fn validate_odds(odds: f64) -> Result<f64> {
    if !odds.is_finite() || odds <= 1.0 {
        return Err(Error::InvalidOdds(odds));
    }
    Ok(odds)
}

/// Validate a market line value
pub fn validate_line(market: MarketType, line: f64) -> Result<f64> {
    if !line.is_finite() {
        return Err(Error::InvalidLine {
            market,
            reason: format!("line must be finite, got {}", line),
        });
    }
    if line < 0.0 {
        return Err(Error::InvalidLine {
            market,
            reason: format!("line must be non-negative, got {}", line),
        });
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_odds_valid() {
        assert!(validate_odds(1.01).is_ok());
        assert!(validate_odds(1.862).is_ok());
        assert!(validate_odds(50.0).is_ok());
    }

    #[test]
    fn test_validate_odds_invalid() {
        assert!(validate_odds(1.0).is_err());
        assert!(validate_odds(0.5).is_err());
        assert!(validate_odds(-2.0).is_err());
        assert!(validate_odds(f64::NAN).is_err());
        assert!(validate_odds(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_line() {
        assert!(validate_line(MarketType::ReceivingYards, 0.0).is_ok());
        assert!(validate_line(MarketType::ReceivingYards, 41.5).is_ok());
        assert!(validate_line(MarketType::Receptions, -0.5).is_err());
        assert!(validate_line(MarketType::Receptions, f64::NAN).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidOdds(1.0);
        assert!(err.to_string().contains("invalid odds"));

        let err = Error::IncompleteMarket {
            player: "Brandin Cooks".to_string(),
            market: MarketType::ReceivingYards,
            missing: "under",
        };
        assert_eq!(
            err.to_string(),
            "incomplete market Receiving Yards for Brandin Cooks: missing under side"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::NoGamesFound("x".to_string()).is_fatal_to_run());
        assert!(Error::Cancelled.is_fatal_to_run());
        assert!(!Error::NoMarketsFound("x".to_string()).is_fatal_to_run());
        assert!(!Error::MarketParse("x".to_string()).is_fatal_to_run());
        assert!(!Error::InvalidOdds(0.9).is_fatal_to_run());
    }
}
