//! Two-way odds to implied probability
//!
//! The bookmaker's raw implied probabilities for the two sides of a market
//! sum to more than 1 (the margin). The share attributed to the yes/over side
//! is recovered by normalizing them back to 1:
//!
//! ```text
//! p = (1/d_yes) / (1/d_yes + 1/d_no)
//!
//! Where:
//!     d_yes = decimal odds for Yes/Over
//!     d_no  = decimal odds for No/Under
//! ```

use crate::error::{validate_odds, Error, Result};

/// Normalized implied probability of the yes/over side
///
/// # Arguments
/// * `yes` - Decimal odds for Yes/Over (> 1.0)
/// * `no` - Decimal odds for No/Under (> 1.0)
///
/// # Examples
/// ```
/// use nfl_props::core::odds::implied_probability;
/// let p = implied_probability(1.862, 1.877).unwrap();
/// assert!((p - 0.5020).abs() < 0.0001);
/// ```
pub fn implied_probability(yes: f64, no: f64) -> Result<f64> {
    let yes = validate_odds(yes)?;
    let no = validate_odds(no)?;

    let raw_yes = 1.0 / yes;
    let raw_no = 1.0 / no;
    Ok(raw_yes / (raw_yes + raw_no))
}

/// Bookmaker margin of a two-way market (sum of raw implied probabilities minus 1)
pub fn overround(yes: f64, no: f64) -> Result<f64> {
    let yes = validate_odds(yes)?;
    let no = validate_odds(no)?;
    Ok(1.0 / yes + 1.0 / no - 1.0)
}

/// Convert American (money line) odds to decimal odds
///
/// `+150` pays 150 per 100 staked, `-116` needs 116 staked to win 100.
///
/// # Examples
/// ```
/// use nfl_props::core::odds::american_to_decimal;
/// assert!((american_to_decimal(150.0).unwrap() - 2.5).abs() < 1e-9);
/// assert!((american_to_decimal(-200.0).unwrap() - 1.5).abs() < 1e-9);
/// ```
pub fn american_to_decimal(american: f64) -> Result<f64> {
    if !american.is_finite() || american.abs() < 100.0 {
        return Err(Error::InvalidOdds(american));
    }

    let decimal = if american > 0.0 {
        1.0 + american / 100.0
    } else {
        1.0 + 100.0 / -american
    };
    validate_odds(decimal)
}

/// Parse a decimal price as displayed on an odds button
pub fn parse_decimal_odds(text: &str) -> Result<f64> {
    let cleaned = text.trim().replace(',', "");
    let odds = cleaned
        .parse::<f64>()
        .map_err(|_| Error::MarketParse(format!("unparsable price {:?}", text.trim())))?;
    validate_odds(odds)
}

/// Parse a price as displayed on an odds button, in either format
///
/// A leading sign marks an American price (`+105`, `-116`), which is
/// converted to decimal; anything else is read as decimal odds.
pub fn parse_price_text(text: &str) -> Result<f64> {
    let cleaned = text.trim().replace(',', "").replace('\u{2212}', "-");
    if cleaned.starts_with('+') || cleaned.starts_with('-') {
        let american = cleaned
            .trim_start_matches('+')
            .parse::<f64>()
            .map_err(|_| Error::MarketParse(format!("unparsable price {:?}", text.trim())))?;
        return american_to_decimal(american);
    }
    parse_decimal_odds(&cleaned)
}

/// Parse American odds out of a label such as "Money Line -116"
pub fn parse_american_label(label: &str) -> Result<f64> {
    let token = label
        .split_whitespace()
        .last()
        .ok_or_else(|| Error::MarketParse("empty money line label".to_string()))?;
    let american = token
        .trim_start_matches('+')
        .parse::<f64>()
        .map_err(|_| Error::MarketParse(format!("unparsable money line {:?}", label)))?;
    american_to_decimal(american)
}
