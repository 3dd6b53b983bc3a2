//! Player prop panel parser
//!
//! A panel looks like:
//!
//! ```text
//! <span>Brandin Cooks (Receiving Yards)</span>
//! <button title="Over 41.5 ReceivingYards" aria-label="Money Line -116">
//!   <span>Over 41.5 ReceivingYards</span><span>1.862</span>
//! </button>
//! <button title="Under 41.5 ReceivingYards" aria-label="Money Line -114">...</button>
//! ```
//!
//! Only titles, aria-labels and text are used; class names are generated by
//! the site's build and change without notice.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

use crate::core::odds::{implied_probability, parse_american_label, parse_price_text};
use crate::error::{Error, Result};
use crate::models::{MarketQuote, MarketType};

/// Quotes parsed from one panel
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPanel {
    pub player: String,
    pub market: MarketType,
    /// One quote per line offered in the panel
    pub quotes: Vec<MarketQuote>,
    /// Lines dropped because only one side was priced
    pub skipped_lines: usize,
}

impl ExtractedPanel {
    /// The line priced closest to a coin flip, taken as the main line
    pub fn main_quote(&self) -> Option<MarketQuote> {
        self.quotes
            .iter()
            .filter_map(|q| implied_probability(q.over, q.under).ok().map(|p| (q, (p - 0.5).abs())))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(q, _)| *q)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    Over(f64),
    Under(f64),
    Yes,
    No,
}

/// One priced button
#[derive(Debug, Clone, Copy, PartialEq)]
struct Outcome {
    side: Side,
    odds: f64,
}

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\S.*?)\s*\(([^()]+)\)\s*$").expect("valid panel header regex")
    })
}

/// Split `"<Player Name> (<Market Label>)"` into name and raw label
pub fn split_header(text: &str) -> Option<(String, String)> {
    let caps = header_pattern().captures(text)?;
    Some((caps[1].to_string(), caps[2].trim().to_string()))
}

/// Parse a panel header with a known market label
pub fn parse_header(text: &str) -> Option<(String, MarketType)> {
    let (name, label) = split_header(text)?;
    let market = MarketType::from_label(&label)?;
    Some((name, market))
}

/// Text directly owned by an element, excluding its descendants' text
pub(crate) fn own_text(element: &ElementRef) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|t| t.to_string())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Extract market quotes from a single panel's markup
///
/// Fails with `MarketParse` when the header or prices do not match, with
/// `IncompleteMarket` when only one side of the market is offered, and with
/// `InvalidOdds` when a price is not above 1.0.
pub fn extract_market_panel(html: &str) -> Result<ExtractedPanel> {
    let fragment = Html::parse_fragment(html);
    let any_selector = Selector::parse("*").map_err(|e| Error::MarketParse(e.to_string()))?;
    let button_selector = Selector::parse("button, [role='button']")
        .map_err(|e| Error::MarketParse(e.to_string()))?;

    let (player, label) = fragment
        .select(&any_selector)
        .find_map(|el| split_header(&own_text(&el)))
        .ok_or_else(|| Error::MarketParse("no \"<name> (<market>)\" header".to_string()))?;

    let market = MarketType::from_label(&label)
        .ok_or_else(|| Error::MarketParse(format!("unknown market label {:?}", label)))?;

    let mut outcomes = Vec::new();
    for button in fragment.select(&button_selector) {
        if let Some(outcome) = parse_button(&button)? {
            outcomes.push(outcome);
        }
    }

    if outcomes.is_empty() {
        return Err(Error::MarketParse(format!(
            "no priced outcomes for {} ({})",
            player, market
        )));
    }

    let (quotes, skipped_lines) = if market.is_binary() {
        (vec![pair_binary(&player, market, &outcomes)?], 0)
    } else {
        pair_over_under(&player, market, &outcomes)?
    };

    tracing::debug!(
        "Extracted {} quote(s) for {} ({})",
        quotes.len(),
        player,
        market
    );

    Ok(ExtractedPanel {
        player,
        market,
        quotes,
        skipped_lines,
    })
}

/// Parse one odds button; `None` for buttons that do not name a side
fn parse_button(button: &ElementRef) -> Result<Option<Outcome>> {
    let attrs = button.value();
    let texts: Vec<String> = button
        .text()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let label_text = texts
        .iter()
        .find(|t| t.chars().any(|c| c.is_alphabetic()))
        .cloned();

    let side = [attrs.attr("title").map(str::to_string), label_text, attrs.attr("aria-label").map(str::to_string)]
        .into_iter()
        .flatten()
        .find_map(|text| parse_side(&text).transpose())
        .transpose()?;

    let Some(side) = side else {
        return Ok(None);
    };

    let price = texts
        .iter()
        .filter(|t| !t.chars().any(|c| c.is_alphabetic()))
        .last();

    let money_line = attrs.attr("aria-label").map(parse_american_label);

    let odds = match (price.map(|text| parse_price_text(text)), money_line) {
        (Some(Ok(odds)), _) => odds,
        (Some(Err(e)), Some(Ok(odds))) => {
            tracing::debug!("Price text rejected ({}), using money line {}", e, odds);
            odds
        }
        (Some(Err(e)), _) => return Err(e),
        (None, Some(money_line)) => money_line?,
        (None, None) => {
            return Err(Error::MarketParse(format!(
                "no price for {:?}",
                attrs.attr("title").unwrap_or_default()
            )))
        }
    };

    Ok(Some(Outcome { side, odds }))
}

/// Side and line from a label such as "Over 41.5 ReceivingYards" or "Yes"
fn parse_side(text: &str) -> Result<Option<Side>> {
    let mut tokens = text.split_whitespace();
    let Some(first) = tokens.next() else {
        return Ok(None);
    };

    let side = match first.to_ascii_lowercase().as_str() {
        "yes" => Side::Yes,
        "no" => Side::No,
        word @ ("over" | "under") => {
            let line = tokens
                .next()
                .and_then(|t| t.parse::<f64>().ok())
                .ok_or_else(|| Error::MarketParse(format!("missing line in {:?}", text)))?;
            if word == "over" {
                Side::Over(line)
            } else {
                Side::Under(line)
            }
        }
        _ => return Ok(None),
    };

    Ok(Some(side))
}

fn pair_binary(player: &str, market: MarketType, outcomes: &[Outcome]) -> Result<MarketQuote> {
    let yes = outcomes.iter().rev().find(|o| o.side == Side::Yes);
    let no = outcomes.iter().rev().find(|o| o.side == Side::No);

    match (yes, no) {
        (Some(yes), Some(no)) => MarketQuote::binary(market, yes.odds, no.odds),
        (None, Some(_)) => Err(Error::IncompleteMarket {
            player: player.to_string(),
            market,
            missing: "yes",
        }),
        (Some(_), None) => Err(Error::IncompleteMarket {
            player: player.to_string(),
            market,
            missing: "no",
        }),
        (None, None) => Err(Error::MarketParse(format!(
            "no yes/no outcomes for {} ({})",
            player, market
        ))),
    }
}

/// Complete lines in ascending order, plus the count of one-sided lines dropped
fn pair_over_under(
    player: &str,
    market: MarketType,
    outcomes: &[Outcome],
) -> Result<(Vec<MarketQuote>, usize)> {
    // (line, over odds, under odds)
    let mut lines: Vec<(f64, Option<f64>, Option<f64>)> = Vec::new();

    for outcome in outcomes {
        let (line, is_over) = match outcome.side {
            Side::Over(line) => (line, true),
            Side::Under(line) => (line, false),
            Side::Yes | Side::No => continue,
        };

        let idx = match lines.iter().position(|(l, _, _)| (*l - line).abs() < 1e-9) {
            Some(idx) => idx,
            None => {
                lines.push((line, None, None));
                lines.len() - 1
            }
        };

        if is_over {
            lines[idx].1 = Some(outcome.odds);
        } else {
            lines[idx].2 = Some(outcome.odds);
        }
    }

    if lines.is_empty() {
        return Err(Error::MarketParse(format!(
            "no over/under outcomes for {} ({})",
            player, market
        )));
    }

    lines.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut quotes = Vec::new();
    let mut skipped = 0;
    let mut missing = "under";
    for (line, over, under) in lines {
        let side = match (over, under) {
            (Some(over), Some(under)) => {
                quotes.push(MarketQuote::over_under(market, over, under, line)?);
                continue;
            }
            (None, _) => "over",
            (_, None) => "under",
        };
        tracing::debug!(
            "Dropping {} ({}) line {}: no {} price",
            player,
            market,
            line,
            side
        );
        missing = side;
        skipped += 1;
    }

    if quotes.is_empty() {
        return Err(Error::IncompleteMarket {
            player: player.to_string(),
            market,
            missing,
        });
    }

    Ok((quotes, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECEIVING_PANEL: &str = r#"<div data-collapsed="false" data-test-id="Collapse" class="style_primary__uMCOh style_marketGroup__rIPR4" style="order: 1;"><div class="style_title__2wOdP collapse-title style_collapseTitle__3EXI2"><span class="">Brandin Cooks (Receiving Yards)</span><span class="style_icon__3XP0a collapse-icon style_collapseIcon__GYHPV"><i class="icon-chevron-right-sml style_arrow__2EsIx style_expanded__3VpHF"></i></span></div><div class="style_content__23pgc collapse-content"><div class="style_buttons__2X8Y7 style_specials__13Hfh style_default__8VH8n style_twoColumns__Cdpo-"><div class="style_buttonRow__33Vfj"><div class="style_button-wrapper__2u2GV"><button title="Over 41.5 ReceivingYards" aria-label="Money Line -116" class="market-btn style_button__G9pbN style_pill__2U30o style_horizontal__3vGxa"><span class="style_label__3BBxD">Over 41.5 ReceivingYards</span><span class="style_price__3Haa9">1.862</span></button></div><div class="style_button-wrapper__2u2GV"><button title="Under 41.5 ReceivingYards" aria-label="Money Line -114" class="market-btn style_button__G9pbN style_pill__2U30o style_horizontal__3vGxa"><span class="style_label__3BBxD">Under 41.5 ReceivingYards</span><span class="style_price__3Haa9">1.877</span></button></div></div></div></div></div>"#;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Brandin Cooks (Receiving Yards)"),
            Some(("Brandin Cooks".to_string(), MarketType::ReceivingYards))
        );
        assert_eq!(
            parse_header("  Amon-Ra St. Brown (Anytime TD) "),
            Some(("Amon-Ra St. Brown".to_string(), MarketType::AnytimeTd))
        );
        assert_eq!(parse_header("Brandin Cooks (Longest Reception)"), None);
        assert_eq!(parse_header("Brandin Cooks"), None);
        assert_eq!(parse_header("(Receptions)"), None);
    }

    #[test]
    fn test_extract_receiving_yards_panel() {
        let panel = extract_market_panel(RECEIVING_PANEL).unwrap();
        assert_eq!(panel.player, "Brandin Cooks");
        assert_eq!(panel.market, MarketType::ReceivingYards);
        assert_eq!(panel.quotes.len(), 1);

        let quote = panel.quotes[0];
        assert_eq!(quote.over, 1.862);
        assert_eq!(quote.under, 1.877);
        assert_eq!(quote.line, Some(41.5));
    }

    #[test]
    fn test_extract_ignores_class_names() {
        // Same panel with every class renamed
        let renamed = RECEIVING_PANEL.replace("style_", "css_x9_");
        let panel = extract_market_panel(&renamed).unwrap();
        assert_eq!(panel.quotes[0].line, Some(41.5));
    }

    #[test]
    fn test_extract_anytime_td_panel() {
        let html = r#"
        <div>
            <div><span>Brandin Cooks (Anytime TD)</span></div>
            <button title="Yes" aria-label="Money Line +200"><span>Yes</span><span>3.050</span></button>
            <button title="No" aria-label="Money Line -280"><span>No</span><span>1.350</span></button>
        </div>"#;

        let panel = extract_market_panel(html).unwrap();
        assert_eq!(panel.market, MarketType::AnytimeTd);
        let quote = panel.quotes[0];
        assert_eq!(quote.over, 3.05);
        assert_eq!(quote.under, 1.35);
        assert_eq!(quote.line, None);
    }

    #[test]
    fn test_extract_missing_under_is_incomplete() {
        let html = r#"
        <div>
            <span>Brandin Cooks (Receiving Yards)</span>
            <button title="Over 41.5 ReceivingYards"><span>Over 41.5 ReceivingYards</span><span>1.862</span></button>
        </div>"#;

        let err = extract_market_panel(html).unwrap_err();
        match err {
            Error::IncompleteMarket {
                player,
                market,
                missing,
            } => {
                assert_eq!(player, "Brandin Cooks");
                assert_eq!(market, MarketType::ReceivingYards);
                assert_eq!(missing, "under");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extract_missing_no_is_incomplete() {
        let html = r#"
        <div>
            <span>Brandin Cooks (Anytime TD)</span>
            <button title="Yes"><span>Yes</span><span>3.05</span></button>
        </div>"#;

        assert!(matches!(
            extract_market_panel(html),
            Err(Error::IncompleteMarket { missing: "no", .. })
        ));
    }

    #[test]
    fn test_extract_price_falls_back_to_money_line() {
        let html = r#"
        <div>
            <span>Brandin Cooks (Receptions)</span>
            <button title="Over 3.5 Receptions" aria-label="Money Line -116"><span>Over 3.5 Receptions</span></button>
            <button title="Under 3.5 Receptions" aria-label="Money Line -114"><span>Under 3.5 Receptions</span></button>
        </div>"#;

        let quote = extract_market_panel(html).unwrap().quotes[0];
        assert!((quote.over - 1.862).abs() < 0.001);
        assert!((quote.under - 1.877).abs() < 0.001);
        assert_eq!(quote.line, Some(3.5));
    }

    #[test]
    fn test_extract_multiple_lines() {
        let html = r#"
        <div>
            <span>Dak Prescott (Passing Yards)</span>
            <button title="Over 265.5 PassingYards"><span>1.95</span></button>
            <button title="Under 265.5 PassingYards"><span>1.80</span></button>
            <button title="Over 250.5 PassingYards"><span>1.60</span></button>
            <button title="Under 250.5 PassingYards"><span>2.30</span></button>
            <button title="Over 280.5 PassingYards"><span>2.40</span></button>
        </div>"#;

        let panel = extract_market_panel(html).unwrap();
        assert_eq!(panel.quotes.len(), 2);
        assert_eq!(panel.quotes[0].line, Some(250.5));
        assert_eq!(panel.quotes[1].line, Some(265.5));
        assert_eq!(panel.main_quote().unwrap().line, Some(265.5));
        // 280.5 has no under price
        assert_eq!(panel.skipped_lines, 1);
    }

    #[test]
    fn test_extract_complete_panel_skips_nothing() {
        let panel = extract_market_panel(RECEIVING_PANEL).unwrap();
        assert_eq!(panel.skipped_lines, 0);
    }

    #[test]
    fn test_extract_plus_money_price_text() {
        let html = r#"
        <div>
            <span>Brandin Cooks (Receptions)</span>
            <button title="Over 3.5 Receptions"><span>Over 3.5 Receptions</span><span>+105</span></button>
            <button title="Under 3.5 Receptions"><span>Under 3.5 Receptions</span><span>+115</span></button>
        </div>"#;

        let quote = extract_market_panel(html).unwrap().quotes[0];
        assert!((quote.over - 2.05).abs() < 1e-9);
        assert!((quote.under - 2.15).abs() < 1e-9);
        assert_eq!(quote.line, Some(3.5));
    }

    #[test]
    fn test_extract_minus_money_price_text() {
        let html = r#"
        <div>
            <span>Brandin Cooks (Receptions)</span>
            <button title="Over 3.5 Receptions"><span>Over 3.5 Receptions</span><span>-116</span></button>
            <button title="Under 3.5 Receptions"><span>Under 3.5 Receptions</span><span>-114</span></button>
        </div>"#;

        let quote = extract_market_panel(html).unwrap().quotes[0];
        assert!((quote.over - 1.862).abs() < 0.001);
        assert!((quote.under - 1.877).abs() < 0.001);
    }

    #[test]
    fn test_extract_bad_price_text_uses_money_line() {
        let html = r#"
        <div>
            <span>Brandin Cooks (Receptions)</span>
            <button title="Over 3.5 Receptions" aria-label="Money Line -116"><span>Over 3.5 Receptions</span><span>--</span></button>
            <button title="Under 3.5 Receptions" aria-label="Money Line -114"><span>Under 3.5 Receptions</span><span>1.00</span></button>
        </div>"#;

        let quote = extract_market_panel(html).unwrap().quotes[0];
        assert!((quote.over - 1.862).abs() < 0.001);
        assert!((quote.under - 1.877).abs() < 0.001);
    }

    #[test]
    fn test_extract_no_header() {
        let html = r#"<div><button title="Yes"><span>1.5</span></button></div>"#;
        assert!(matches!(
            extract_market_panel(html),
            Err(Error::MarketParse(_))
        ));
    }

    #[test]
    fn test_extract_unknown_market() {
        let html = r#"
        <div>
            <span>Brandin Cooks (Longest Reception)</span>
            <button title="Over 15.5 LongestReception"><span>1.9</span></button>
            <button title="Under 15.5 LongestReception"><span>1.9</span></button>
        </div>"#;
        let err = extract_market_panel(html).unwrap_err();
        assert!(err.to_string().contains("Longest Reception"));
    }

    #[test]
    fn test_extract_no_price() {
        let html = r#"
        <div>
            <span>Brandin Cooks (Receptions)</span>
            <button title="Over 3.5 Receptions"><span>Over 3.5 Receptions</span></button>
            <button title="Under 3.5 Receptions"><span>Under 3.5 Receptions</span></button>
        </div>"#;
        assert!(matches!(
            extract_market_panel(html),
            Err(Error::MarketParse(_))
        ));
    }

    #[test]
    fn test_extract_invalid_price() {
        let html = r#"
        <div>
            <span>Brandin Cooks (Receptions)</span>
            <button title="Over 3.5 Receptions"><span>1.00</span></button>
            <button title="Under 3.5 Receptions"><span>1.90</span></button>
        </div>"#;
        assert!(matches!(
            extract_market_panel(html),
            Err(Error::InvalidOdds(_))
        ));
    }

    #[test]
    fn test_parse_side() {
        assert_eq!(
            parse_side("Over 41.5 ReceivingYards").unwrap(),
            Some(Side::Over(41.5))
        );
        assert_eq!(parse_side("Under 0.5 Interceptions").unwrap(), Some(Side::Under(0.5)));
        assert_eq!(parse_side("Yes").unwrap(), Some(Side::Yes));
        assert_eq!(parse_side("no").unwrap(), Some(Side::No));
        assert_eq!(parse_side("Money Line -116").unwrap(), None);
        assert!(parse_side("Over").is_err());
    }
}
