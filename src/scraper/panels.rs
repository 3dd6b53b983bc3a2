//! Player prop panel discovery on a game page

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use super::market::{own_text, parse_header, split_header};
use crate::error::{Error, Result};
use crate::models::MarketType;

/// One player+market panel found on a game page
#[derive(Debug, Clone, PartialEq)]
pub struct PanelLocation {
    pub player: String,
    pub market: MarketType,
    /// Outer markup of the panel subtree
    pub html: String,
}

/// Find every prop panel on a game page
///
/// A panel is the nearest ancestor of a `"<name> (<market>)"` header that
/// holds odds buttons and no other header. Fails with `NoMarketsFound` when the
/// page has no recognizable headers.
pub fn discover_panels(html: &str, page_url: &str) -> Result<Vec<PanelLocation>> {
    let document = Html::parse_document(html);
    let any_selector = Selector::parse("*").map_err(|e| Error::MarketParse(e.to_string()))?;
    let button_selector = Selector::parse("button, [role='button']")
        .map_err(|e| Error::MarketParse(e.to_string()))?;

    // Unknown markets still bound their neighbours' panels
    let header_elements: Vec<ElementRef> = document
        .select(&any_selector)
        .filter(|el| split_header(&own_text(el)).is_some())
        .collect();
    let header_ids: HashSet<_> = header_elements.iter().map(|el| el.id()).collect();

    let headers: Vec<(ElementRef, String, MarketType)> = header_elements
        .into_iter()
        .filter_map(|el| {
            parse_header(&own_text(&el)).map(|(player, market)| (el, player, market))
        })
        .collect();

    if headers.is_empty() {
        return Err(Error::NoMarketsFound(page_url.to_string()));
    }

    let mut panels = Vec::with_capacity(headers.len());
    for (header, player, market) in headers {
        let mut panel: Option<ElementRef> = None;

        for ancestor in header.ancestors().filter_map(ElementRef::wrap) {
            let headers_inside = ancestor
                .descendants()
                .filter(|node| header_ids.contains(&node.id()))
                .count();
            if headers_inside > 1 {
                break;
            }
            panel = Some(ancestor);
            if ancestor.select(&button_selector).next().is_some() {
                break;
            }
        }

        match panel {
            Some(panel) => panels.push(PanelLocation {
                player,
                market,
                html: panel.html(),
            }),
            None => tracing::debug!("Header for {} ({}) has no enclosing panel", player, market),
        }
    }

    tracing::debug!("Discovered {} panels on {}", panels.len(), page_url);
    Ok(panels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::market::extract_market_panel;

    const GAME_PAGE: &str = r#"
    <html><body>
      <div id="markets">
        <div data-test-id="Collapse" class="a1">
          <div class="t1"><span class="">Brandin Cooks (Receiving Yards)</span></div>
          <div class="c1">
            <button title="Over 41.5 ReceivingYards"><span>Over 41.5 ReceivingYards</span><span>1.862</span></button>
            <button title="Under 41.5 ReceivingYards"><span>Under 41.5 ReceivingYards</span><span>1.877</span></button>
          </div>
        </div>
        <div data-test-id="Collapse" class="a1">
          <div class="t1"><span class="">Brandin Cooks (Anytime TD)</span></div>
          <div class="c1">
            <button title="Yes"><span>Yes</span><span>3.05</span></button>
            <button title="No"><span>No</span><span>1.35</span></button>
          </div>
        </div>
        <div data-test-id="Collapse" class="a1">
          <div class="t1"><span class="">Dak Prescott (Passing Yards)</span></div>
        </div>
        <div data-test-id="Collapse" class="a1">
          <div class="t1"><span class="">Brandin Cooks (Longest Reception)</span></div>
          <div class="c1"><button title="Over 15.5"><span>1.9</span></button></div>
        </div>
      </div>
    </body></html>
    "#;

    #[test]
    fn test_discover_panels() {
        let panels = discover_panels(GAME_PAGE, "test://game").unwrap();
        assert_eq!(panels.len(), 3);

        assert_eq!(panels[0].player, "Brandin Cooks");
        assert_eq!(panels[0].market, MarketType::ReceivingYards);
        assert!(panels[0].html.contains("Under 41.5"));
        assert!(!panels[0].html.contains("Anytime TD"));

        assert_eq!(panels[1].market, MarketType::AnytimeTd);
        assert!(!panels[1].html.contains("ReceivingYards"));
    }

    #[test]
    fn test_panel_without_buttons_stays_scoped() {
        let panels = discover_panels(GAME_PAGE, "test://game").unwrap();
        let passing = &panels[2];
        assert_eq!(passing.player, "Dak Prescott");
        assert!(!passing.html.contains("Brandin Cooks"));
        assert!(matches!(
            extract_market_panel(&passing.html),
            Err(Error::MarketParse(_))
        ));
    }

    #[test]
    fn test_discovered_panels_extract() {
        let panels = discover_panels(GAME_PAGE, "test://game").unwrap();
        let receiving = extract_market_panel(&panels[0].html).unwrap();
        assert_eq!(receiving.quotes[0].line, Some(41.5));
        let td = extract_market_panel(&panels[1].html).unwrap();
        assert_eq!(td.quotes[0].over, 3.05);
    }

    #[test]
    fn test_no_markets() {
        let html = r#"<html><body><button>Log in</button></body></html>"#;
        assert!(matches!(
            discover_panels(html, "test://game"),
            Err(Error::NoMarketsFound(_))
        ));
    }
}
