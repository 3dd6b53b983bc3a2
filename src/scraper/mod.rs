//! Sportsbook page scraping
//!
//! Discovers game pages from the league schedule, player prop panels on each
//! game page, and parses each panel into market quotes.
//!
//! # Example
//!
//! ```no_run
//! use nfl_props::config::ScraperConfig;
//! use nfl_props::scraper::{discover_games, HttpSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ScraperConfig::default();
//!     let mut session = HttpSession::new(config.clone())?;
//!
//!     let games = discover_games(&mut session, &config).await?;
//!     println!("Found {} games", games.len());
//!
//!     Ok(())
//! }
//! ```

mod client;
mod market;
mod panels;
mod pool;
mod schedule;
mod webdriver;

pub use client::{is_page_ready, wait_until_ready, HttpSession, PageSession};
pub use market::{extract_market_panel, parse_header, split_header, ExtractedPanel};
pub use panels::{discover_panels, PanelLocation};
pub use pool::{PooledSession, SessionPool};
pub use schedule::{parse_game_link, parse_games};
pub use webdriver::WebDriverSession;

use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use crate::models::Game;

/// Load a page and wait for it to be ready, retrying once on failure
///
/// `locate` runs on the ready markup; a `DiscoveryTimeout`, `NoGamesFound` or
/// `NoMarketsFound` from either the wait or `locate` triggers one re-navigation.
pub async fn load_with_retry<S, T, F>(
    session: &mut S,
    url: &str,
    config: &ScraperConfig,
    locate: F,
) -> Result<T>
where
    S: PageSession + ?Sized,
    F: Fn(&str) -> Result<T>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = async {
            session.navigate(url).await?;
            let html =
                wait_until_ready(&mut *session, url, config.page_wait(), config.poll_interval()).await?;
            locate(&html)
        }
        .await;

        match outcome {
            Err(
                e @ (Error::DiscoveryTimeout { .. }
                | Error::NoGamesFound(_)
                | Error::NoMarketsFound(_)),
            ) if attempt < 2 => {
                tracing::warn!("{} (retrying once)", e);
            }
            other => return other,
        }
    }
}

/// Discover this week's games from the schedule page
pub async fn discover_games<S: PageSession + ?Sized>(
    session: &mut S,
    config: &ScraperConfig,
) -> Result<Vec<Game>> {
    let url = config.schedule_url();
    tracing::info!("Discovering games: {}", url);

    let games = load_with_retry(session, &url, config, |html| {
        parse_games(html, &config.base_url, &url)
    })
    .await?;

    tracing::info!("Found {} games", games.len());
    Ok(games)
}
