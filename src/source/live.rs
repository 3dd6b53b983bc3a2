//! Live scrape of the sportsbook
//!
//! The schedule page is read with one pooled session, then game pages are
//! processed by a bounded set of workers, each holding its own session for
//! the duration of one game.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use super::{cancelled, QuoteEvent, QuoteSource, SourceReport};
use crate::config::ScraperConfig;
use crate::error::{Error, Result};
use crate::models::{Game, Player};
use crate::scraper::{
    discover_games, discover_panels, extract_market_panel, load_with_retry, PageSession,
    SessionPool,
};

/// Per-game counts
#[derive(Debug, Default)]
struct GameOutcome {
    panels_found: usize,
    panels_skipped: usize,
    lines_skipped: usize,
    quotes_emitted: usize,
}

pub struct LiveScrapeSource<S> {
    pool: SessionPool<S>,
    config: ScraperConfig,
    games: Option<Vec<Game>>,
}

impl<S: PageSession + 'static> LiveScrapeSource<S> {
    pub fn new(pool: SessionPool<S>, config: ScraperConfig) -> Self {
        Self {
            pool,
            config,
            games: None,
        }
    }

    /// Skip schedule discovery and scrape exactly these games
    pub fn with_games(mut self, games: Vec<Game>) -> Self {
        self.games = Some(games);
        self
    }

    async fn discover(&self) -> Result<Vec<Game>> {
        if let Some(games) = &self.games {
            return Ok(games.clone());
        }
        let mut session = self.pool.checkout().await?;
        discover_games(&mut *session, &self.config).await
    }
}

#[async_trait]
impl<S: PageSession + 'static> QuoteSource for LiveScrapeSource<S> {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn run(
        &mut self,
        sink: mpsc::Sender<QuoteEvent>,
        cancel: watch::Receiver<bool>,
    ) -> Result<SourceReport> {
        let games = tokio::select! {
            biased;
            _ = cancelled(cancel.clone()) => return Err(Error::Cancelled),
            games = self.discover() => games?,
        };

        let mut report = SourceReport {
            games_discovered: games.len(),
            ..Default::default()
        };

        let workers = self.config.workers.min(self.pool.size()).max(1);
        tracing::info!(
            "Scraping {} games with {} workers",
            games.len(),
            workers
        );

        // Games that never got a session, with the timeout that expired
        let mut starved = 0;
        let mut checkout_timeout = None;

        let mut pending = games.into_iter();
        let mut set: JoinSet<(Game, Result<GameOutcome>)> = JoinSet::new();

        loop {
            while set.len() < workers {
                let Some(game) = pending.next() else {
                    break;
                };
                let pool = self.pool.clone();
                let config = self.config.clone();
                let sink = sink.clone();
                let cancel = cancel.clone();

                set.spawn(async move {
                    let outcome = tokio::select! {
                        biased;
                        _ = cancelled(cancel) => Err(Error::Cancelled),
                        outcome = scrape_game(&pool, &game, &config, &sink) => outcome,
                    };
                    (game, outcome)
                });
            }

            let joined = tokio::select! {
                biased;
                _ = cancelled(cancel.clone()) => {
                    tracing::warn!("Cancellation requested, stopping {} workers", set.len());
                    set.abort_all();
                    while set.join_next().await.is_some() {}
                    report.cancelled = true;
                    break;
                }
                joined = set.join_next() => joined,
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((game, Ok(outcome))) => {
                    report.games_processed += 1;
                    report.panels_found += outcome.panels_found;
                    report.panels_skipped += outcome.panels_skipped;
                    report.lines_skipped += outcome.lines_skipped;
                    report.quotes_emitted += outcome.quotes_emitted;
                    tracing::info!(
                        "{}: {} panels, {} quotes, {} skipped",
                        game.matchup(),
                        outcome.panels_found,
                        outcome.quotes_emitted,
                        outcome.panels_skipped
                    );
                }
                Ok((_, Err(Error::Cancelled))) => {
                    report.cancelled = true;
                }
                Ok((game, Err(e))) => {
                    report.games_failed += 1;
                    match &e {
                        Error::NoMarketsFound(_) => tracing::warn!(
                            "{}: page loaded but no prop panels matched (site layout may have changed)",
                            game.matchup()
                        ),
                        Error::DiscoveryTimeout { .. } => tracing::warn!(
                            "{}: page never became ready, skipping",
                            game.matchup()
                        ),
                        Error::SessionUnavailable(waited) => {
                            starved += 1;
                            checkout_timeout = Some(*waited);
                            tracing::warn!(
                                "{}: no browser session free after {:?}",
                                game.matchup(),
                                waited
                            );
                        }
                        _ => tracing::warn!("{}: {}", game.matchup(), e),
                    }
                }
                Err(join_error) => {
                    report.games_failed += 1;
                    tracing::warn!("Worker failed: {}", join_error);
                }
            }
        }

        if let Some(waited) = checkout_timeout {
            if !report.cancelled
                && report.games_processed == 0
                && starved == report.games_discovered
            {
                tracing::error!("Every game failed to get a session, aborting run");
                return Err(Error::SessionUnavailable(waited));
            }
        }

        Ok(report)
    }
}

/// Scrape every panel of one game page into the sink
async fn scrape_game<S: PageSession + 'static>(
    pool: &SessionPool<S>,
    game: &Game,
    config: &ScraperConfig,
    sink: &mpsc::Sender<QuoteEvent>,
) -> Result<GameOutcome> {
    let mut session = pool.checkout().await?;
    tracing::debug!("Scraping {} ({})", game.matchup(), game.url);

    let panels = load_with_retry(&mut *session, &game.url, config, |html| {
        discover_panels(html, &game.url)
    })
    .await?;
    drop(session);

    let mut outcome = GameOutcome {
        panels_found: panels.len(),
        ..Default::default()
    };

    for panel in panels {
        let extracted = match extract_market_panel(&panel.html) {
            Ok(extracted) => extracted,
            Err(e) => {
                outcome.panels_skipped += 1;
                tracing::warn!("Skipping panel {} ({}): {}", panel.player, panel.market, e);
                continue;
            }
        };

        outcome.lines_skipped += extracted.skipped_lines;

        let Some(quote) = extracted.main_quote() else {
            outcome.panels_skipped += 1;
            continue;
        };

        let player = Player::new(extracted.player).in_game(game.id.clone());
        sink.send((player, quote))
            .await
            .map_err(|_| Error::Cancelled)?;
        outcome.quotes_emitted += 1;
    }

    Ok(outcome)
}
