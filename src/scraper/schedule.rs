//! League schedule page parsing
//!
//! Game pages are linked as `/en/football/nfl/<home>-vs-<away>/<event id>/`.

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::models::{Game, GameId};

fn game_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:https?://[^/]+)?(/en/football/nfl/([a-z0-9-]+)/(\d+)/)")
            .expect("valid game path regex")
    })
}

/// Parse game links from the schedule page
///
/// Links are deduplicated by event id and returned sorted by id. Fails with
/// `NoGamesFound` when nothing matches.
pub fn parse_games(html: &str, base_url: &str, page_url: &str) -> Result<Vec<Game>> {
    let document = Html::parse_document(html);
    let link_selector =
        Selector::parse("a[href]").map_err(|e| Error::MarketParse(e.to_string()))?;

    let mut games: BTreeMap<u64, Game> = BTreeMap::new();

    for link in document.select(&link_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if let Some(game) = parse_game_link(href, base_url) {
            games.entry(game.id.id).or_insert(game);
        }
    }

    if games.is_empty() {
        return Err(Error::NoGamesFound(page_url.to_string()));
    }

    Ok(games.into_values().collect())
}

/// Turn one href into a game, if it is a game page link
pub fn parse_game_link(href: &str, base_url: &str) -> Option<Game> {
    let caps = game_path_pattern().captures(href)?;
    let path = caps.get(1)?.as_str();
    let slug = caps.get(2)?.as_str();
    let id = caps.get(3)?.as_str().parse::<u64>().ok()?;

    let (home, away) = slug.split_once("-vs-")?;
    if home.is_empty() || away.is_empty() {
        return None;
    }

    Some(Game {
        id: GameId {
            slug: slug.to_string(),
            id,
        },
        home_team: team_name(home),
        away_team: team_name(away),
        url: format!("{}{}", base_url.trim_end_matches('/'), path),
    })
}

/// "seattle-seahawks" -> "Seattle Seahawks"
fn team_name(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.pinnacle.com";

    #[test]
    fn test_parse_game_link() {
        let game = parse_game_link(
            "/en/football/nfl/seattle-seahawks-vs-dallas-cowboys/1582399805/#all",
            BASE,
        )
        .unwrap();

        assert_eq!(game.id.id, 1582399805);
        assert_eq!(game.id.slug, "seattle-seahawks-vs-dallas-cowboys");
        assert_eq!(game.home_team, "Seattle Seahawks");
        assert_eq!(game.away_team, "Dallas Cowboys");
        assert_eq!(
            game.url,
            "https://www.pinnacle.com/en/football/nfl/seattle-seahawks-vs-dallas-cowboys/1582399805/"
        );
    }

    #[test]
    fn test_parse_game_link_absolute() {
        let game = parse_game_link(
            "https://www.pinnacle.com/en/football/nfl/new-york-jets-vs-buffalo-bills/1590000001/",
            BASE,
        )
        .unwrap();
        assert_eq!(game.home_team, "New York Jets");
        assert_eq!(game.away_team, "Buffalo Bills");
    }

    #[test]
    fn test_parse_game_link_rejects_other_pages() {
        assert!(parse_game_link("/en/football/nfl/matchups/", BASE).is_none());
        assert!(parse_game_link("/en/football/nfl/matchups/#period:0", BASE).is_none());
        assert!(parse_game_link("/en/football/ncaa/a-vs-b/123/", BASE).is_none());
        assert!(parse_game_link("/en/football/nfl/futures/123/", BASE).is_none());
        assert!(parse_game_link("/en/football/nfl/Seattle-vs-Dallas/123/", BASE).is_none());
    }

    #[test]
    fn test_parse_games_dedupes_and_sorts() {
        let html = r#"
        <html><body>
            <a href="/en/football/nfl/matchups/">Matchups</a>
            <a href="/en/football/nfl/seattle-seahawks-vs-dallas-cowboys/1582399805/">SEA v DAL</a>
            <a href="/en/football/nfl/seattle-seahawks-vs-dallas-cowboys/1582399805/#all">+120</a>
            <a href="/en/football/nfl/green-bay-packers-vs-chicago-bears/1582399700/">GB v CHI</a>
        </body></html>
        "#;

        let games = parse_games(html, BASE, "test://schedule").unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].id.id, 1582399700);
        assert_eq!(games[1].id.id, 1582399805);
    }

    #[test]
    fn test_parse_games_none() {
        let html = r#"<html><body><a href="/en/basketball/nba/">NBA</a></body></html>"#;
        let err = parse_games(html, BASE, "test://schedule").unwrap_err();
        assert!(matches!(err, Error::NoGamesFound(url) if url == "test://schedule"));
    }

    #[test]
    fn test_team_name() {
        assert_eq!(team_name("san-francisco-49ers"), "San Francisco 49ers");
        assert_eq!(team_name("dallas-cowboys"), "Dallas Cowboys");
    }
}
