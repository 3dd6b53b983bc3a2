//! Scraper configuration
//!
//! Defaults are overridden by an optional TOML file, then by environment
//! variables, then by command-line flags.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};

pub const ENV_BASE_URL: &str = "PROPS_BASE_URL";
pub const ENV_WORKERS: &str = "PROPS_WORKERS";
pub const ENV_RENDER_ENDPOINT: &str = "PROPS_RENDER_ENDPOINT";
pub const ENV_WEBDRIVER_URL: &str = "PROPS_WEBDRIVER_URL";

/// Scraper configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Site root used to resolve relative links
    pub base_url: String,
    /// Path of the league schedule page
    pub schedule_path: String,
    /// Number of game pages processed concurrently (one page session each)
    pub workers: usize,
    /// Bounded wait for a page to become ready, in seconds
    pub page_wait_secs: u64,
    /// Interval between readiness polls in milliseconds
    pub poll_interval_ms: u64,
    /// Bounded wait for a free page session, in seconds
    pub checkout_timeout_secs: u64,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Minimum delay between requests in milliseconds
    pub delay_ms: u64,
    /// Max retry attempts per request
    pub max_retries: u32,
    /// User agent string
    pub user_agent: String,
    /// Optional rendering service; the target page is passed as its `url` query parameter
    pub render_endpoint: Option<String>,
    /// WebDriver server (chromedriver, geckodriver); when set, pages are loaded in a real browser
    pub webdriver_url: Option<String>,
    /// Run the WebDriver browser without a window
    pub headless: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.pinnacle.com".to_string(),
            schedule_path: "/en/football/nfl/matchups/".to_string(),
            workers: 4,
            page_wait_secs: 10,
            poll_interval_ms: 500,
            checkout_timeout_secs: 30,
            request_timeout_secs: 30,
            delay_ms: 1000,
            max_retries: 3,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            render_endpoint: None,
            webdriver_url: None,
            headless: true,
        }
    }
}

impl ScraperConfig {
    pub fn schedule_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.schedule_path
        )
    }

    pub fn page_wait(&self) -> Duration {
        Duration::from_secs(self.page_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn checkout_timeout(&self) -> Duration {
        Duration::from_secs(self.checkout_timeout_secs)
    }

    /// Whether page sessions drive a browser over WebDriver instead of plain HTTP
    pub fn uses_browser(&self) -> bool {
        self.webdriver_url.is_some()
    }

    /// Apply `PROPS_*` environment overrides
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Ok(workers) = std::env::var(ENV_WORKERS) {
            self.workers = workers.parse().map_err(|_| {
                Error::Config(format!("{} must be a number, got {:?}", ENV_WORKERS, workers))
            })?;
        }
        if let Ok(endpoint) = std::env::var(ENV_RENDER_ENDPOINT) {
            self.render_endpoint = Some(endpoint).filter(|e| !e.is_empty());
        }
        if let Ok(url) = std::env::var(ENV_WEBDRIVER_URL) {
            self.webdriver_url = Some(url).filter(|u| !u.is_empty());
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.page_wait_secs == 0 || self.checkout_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be non-zero".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request timeout must be non-zero".to_string()));
        }
        if self.max_retries == 0 {
            return Err(Error::Config("max_retries must be at least 1".to_string()));
        }
        if self.webdriver_url.is_some() && self.render_endpoint.is_some() {
            return Err(Error::Config(
                "set either webdriver_url or render_endpoint, not both".to_string(),
            ));
        }
        if let Some(url) = &self.webdriver_url {
            if !url.starts_with("http") {
                return Err(Error::Config(format!(
                    "webdriver_url must be an http(s) URL, got {:?}",
                    url
                )));
            }
        }
        if !self.base_url.starts_with("http") {
            return Err(Error::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        Ok(())
    }
}

/// Parse configuration from TOML text
pub fn parse_config(content: &str) -> Result<ScraperConfig> {
    let config: ScraperConfig =
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ScraperConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    info!(
        path = %path.display(),
        workers = config.workers,
        page_wait_secs = config.page_wait_secs,
        "Loaded scraper config"
    );

    Ok(config)
}
