//! Browser page session over WebDriver
//!
//! Game pages fill their markets in with client-side scripts. A WebDriver
//! session loads them in a real browser, so `page_source` returns the DOM as
//! it currently stands and readiness polling sees content appear.

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};

use super::client::PageSession;
use crate::config::ScraperConfig;
use crate::error::{Error, Result};

pub struct WebDriverSession {
    client: Client,
    delay: Duration,
    last_navigation: Option<Instant>,
}

impl WebDriverSession {
    /// Start a browser on the configured WebDriver server
    pub async fn connect(config: &ScraperConfig) -> Result<Self> {
        let url = config
            .webdriver_url
            .as_deref()
            .ok_or_else(|| Error::Config("webdriver_url is not set".to_string()))?;

        let mut builder = ClientBuilder::native();
        builder.capabilities(browser_capabilities(config));
        let client = builder
            .connect(url)
            .await
            .map_err(|e| Error::WebDriver(format!("cannot start a session at {}: {}", url, e)))?;

        tracing::debug!("Browser session started on {}", url);
        Ok(Self {
            client,
            delay: Duration::from_millis(config.delay_ms),
            last_navigation: None,
        })
    }

    /// End the browser session
    pub async fn close(self) -> Result<()> {
        self.client
            .close()
            .await
            .map_err(|e| Error::WebDriver(e.to_string()))
    }
}

#[async_trait]
impl PageSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        if let Some(last) = self.last_navigation {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        self.last_navigation = Some(Instant::now());

        tracing::debug!("Navigating to {}", url);
        self.client
            .goto(url)
            .await
            .map_err(|e| Error::WebDriver(format!("navigation to {} failed: {}", url, e)))
    }

    async fn page_source(&mut self) -> Result<String> {
        self.client
            .source()
            .await
            .map_err(|e| Error::WebDriver(e.to_string()))
    }
}

/// Capabilities for Chrome and Firefox drivers; each ignores the other's key
fn browser_capabilities(config: &ScraperConfig) -> Map<String, Value> {
    let mut chrome_args = vec![format!("--user-agent={}", config.user_agent)];
    let mut firefox_args = Vec::new();
    if config.headless {
        chrome_args.push("--headless=new".to_string());
        chrome_args.push("--disable-gpu".to_string());
        firefox_args.push("-headless".to_string());
    }

    let mut capabilities = Map::new();
    capabilities.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": chrome_args }),
    );
    capabilities.insert(
        "moz:firefoxOptions".to_string(),
        json!({ "args": firefox_args }),
    );
    capabilities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(capabilities: &Map<String, Value>, key: &str) -> Vec<String> {
        capabilities[key]["args"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_headless_capabilities() {
        let capabilities = browser_capabilities(&ScraperConfig::default());

        let chrome = args(&capabilities, "goog:chromeOptions");
        assert!(chrome.contains(&"--headless=new".to_string()));
        assert!(chrome[0].starts_with("--user-agent=Mozilla/5.0"));
        assert_eq!(args(&capabilities, "moz:firefoxOptions"), vec!["-headless"]);
    }

    #[test]
    fn test_windowed_capabilities() {
        let config = ScraperConfig {
            headless: false,
            ..Default::default()
        };
        let capabilities = browser_capabilities(&config);

        assert_eq!(args(&capabilities, "goog:chromeOptions").len(), 1);
        assert!(args(&capabilities, "moz:firefoxOptions").is_empty());
    }

    #[tokio::test]
    async fn test_connect_requires_webdriver_url() {
        let result = WebDriverSession::connect(&ScraperConfig::default()).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
