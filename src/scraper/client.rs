//! Page sessions and readiness waiting
//!
//! Market data on the game pages is filled in after the initial load, so a
//! page is polled until it exposes an actionable element before anything is
//! extracted from it.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::{Duration, Instant};

use crate::config::ScraperConfig;
use crate::error::{Error, Result};

/// A stateful page-rendering session, owned by one worker at a time
#[async_trait]
pub trait PageSession: Send {
    /// Load a page, replacing the current one
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Current markup of the loaded page
    async fn page_source(&mut self) -> Result<String>;
}

/// HTTP page session with rate limiting and retry
///
/// When `render_endpoint` is configured the page is fetched through that
/// rendering service so client-side content is present in the markup.
pub struct HttpSession {
    client: reqwest::Client,
    config: ScraperConfig,
    last_request: Instant,
    current_url: Option<String>,
    pending: Option<String>,
}

impl HttpSession {
    /// Create a new session with the given configuration
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            config,
            last_request: Instant::now() - Duration::from_secs(10),
            current_url: None,
            pending: None,
        })
    }

    /// Wait for rate limit
    async fn wait_for_rate_limit(&mut self) {
        let elapsed = self.last_request.elapsed();
        let delay = Duration::from_millis(self.config.delay_ms);

        if elapsed < delay {
            tokio::time::sleep(delay - elapsed).await;
        }

        self.last_request = Instant::now();
    }

    /// URL actually requested for a page
    fn request_url(&self, url: &str) -> Result<String> {
        match &self.config.render_endpoint {
            Some(endpoint) => reqwest::Url::parse_with_params(endpoint, &[("url", url)])
                .map(|u| u.to_string())
                .map_err(|e| Error::Config(format!("invalid render endpoint: {}", e))),
            None => Ok(url.to_string()),
        }
    }

    /// Fetch HTML page with rate limiting and retry
    async fn fetch_page(&mut self, url: &str) -> Result<String> {
        let request_url = self.request_url(url)?;

        for attempt in 0..self.config.max_retries {
            self.wait_for_rate_limit().await;

            match self.client.get(&request_url).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response.text().await?);
                    }
                    tracing::warn!(
                        "Request failed with status {} (attempt {}/{})",
                        response.status(),
                        attempt + 1,
                        self.config.max_retries
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.config.max_retries,
                        e
                    );
                }
            }

            if attempt + 1 < self.config.max_retries {
                let backoff = Duration::from_millis(self.config.delay_ms * (attempt as u64 + 1));
                tokio::time::sleep(backoff).await;
            }
        }

        Err(Error::FetchFailed {
            url: url.to_string(),
            attempts: self.config.max_retries,
        })
    }
}

#[async_trait]
impl PageSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        tracing::debug!("Navigating to {}", url);
        let html = self.fetch_page(url).await?;
        self.current_url = Some(url.to_string());
        self.pending = Some(html);
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String> {
        if let Some(html) = self.pending.take() {
            return Ok(html);
        }
        let url = self
            .current_url
            .clone()
            .ok_or_else(|| Error::Config("page_source called before navigate".to_string()))?;
        self.fetch_page(&url).await
    }
}

/// Whether the markup contains an actionable, non-disabled interactive element
pub fn is_page_ready(html: &str) -> bool {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("button, a[href], input, select") {
        Ok(s) => s,
        Err(_) => return false,
    };

    document.select(&selector).any(|element| {
        let attrs = element.value();
        attrs.attr("disabled").is_none()
            && !matches!(attrs.attr("aria-disabled"), Some(v) if v.eq_ignore_ascii_case("true"))
    })
}

/// Poll the loaded page until it is ready, returning its markup
///
/// Fails with `DiscoveryTimeout` when no readiness signal appears within `wait`.
pub async fn wait_until_ready<S: PageSession + ?Sized>(
    session: &mut S,
    url: &str,
    wait: Duration,
    poll_interval: Duration,
) -> Result<String> {
    let started = Instant::now();

    let poll = async {
        loop {
            let html = session.page_source().await?;
            if is_page_ready(&html) {
                return Ok::<_, Error>(html);
            }
            tracing::debug!("Page {} not ready yet", url);
            tokio::time::sleep(poll_interval).await;
        }
    };

    match tokio::time::timeout(wait, poll).await {
        Ok(result) => {
            let html = result?;
            tracing::debug!("Page {} ready after {:?}", url, started.elapsed());
            Ok(html)
        }
        Err(_) => Err(Error::DiscoveryTimeout {
            url: url.to_string(),
            waited: wait,
        }),
    }
}
