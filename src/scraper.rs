use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, ClientBuilder};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::parser::{self, extract::Extractor, extract::Mention};
use crate::settings::Settings;

const PROGRESS_EVERY: u32 = 10;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("empty response body")]
    Empty,
}

/// Anything that can hand back the raw HTML of a manual page.
/// An empty string means the page could not be retrieved.
pub trait PageSource {
    async fn fetch_page(&self, page: u32) -> String;
}

pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = client_builder(settings).build()?;
        Ok(Self::with_client(client, settings))
    }

    fn with_client(client: Client, settings: &Settings) -> Self {
        HttpSource {
            client,
            base_url: settings.base_url.clone(),
        }
    }

    async fn try_fetch(&self, page: u32) -> Result<String, FetchError> {
        let bytes = self
            .client
            .get(page_url(&self.base_url, page))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let html = decode_lossy(&bytes);
        if html.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(html)
    }
}

impl PageSource for HttpSource {
    async fn fetch_page(&self, page: u32) -> String {
        match self.try_fetch(page).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Error fetching page {}: {}", page, e);
                String::new()
            }
        }
    }
}

fn client_builder(settings: &Settings) -> ClientBuilder {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(Duration::from_secs(settings.timeout_secs))
}

pub fn page_url(base_url: &str, page: u32) -> String {
    format!("{}?page={}", base_url, page)
}

/// UTF-8 decode that drops invalid byte sequences instead of failing.
fn decode_lossy(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Progress message printed on every tenth page.
fn progress_line(page: u32, last: u32) -> Option<String> {
    (page % PROGRESS_EVERY == 0).then(|| format!("Progress: {}/{} pages processed...", page, last))
}

/// Scrape stats returned after completion.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub skipped: usize,
}

/// Fetch, clean and extract each page of `first..=last` in order, sleeping
/// `delay` after every page. Pages that come back empty are skipped.
pub async fn scrape_pages<S: PageSource>(
    source: &S,
    extractor: &Extractor,
    first: u32,
    last: u32,
    delay: Duration,
) -> (Vec<Mention>, ScrapeStats) {
    let total = last.saturating_add(1).saturating_sub(first) as usize;
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut mentions = Vec::new();
    let mut stats = ScrapeStats {
        total,
        ..Default::default()
    };

    for page in first..=last {
        // pb.println is dropped while the bar is hidden (non-tty stderr).
        if let Some(line) = progress_line(page, last) {
            pb.suspend(|| println!("{}", line));
        }

        let html = source.fetch_page(page).await;
        if html.is_empty() {
            stats.skipped += 1;
        } else {
            let found = parser::process_page(page, &html, extractor);
            debug!(page, mentions = found.len(), "page extracted");
            mentions.extend(found);
            stats.ok += 1;
        }

        pb.inc(1);
        tokio::time::sleep(delay).await;
    }

    pb.finish_and_clear();
    info!(
        "Scraped {} pages ({} ok, {} skipped), {} mentions",
        stats.total,
        stats.ok,
        stats.skipped,
        mentions.len()
    );
    (mentions, stats)
}
