//! Channel crawler for fetching the public web preview of channels
//!
//! This module provides functionality for:
//! - Fetching channel pages over HTTP
//! - Turning fetch failures into empty documents
//! - Loading channel lists from files

use crate::proxy::models::ChannelDocument;
use crate::Result;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Default base URL of the channel web preview
const DEFAULT_BASE_URL: &str = "https://t.me/s/";

/// Configuration for the channel crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Timeout for HTTP requests
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
    /// URL prefix the channel name is appended to
    pub base_url: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

/// Crawler fetching channel documents
pub struct ChannelCrawler {
    config: CrawlerConfig,
    client: Client,
}

impl ChannelCrawler {
    /// Create a new crawler with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(CrawlerConfig::default())
    }

    /// Create a new crawler with custom configuration
    pub fn with_config(config: CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { config, client })
    }

    /// Page URL of a channel
    pub fn channel_url(&self, channel: &str) -> String {
        let name = channel.trim().trim_start_matches('@');
        format!("{}{}", self.config.base_url, name)
    }

    /// Fetch the raw page of a single channel
    pub async fn fetch_channel(&self, channel: &str) -> Result<String> {
        let response = self
            .client
            .get(self.channel_url(channel))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    /// Fetch every channel once, in order.
    ///
    /// A channel that cannot be fetched yields an empty document, so one bad
    /// channel never stops the run.
    pub async fn fetch_all(&self, channels: &[String]) -> Vec<ChannelDocument> {
        let mut documents = Vec::with_capacity(channels.len());

        for channel in channels {
            let document = match self.fetch_channel(channel).await {
                Ok(text) => {
                    info!(channel = %channel, bytes = text.len(), "fetched channel");
                    ChannelDocument::new(channel.clone(), text)
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, "failed to fetch channel");
                    ChannelDocument::empty(channel.clone())
                }
            };
            documents.push(document);
        }

        documents
    }

    /// Channels scanned when none are given
    pub fn default_channels() -> Vec<String> {
        ["ProxyMTProto", "MTProtoProxies", "proxy_mtproto", "iRoProxy"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Parse a channel list, one name per line, skipping blanks and `#` comments
    pub fn parse_channel_list(content: &str) -> Vec<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.trim_start_matches('@').to_string())
            .collect()
    }

    /// Load a channel list from a file
    pub fn load_channel_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse_channel_list(&content))
    }
}
