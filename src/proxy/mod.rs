//! Proxy module for extracting, validating and probing proxies
//!
//! This module provides functionality for:
//! - Extracting proxy links from scraped channel text
//! - Validating secrets and classifying their mode
//! - Deduplicating records by `server:port`
//! - Probing liveness in bounded, deadline-limited batches
//! - Ranking outcomes and fetching channel pages

pub mod checker;
pub mod crawler;
pub mod dedup;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod ranker;
pub mod secret;

pub use checker::{ConnectivityProber, ProberConfig};
pub use crawler::{ChannelCrawler, CrawlerConfig};
pub use dedup::dedup_records;
pub use models::{ChannelDocument, ProbeOutcome, ProbeStatus, ProxyRecord, SecretMode};
pub use parser::{LinkExtractor, RawLink};
pub use ranker::rank_outcomes;
pub use secret::{SecretValidator, ValidSecret};
