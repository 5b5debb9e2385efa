//! End-to-end pipeline: extract, validate, deduplicate, probe, rank

use crate::proxy::checker::ConnectivityProber;
use crate::proxy::dedup::dedup_records;
use crate::proxy::models::{ChannelDocument, ProbeOutcome, ProxyRecord};
use crate::proxy::parser::LinkExtractor;
use crate::proxy::ranker::rank_outcomes;
use tracing::{debug, info};

/// Extract the unique, validated records of all documents in arrival order
pub fn collect_records(documents: &[ChannelDocument]) -> Vec<ProxyRecord> {
    let records = documents.iter().flat_map(|document| {
        let found: Vec<_> = LinkExtractor::extract_records(&document.text).collect();
        debug!(channel = %document.channel, records = found.len(), "extracted");
        found
    });

    let unique = dedup_records(records);
    info!(documents = documents.len(), unique = unique.len(), "collected proxy records");
    unique
}

/// Parse a list with one proxy link per line.
///
/// Blank lines and lines starting with `#` are skipped, as are lines whose
/// link does not validate. The result is deduplicated like document input.
pub fn collect_link_lines(text: &str) -> Vec<ProxyRecord> {
    let records = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| LinkExtractor::parse_link(line)?.into_record());

    let unique = dedup_records(records);
    info!(unique = unique.len(), "collected proxy records from link list");
    unique
}

/// Run the full pipeline and return ranked outcomes
pub async fn run(documents: &[ChannelDocument], prober: &ConnectivityProber) -> Vec<ProbeOutcome> {
    check_records(collect_records(documents), prober).await
}

/// Probe already collected records and rank the outcomes
pub async fn check_records(records: Vec<ProxyRecord>, prober: &ConnectivityProber) -> Vec<ProbeOutcome> {
    if records.is_empty() {
        return Vec::new();
    }

    rank_outcomes(prober.probe_all(records).await)
}
