//! Plain-text rendering of probe outcomes

use crate::proxy::models::{ProbeOutcome, ProbeStatus};
use std::fmt::Write;

fn marker(status: ProbeStatus) -> &'static str {
    match status {
        ProbeStatus::Online => "✓",
        ProbeStatus::Unstable => "~",
        ProbeStatus::Offline => "✗",
    }
}

/// Render outcomes one per line, followed by a status summary
pub fn render(outcomes: &[ProbeOutcome]) -> String {
    if outcomes.is_empty() {
        return "No proxies found.\n".to_string();
    }

    let mut out = String::new();
    for outcome in outcomes {
        let latency = outcome
            .latency_ms
            .map_or_else(|| "-".to_string(), |ms| format!("{ms}ms"));
        let _ = writeln!(
            out,
            "{} {:<8} {:>7}  {:<8} {}",
            marker(outcome.status),
            outcome.status,
            latency,
            outcome.record.secret_mode(),
            outcome.record.canonical_uri()
        );
    }

    let count = |status: ProbeStatus| outcomes.iter().filter(|o| o.status == status).count();
    let _ = writeln!(
        out,
        "\nTotal: {}, online: {}, unstable: {}, offline: {}",
        outcomes.len(),
        count(ProbeStatus::Online),
        count(ProbeStatus::Unstable),
        count(ProbeStatus::Offline)
    );

    out
}
