//! Ordering of probe outcomes

use crate::proxy::models::ProbeOutcome;

/// Sort outcomes for presentation.
///
/// Online outcomes come first; within the same tier outcomes are ordered by
/// ascending latency, with a missing latency sorting after every measured
/// one. The sort is stable, so ties keep their input order.
pub fn rank_outcomes(mut outcomes: Vec<ProbeOutcome>) -> Vec<ProbeOutcome> {
    outcomes.sort_by_key(|outcome| {
        (
            !outcome.is_online(),
            outcome.latency_ms.unwrap_or(u64::MAX),
        )
    });
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::{ProbeStatus, ProxyRecord};
    use crate::proxy::secret::SecretValidator;

    fn record(server: &str) -> ProxyRecord {
        ProxyRecord::new(
            server.to_string(),
            443,
            SecretValidator::validate("0123456789abcdef0123456789abcdef").unwrap(),
        )
    }

    #[test]
    fn test_rank_online_first_then_latency() {
        let outcomes = vec![
            ProbeOutcome::offline(record("offline")),
            ProbeOutcome::online(record("slow"), 50),
            ProbeOutcome::online(record("fast"), 10),
            ProbeOutcome {
                record: record("unstable"),
                status: ProbeStatus::Unstable,
                latency_ms: None,
            },
        ];

        let ranked = rank_outcomes(outcomes);
        let servers: Vec<_> = ranked.iter().map(|o| o.record.server()).collect();
        assert_eq!(servers, vec!["fast", "slow", "offline", "unstable"]);
    }

    #[test]
    fn test_rank_measured_latency_before_missing() {
        let outcomes = vec![
            ProbeOutcome::offline(record("offline")),
            ProbeOutcome::unstable(record("unstable"), 900),
        ];

        let ranked = rank_outcomes(outcomes);
        assert_eq!(ranked[0].status, ProbeStatus::Unstable);
        assert_eq!(ranked[1].status, ProbeStatus::Offline);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let outcomes = vec![
            ProbeOutcome::online(record("first"), 20),
            ProbeOutcome::online(record("second"), 20),
            ProbeOutcome::online(record("third"), 20),
        ];

        let ranked = rank_outcomes(outcomes);
        let servers: Vec<_> = ranked.iter().map(|o| o.record.server()).collect();
        assert_eq!(servers, vec!["first", "second", "third"]);
    }
}
