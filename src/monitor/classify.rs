use crate::db::ConnectivityState;
use crate::probe::ProbeResult;

/// Classify connectivity from the link signal and a probe outcome.
pub fn classify(link_up: bool, probe: &ProbeResult) -> ConnectivityState {
    match (link_up, probe.reachable) {
        (false, _) => ConnectivityState::Offline,
        (true, true) => ConnectivityState::Online,
        (true, false) => ConnectivityState::LanNoInternet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(reachable: bool, latency: Option<f64>) -> ProbeResult {
        ProbeResult {
            reachable,
            latency_millis: latency,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_decision_table() {
        let cases = [
            (false, false, ConnectivityState::Offline),
            (false, true, ConnectivityState::Offline),
            (true, true, ConnectivityState::Online),
            (true, false, ConnectivityState::LanNoInternet),
        ];

        for (link_up, reachable, expected) in cases {
            assert_eq!(classify(link_up, &result(reachable, None)), expected, "link={} reachable={}", link_up, reachable);
        }
    }

    #[test]
    fn test_fast_probe_is_online() {
        let probe = result(true, Some(42.0));
        assert_eq!(classify(true, &probe), ConnectivityState::Online);
        assert_eq!(probe.latency_millis, Some(42.0));
    }
}
