//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;
use sluice_rules::CompositionReport;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Registered RPC methods.
    pub methods: usize,
    /// Report of the most recent composition pass.
    pub last_composition: Option<CompositionReport>,
}

/// Build a health response from live state.
pub fn health_check(
    start_time: Instant,
    methods: usize,
    last_composition: Option<CompositionReport>,
) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        methods,
        last_composition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), 0, None);
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        assert!(health_check(start, 0, None).uptime_secs >= 59);
    }

    #[test]
    fn serialization() {
        let report = CompositionReport {
            line_count: 3,
            ..CompositionReport::default()
        };
        let resp = health_check(Instant::now(), 36, Some(report));
        let parsed = serde_json::to_value(&resp).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["methods"], 36);
        assert_eq!(parsed["last_composition"]["lineCount"], 3);
    }
}
