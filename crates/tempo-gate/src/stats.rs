//! Admission statistics and Prometheus text exposition.

use std::fmt::Write;

use serde::Serialize;

/// Point-in-time view of a [`Throttle`](crate::Throttle).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThrottleStats {
    /// Currently advertised capacity.
    pub capacity: usize,
    /// Admitted requests that have not finished yet.
    pub in_flight: usize,
    /// Number of resizes applied so far.
    pub generation: u64,
    /// Requests admitted since start.
    pub admitted: u64,
    /// Requests rejected since start.
    pub rejected: u64,
    /// Completed requests waiting for the next tuning cycle.
    pub pending_samples: u64,
}

/// Render stats in the Prometheus text exposition format, labelled with
/// `throttle="<name>"`.
pub fn render_prometheus(name: &str, stats: &ThrottleStats) -> String {
    let mut out = String::new();
    let label = format!("throttle=\"{}\"", escape_label(name));

    let metrics: [(&str, &str, &str, u64); 5] = [
        (
            "tempo_capacity",
            "gauge",
            "Current admission capacity.",
            stats.capacity as u64,
        ),
        (
            "tempo_in_flight",
            "gauge",
            "Requests currently holding a permit.",
            stats.in_flight as u64,
        ),
        (
            "tempo_resizes_total",
            "counter",
            "Capacity changes applied by the auto-tuner.",
            stats.generation,
        ),
        (
            "tempo_admitted_total",
            "counter",
            "Requests admitted.",
            stats.admitted,
        ),
        (
            "tempo_rejected_total",
            "counter",
            "Requests rejected as overloaded.",
            stats.rejected,
        ),
    ];

    for (metric, kind, help, value) in metrics {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "# HELP {metric} {help}");
        let _ = writeln!(out, "# TYPE {metric} {kind}");
        let _ = writeln!(out, "{metric}{{{label}}} {value}");
    }

    out
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
