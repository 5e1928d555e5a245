use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters for grid operations. Rejected calls are counted separately.
#[derive(Debug, Default, Clone)]
pub struct GridMetrics {
    placements: u64,
    rejected_placements: u64,
    maximizes: u64,
    restores: u64,
    refreshes_applied: u64,
    refreshes_skipped: u64,
}

impl GridMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_placement(&mut self) {
        self.placements = self.placements.saturating_add(1);
    }

    pub fn record_rejected_placement(&mut self) {
        self.rejected_placements = self.rejected_placements.saturating_add(1);
    }

    pub fn record_maximize(&mut self) {
        self.maximizes = self.maximizes.saturating_add(1);
    }

    pub fn record_restore(&mut self) {
        self.restores = self.restores.saturating_add(1);
    }

    pub fn record_refresh(&mut self, applied: bool) {
        if applied {
            self.refreshes_applied = self.refreshes_applied.saturating_add(1);
        } else {
            self.refreshes_skipped = self.refreshes_skipped.saturating_add(1);
        }
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            placements: self.placements,
            rejected_placements: self.rejected_placements,
            maximizes: self.maximizes,
            restores: self.restores,
            refreshes_applied: self.refreshes_applied,
            refreshes_skipped: self.refreshes_skipped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub placements: u64,
    pub rejected_placements: u64,
    pub maximizes: u64,
    pub restores: u64,
    pub refreshes_applied: u64,
    pub refreshes_skipped: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "grid_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("placements".to_string(), json!(self.placements));
        map.insert(
            "rejected_placements".to_string(),
            json!(self.rejected_placements),
        );
        map.insert("maximizes".to_string(), json!(self.maximizes));
        map.insert("restores".to_string(), json!(self.restores));
        map.insert(
            "refreshes_applied".to_string(),
            json!(self.refreshes_applied),
        );
        map.insert(
            "refreshes_skipped".to_string(),
            json!(self.refreshes_skipped),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let mut metrics = GridMetrics::new();
        metrics.record_placement();
        metrics.record_placement();
        metrics.record_rejected_placement();
        metrics.record_maximize();
        metrics.record_refresh(true);
        metrics.record_refresh(false);

        let snapshot = metrics.snapshot(Duration::from_millis(1500));
        assert_eq!(snapshot.uptime_ms, 1500);
        assert_eq!(snapshot.placements, 2);
        assert_eq!(snapshot.rejected_placements, 1);
        assert_eq!(snapshot.maximizes, 1);
        assert_eq!(snapshot.restores, 0);
        assert_eq!(snapshot.refreshes_applied, 1);
        assert_eq!(snapshot.refreshes_skipped, 1);
    }

    #[test]
    fn snapshot_event_carries_fields() {
        let event = GridMetrics::new()
            .snapshot(Duration::ZERO)
            .to_log_event("autogrid::metrics");
        assert_eq!(event.target, "autogrid::metrics");
        assert_eq!(event.message, "grid_metrics");
        assert_eq!(event.fields.len(), 7);
    }
}
