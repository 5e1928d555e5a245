use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::logging::Logger;
use crate::metrics::GridMetrics;

/// Delay before a deferred visibility refresh runs.
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_millis(100);

/// Configuration knobs for an [`AutoGrid`](crate::AutoGrid).
#[derive(Clone)]
pub struct GridConfig {
    /// Delay between a maximize/restore and the visibility refresh it triggers.
    pub refresh_delay: Duration,
    /// Optional structured logger.
    pub logger: Option<Logger>,
    /// Metrics accumulator shared with the refresher.
    pub metrics: Option<Arc<Mutex<GridMetrics>>>,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            refresh_delay: DEFAULT_REFRESH_DELAY,
            logger: None,
            metrics: None,
            metrics_target: "autogrid::metrics".to_string(),
        }
    }
}

impl GridConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(GridMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<GridMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}
