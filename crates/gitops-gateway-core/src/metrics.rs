//! Gateway metrics.

use prometheus::{IntCounterVec, IntGauge, Registry};
use std::sync::Arc;

/// Counters shared by the router and the schedulers.
///
/// Registered on an injected [`Registry`] so every test can build its own set.
#[derive(Debug)]
pub struct GatewayMetrics {
    /// Labels: `event`, `action`, `outcome`.
    pub webhook_events_total: IntCounterVec,
    /// Labels: `scheduler`, `outcome` (`ok`, `error`, `panic`).
    pub scheduled_tasks_total: IntCounterVec,
    pub async_tasks_in_flight: IntGauge,
}

impl GatewayMetrics {
    pub fn new(registry: &Registry) -> Result<Arc<Self>, prometheus::Error> {
        use prometheus::{
            register_int_counter_vec_with_registry, register_int_gauge_with_registry,
        };

        Ok(Arc::new(Self {
            webhook_events_total: register_int_counter_vec_with_registry!(
                "gateway_webhook_events_total",
                "Webhook deliveries by event kind, provider action and outcome",
                &["event", "action", "outcome"],
                registry
            )?,
            scheduled_tasks_total: register_int_counter_vec_with_registry!(
                "gateway_scheduled_tasks_total",
                "Units of scheduled work by scheduler and outcome",
                &["scheduler", "outcome"],
                registry
            )?,
            async_tasks_in_flight: register_int_gauge_with_registry!(
                "gateway_async_tasks_in_flight",
                "Background tasks started but not yet finished",
                registry
            )?,
        }))
    }

    pub fn record_webhook(&self, event: &str, action: &str, outcome: &str) {
        self.webhook_events_total
            .with_label_values(&[event, action, outcome])
            .inc();
    }

    pub fn record_task(&self, scheduler: &str, outcome: &str) {
        self.scheduled_tasks_total
            .with_label_values(&[scheduler, outcome])
            .inc();
    }
}
