//! Prometheus metrics for the HTTP service.
//!
//! Each [`ServiceMetrics`] owns its own registry, so any number of instances
//! can coexist in one process.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linear_agent_sdk::agent::MentionContext;
use linear_agent_sdk::error::SubscriberError;
use linear_agent_sdk::events::{EventBus, EventSubscriber};
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

const NAMESPACE: &str = "linear_agent";

/// Outcome label for a webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted,
    Unauthorized,
    BadRequest,
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Unauthorized => "unauthorized",
            Self::BadRequest => "bad_request",
            Self::Failed => "failed",
        }
    }
}

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // HTTP request metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration: HistogramVec,

    // Webhook processing metrics
    pub webhook_deliveries_total: IntCounterVec,
    pub webhook_duration_seconds: Histogram,
    pub mention_dispatches_total: IntCounter,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new_custom(Some(NAMESPACE.to_string()), None)?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request processing time",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0]),
            &["path"],
        )?;
        let webhook_deliveries_total = IntCounterVec::new(
            Opts::new(
                "webhook_deliveries_total",
                "Webhook deliveries by processing outcome",
            ),
            &["outcome"],
        )?;
        let webhook_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "webhook_duration_seconds",
                "Webhook processing time distribution",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 30.0]),
        )?;
        let mention_dispatches_total = IntCounter::new(
            "mention_dispatches_total",
            "Comment mentions dispatched to agents",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(webhook_deliveries_total.clone()))?;
        registry.register(Box::new(webhook_duration_seconds.clone()))?;
        registry.register(Box::new(mention_dispatches_total.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration,
            webhook_deliveries_total,
            webhook_duration_seconds,
            mention_dispatches_total,
        }))
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        self.http_request_duration
            .with_label_values(&[path])
            .observe(duration.as_secs_f64());
    }

    pub fn record_webhook_delivery(&self, outcome: DeliveryOutcome, duration: Duration) {
        self.webhook_deliveries_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.webhook_duration_seconds.observe(duration.as_secs_f64());
    }

    pub fn deliveries(&self, outcome: DeliveryOutcome) -> u64 {
        self.webhook_deliveries_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    /// Count every mention published on `bus`.
    ///
    /// Subscribe this before any agent so dispatches are counted even when
    /// an agent fails.
    pub async fn observe_mentions(&self, bus: &EventBus) {
        bus.on_mention(Arc::new(MentionCounter {
            counter: self.mention_dispatches_total.clone(),
        }))
        .await;
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

struct MentionCounter {
    counter: IntCounter,
}

#[async_trait]
impl EventSubscriber<MentionContext> for MentionCounter {
    async fn on_event(&self, _mention: &MentionContext) -> Result<(), SubscriberError> {
        self.counter.inc();
        Ok(())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
