use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, TextEncoder};

pub static MESSAGES_SENT: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::with_opts(Opts::new(
        "realtime_messages_sent_total",
        "Messages accepted and persisted with status sent",
    ))
    .expect("failed to create realtime_messages_sent_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register realtime_messages_sent_total");
    counter
});

pub static MESSAGES_DELIVERED: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::with_opts(Opts::new(
        "realtime_messages_delivered_total",
        "Messages that reached the delivered state",
    ))
    .expect("failed to create realtime_messages_delivered_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register realtime_messages_delivered_total");
    counter
});

pub static MESSAGES_READ: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::with_opts(Opts::new(
        "realtime_messages_read_total",
        "Messages that reached the read state",
    ))
    .expect("failed to create realtime_messages_read_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register realtime_messages_read_total");
    counter
});

pub static CONNECTED_USERS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::with_opts(Opts::new(
        "realtime_connected_users",
        "Users currently registered for push delivery",
    ))
    .expect("failed to create realtime_connected_users");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register realtime_connected_users");
    gauge
});

/// Render the default registry in Prometheus text exposition format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
