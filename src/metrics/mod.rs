use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::register_histogram;
use prometheus::Histogram;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::info;
use tracing::warn;
use warp::Filter;
use warp::Rejection;
use warp::Reply;


lazy_static! {
    pub static ref ACTIVE_WATCH_SESSIONS: IntGauge =
        IntGauge::new("active_watch_sessions", "Number of watch streams currently open")
            .expect("metric can not be created");

    pub static ref WATCH_EVENTS_SENT: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_events_sent", "Watch events delivered to clients"),
        &["event_type"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_SESSIONS_CLOSED: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_sessions_closed", "Finished watch streams by terminal reason"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref HTTP_RESPONSES: IntCounterVec = IntCounterVec::new(
        Opts::new("http_responses", "API responses by operation and status code"),
        &["operation", "status"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_SESSION_DURATION_SECONDS: Histogram = register_histogram!(
        "watch_session_duration_seconds",
        "Lifetime of watch streams in seconds",
        exponential_buckets(1.0, 2.0, 12).expect("valid bucket layout")
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ACTIVE_WATCH_SESSIONS.clone()),
        Box::new(WATCH_EVENTS_SENT.clone()),
        Box::new(WATCH_SESSIONS_CLOSED.clone()),
        Box::new(HTTP_RESPONSES.clone()),
    ];
    for c in collectors {
        if let Err(e) = registry.register(c) {
            warn!("collector can not be registered: {}", e);
        }
    }
}

pub(crate) fn record_response(
    operation: &str,
    status: u16,
) {
    HTTP_RESPONSES
        .with_label_values(&[operation, &status.to_string()])
        .inc();
}

pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    register_custom_metrics(&REGISTRY);

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    let (addr, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    info!(%addr, "metrics server listening");
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(gather_metrics())
}

/// Custom registry followed by the default one, in Prometheus text format
pub(crate) fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut res = String::new();
    for families in [REGISTRY.gather(), prometheus::gather()] {
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&families, &mut buffer) {
            warn!("could not encode metrics: {}", e);
            continue;
        }
        match String::from_utf8(buffer) {
            Ok(v) => res.push_str(&v),
            Err(e) => warn!("metrics could not be from_utf8'd: {}", e),
        }
    }
    res
}
