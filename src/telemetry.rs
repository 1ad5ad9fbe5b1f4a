use crate::config::LogLevel;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PIPELINE_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0];

pub fn init_tracing(log_level: &LogLevel) {
    let log_level = format!("{},ort=warn", log_level.as_str());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_level(true))
        .init();
}

pub struct Metrics {
    request_counter: IntCounterVec,
    pipeline_duration: HistogramVec,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let request_counter = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of requests"),
            &["route", "status"],
        )?;
        let pipeline_duration = HistogramVec::new(
            HistogramOpts::new(
                "pipeline_duration_seconds",
                "Duration of fetch, decode and inference per request in seconds",
            )
            .buckets(PIPELINE_BUCKETS.to_vec()),
            &["source"],
        )?;

        registry.register(Box::new(request_counter.clone()))?;
        registry.register(Box::new(pipeline_duration.clone()))?;

        Ok(Metrics {
            request_counter,
            pipeline_duration,
            registry,
        })
    }

    pub fn record_request(&self, route: &str, status: u16) {
        let status = status.to_string();
        self.request_counter
            .with_label_values(&[route, status.as_str()])
            .inc();
    }

    pub fn record_pipeline_duration(&self, source: &str, seconds: f64) {
        self.pipeline_duration
            .with_label_values(&[source])
            .observe(seconds);
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
