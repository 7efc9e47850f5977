//! Logging, trace propagation, and metrics for the warden service.
//!
//! # Purpose
//! Installs the `tracing` subscriber (optionally exporting spans over OTLP),
//! extracts W3C trace context from inbound requests, and owns the two
//! authorization counters together with the `/metrics` listener that exposes
//! them.
//!
//! # Key invariants
//! - Installation happens at most once per process; later calls return the
//!   same metrics handle.
//! - Metric labels carry outcome and reason names only, never credential
//!   material.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Counter labelled `outcome` (`allow`/`deny`) and `reason`.
pub const AUTH_DECISIONS_TOTAL: &str = "warden_auth_decisions_total";
/// Counter labelled `stage` (`oidc`/`api_token`) and `result` (`hit`/`miss`).
pub const CREDENTIAL_CACHE_TOTAL: &str = "warden_credential_cache_total";

const DEFAULT_LOG_FILTER: &str = "info";

static INSTALLED: OnceLock<PrometheusHandle> = OnceLock::new();
static PROPAGATOR: OnceLock<()> = OnceLock::new();

/// Process-level telemetry settings read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySettings {
    pub service_name: String,
    /// `WARDEN_LOG`, then `RUST_LOG`, then `info`.
    pub log_filter: String,
    /// Spans are exported only when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
    pub otlp_endpoint: Option<String>,
    pub instance_id: Option<String>,
    pub environment: Option<String>,
}

impl TelemetrySettings {
    pub fn from_env(service_name: &str) -> Self {
        Self::from_lookup(service_name, |key| {
            std::env::var(key).ok().filter(|value| !value.is_empty())
        })
    }

    fn from_lookup(service_name: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            service_name: service_name.to_string(),
            log_filter: lookup("WARDEN_LOG")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT"),
            instance_id: lookup("WARDEN_INSTANCE_ID").or_else(|| lookup("HOSTNAME")),
            environment: lookup("WARDEN_ENVIRONMENT"),
        }
    }

    fn resource(&self) -> Vec<KeyValue> {
        let mut attrs = vec![KeyValue::new("service.name", self.service_name.clone())];
        if let Some(instance) = &self.instance_id {
            attrs.push(KeyValue::new("service.instance.id", instance.clone()));
        }
        if let Some(environment) = &self.environment {
            attrs.push(KeyValue::new("deployment.environment", environment.clone()));
        }
        attrs
    }
}

/// Install logging, propagation, and the metrics recorder once.
pub fn init_observability(service_name: &str) -> PrometheusHandle {
    INSTALLED
        .get_or_init(|| {
            let settings = TelemetrySettings::from_env(service_name);
            install_propagator();
            install_subscriber(&settings);
            install_metrics_recorder()
        })
        .clone()
}

fn install_propagator() {
    PROPAGATOR.get_or_init(|| global::set_text_map_propagator(TraceContextPropagator::new()));
}

fn install_subscriber(settings: &TelemetrySettings) {
    let filter = EnvFilter::try_new(&settings.log_filter)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    match span_exporter(settings) {
        Some(provider) => {
            let tracer = provider.tracer(settings.service_name.clone());
            let _ = registry
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init();
        }
        None => {
            let _ = registry.try_init();
        }
    }
}

fn span_exporter(settings: &TelemetrySettings) -> Option<SdkTracerProvider> {
    settings.otlp_endpoint.as_ref()?;
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .ok()?;
    let resource = Resource::builder_empty()
        .with_attributes(settings.resource())
        .build();
    Some(
        SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build(),
    )
}

fn install_metrics_recorder() -> PrometheusHandle {
    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(err) => {
            tracing::warn!(error = %err, "metrics recorder already installed");
            PrometheusBuilder::new().build_recorder().handle()
        }
    };
    metrics::describe_counter!(
        AUTH_DECISIONS_TOTAL,
        "Authorization decisions by outcome and reason"
    );
    metrics::describe_counter!(
        CREDENTIAL_CACHE_TOTAL,
        "Credential cache lookups by resolver stage and result"
    );
    handle
}

/// Count one engine decision.
pub fn record_decision(allowed: bool, reason: &'static str) {
    let outcome = if allowed { "allow" } else { "deny" };
    metrics::counter!(AUTH_DECISIONS_TOTAL, "outcome" => outcome, "reason" => reason).increment(1);
}

/// Count one credential cache lookup by a resolver stage.
pub fn record_cache_lookup(stage: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!(CREDENTIAL_CACHE_TOTAL, "stage" => stage, "result" => result).increment(1);
}

/// Parent context carried by the request's `traceparent` header, if any.
pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    install_propagator();
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

pub async fn serve_metrics(handle: PrometheusHandle, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics listening");
    serve_metrics_on(handle, listener, std::future::pending()).await
}

async fn serve_metrics_on<F>(
    handle: PrometheusHandle,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    );
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}
