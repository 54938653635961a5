use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct AuthMetrics {
    registry: Registry,
    login_attempts: IntCounterVec,
    gate_rejections: IntCounterVec,
}

impl AuthMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let login_attempts = IntCounterVec::new(
            Opts::new(
                "auth_login_attempts_total",
                "Count of login attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(login_attempts.clone()))?;

        let gate_rejections = IntCounterVec::new(
            Opts::new(
                "auth_gate_rejections_total",
                "Count of requests rejected by a claims gate grouped by gate and reason",
            ),
            &["gate", "reason"],
        )?;
        registry.register(Box::new(gate_rejections.clone()))?;

        Ok(Self {
            registry,
            login_attempts,
            gate_rejections,
        })
    }

    pub fn login_attempt(&self, outcome: &str) {
        self.login_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn gate_rejection(&self, gate: &str, reason: &str) {
        self.gate_rejections.with_label_values(&[gate, reason]).inc();
    }

    pub fn login_attempts(&self, outcome: &str) -> u64 {
        self.login_attempts.with_label_values(&[outcome]).get()
    }

    pub fn gate_rejections(&self, gate: &str, reason: &str) -> u64 {
        self.gate_rejections.with_label_values(&[gate, reason]).get()
    }

    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}
