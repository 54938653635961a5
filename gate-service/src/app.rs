use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{
    extract::{FromRef, Request, State},
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use common_auth::{claims::resolve_path, AuthContext, ClaimsGate};
use serde_json::Value;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::auth_handlers::{login, whoami};
use crate::book_handlers::{create_book, get_book, list_books, BookStore};
use crate::config::ServiceConfig;
use crate::home_handlers::{echo_identity, health, home, metrics_endpoint};
use crate::metrics::AuthMetrics;
use crate::store::StaticCredentialStore;
use crate::tokens::TokenIssuer;

pub const STANDARD_GATE: &str = "standard";
pub const ADMIN_GATE: &str = "admin";

#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub standard_gate: Arc<ClaimsGate>,
    pub admin_gate: Arc<ClaimsGate>,
    pub metrics: Arc<AuthMetrics>,
    pub books: BookStore,
}

impl FromRef<AppState> for Arc<TokenIssuer> {
    fn from_ref(state: &AppState) -> Self {
        state.issuer.clone()
    }
}

impl FromRef<AppState> for Arc<AuthMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

impl FromRef<AppState> for BookStore {
    fn from_ref(state: &AppState) -> Self {
        state.books.clone()
    }
}

impl AppState {
    pub fn record_login_metric(&self, outcome: &str) {
        self.metrics.login_attempt(outcome);
    }
}

/// Wire the issuer and both gates from a loaded config. Accounts come from the demo store.
pub fn build_state(config: &ServiceConfig) -> Result<AppState> {
    let store = StaticCredentialStore::demo()?;
    let issuer = TokenIssuer::new(&config.signing_secret, config.token_config(), Arc::new(store));

    let standard_gate = ClaimsGate::builder(
        STANDARD_GATE,
        config.jwt_config(),
        config.standard_claims.clone(),
    )
    .with_forward_map(config.forward_claims.clone())
    .with_token_lookup(config.token_lookup.clone())
    .build();

    let admin_gate = ClaimsGate::builder(ADMIN_GATE, config.jwt_config(), config.admin_claims.clone())
        .with_forward_map(config.forward_claims.clone())
        .with_token_lookup(config.token_lookup.clone())
        .with_validator(require_subject)
        .build();

    for gate in [&standard_gate, &admin_gate] {
        info!(
            gate = gate.name(),
            predicate = %gate.predicate(),
            lookup = ?gate.lookup(),
            "Claims gate configured"
        );
    }

    Ok(AppState {
        issuer: Arc::new(issuer),
        standard_gate: Arc::new(standard_gate),
        admin_gate: Arc::new(admin_gate),
        metrics: Arc::new(AuthMetrics::new()?),
        books: BookStore::seeded(),
    })
}

/// Admin tokens must name a subject.
fn require_subject(claims: &Value) -> Result<(), String> {
    match resolve_path(claims, "sub").and_then(Value::as_str) {
        Some(subject) if !subject.trim().is_empty() => Ok(()),
        _ => Err("token has no subject".to_string()),
    }
}

pub fn build_router(state: AppState) -> Router {
    let standard_guard = GateGuard::new(state.standard_gate.clone(), state.metrics.clone());
    let admin_guard = GateGuard::new(state.admin_gate.clone(), state.metrics.clone());

    let core_routes = Router::new()
        .route("/core/whoami", post(whoami))
        .route_layer(middleware::from_fn_with_state(standard_guard, require_claims));
    let admin_routes = Router::new()
        .route("/admin/books", post(create_book))
        .route_layer(middleware::from_fn_with_state(admin_guard, require_claims));

    Router::new()
        .route("/", get(home))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/whoami", get(echo_identity))
        .route("/auth/login", post(login))
        .route("/api/books", get(list_books))
        .route("/api/books/:id", get(get_book))
        .merge(core_routes)
        .merge(admin_routes)
        .with_state(state)
        .layer(middleware::from_fn(log_request))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    let allowed_origins = [
        "http://localhost:3000",
        "http://localhost:3001",
        "http://localhost:5173",
    ];

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION])
}

/// Gate plus the metrics sink it reports rejections to.
#[derive(Clone)]
pub struct GateGuard {
    gate: Arc<ClaimsGate>,
    metrics: Arc<AuthMetrics>,
}

impl GateGuard {
    pub fn new(gate: Arc<ClaimsGate>, metrics: Arc<AuthMetrics>) -> Self {
        Self { gate, metrics }
    }
}

pub async fn require_claims(
    State(guard): State<GateGuard>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    match guard.gate.authorize_parts(&parts) {
        Ok(claims) => {
            parts
                .extensions
                .insert(AuthContext::new(guard.gate.name(), claims));
            next.run(Request::from_parts(parts, body)).await
        }
        Err(err) => {
            warn!(
                gate = guard.gate.name(),
                reason = err.kind(),
                error = %err,
                path = %parts.uri.path(),
                "Claims gate rejected request"
            );
            guard.metrics.gate_rejection(guard.gate.name(), err.kind());
            err.into_response()
        }
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request handled"
    );
    response
}
