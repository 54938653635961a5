use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use gate_service::config::load_service_config;
use gate_service::telemetry::init_tracing;
use gate_service::{build_router, build_state};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_service_config()?;
    init_tracing(config.log_format);
    if config.uses_default_secret() {
        warn!("JWT_SIGNING_SECRET not set, falling back to the insecure default secret");
    }

    let state = build_state(&config)?;
    let app = build_router(state);

    let ip: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST '{}'", config.host))?;
    let addr = SocketAddr::from((ip, config.port));

    info!(%addr, issuer = %config.issuer, "starting gate-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
