use std::{
    net::{Ipv4Addr, SocketAddr},
    ops::RangeInclusive,
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use drawtopo::{api, config, logging, topology::TopologyService};
use tokio::net::TcpListener;

/// Ports tried in order when `SERVER_PORT` is not set.
const FALLBACK_PORTS: RangeInclusive<u16> = 4100..=4199;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing();
    let config = config::get_config();

    let service = TopologyService::from_config(config);
    let app = api::create_router(Arc::new(service));

    let listener = bind_listener(config.server_port).await?;
    let address = listener.local_addr()?;
    tracing::info!(%address, "Topology server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated")
}

/// Bind the configured port, or the first free port in [`FALLBACK_PORTS`].
async fn bind_listener(port: Option<u16>) -> Result<TcpListener> {
    if let Some(port) = port {
        return TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
            .await
            .with_context(|| format!("binding port {port}"));
    }

    for port in FALLBACK_PORTS {
        match TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await {
            Ok(listener) => return Ok(listener),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port in use");
            }
            Err(err) => return Err(err).with_context(|| format!("binding port {port}")),
        }
    }
    bail!(
        "no free port between {} and {}",
        FALLBACK_PORTS.start(),
        FALLBACK_PORTS.end()
    )
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
