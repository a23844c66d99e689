//! `coze-relay` binary: reads configuration, validates key material, and serves inbound messages.

// crates.io
use clap::Parser;
use color_eyre::Result;
use tokio::net::TcpListener;
// self
use coze_relay::{config::RelayConfig, obs, server};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	obs::install_subscriber();

	let config = RelayConfig::parse();
	let relay = config.build_relay()?;
	let addr = config.listen_addr();
	let listener = TcpListener::bind(addr).await?;

	tracing::info!(%addr, flow = ?config.exchange_flow, "relay listening");

	server::serve(listener, relay, shutdown_signal()).await?;

	tracing::info!("relay stopped");

	Ok(())
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %err, "failed to listen for shutdown signal");

		std::future::pending::<()>().await;
	}
}
