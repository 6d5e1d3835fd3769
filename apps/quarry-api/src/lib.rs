pub mod routes;
pub mod state;

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;
use tokio::{net::TcpListener, task::JoinHandle, time::MissedTickBehavior};

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = quarry_cli::VERSION,
	rename_all = "kebab",
	styles = quarry_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = quarry_config::load(&args.config)?;

	quarry_cli::init_tracing(&config.service.log_level)?;

	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let probe_interval = config.query.probe_interval_ms.map(Duration::from_millis);
	let state = AppState::new(config).await;

	if let Some(every) = probe_interval {
		spawn_readiness_probe(state.clone(), every);
	}

	let app = routes::router(state);
	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	axum::serve(http_listener, app).await?;

	Ok(())
}

/// Re-probes model readiness on a fixed interval for the lifetime of the process.
pub fn spawn_readiness_probe(state: AppState, every: Duration) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(every);

		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
		// The first tick completes immediately and startup already probed once.
		ticker.tick().await;

		loop {
			ticker.tick().await;

			let ready = state.service.refresh_model().await;

			tracing::debug!(ready, "Model readiness refreshed.");
		}
	})
}
