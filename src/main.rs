use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use unvr_exporter::collectors::nvr::NvrCollector;
use unvr_exporter::config::{Config, FileConfig};
use unvr_exporter::registry::DeviceRegistry;
use unvr_exporter::scheduler::spawn_refresh_loop;
use unvr_exporter::server::{self, AppState};
use unvr_exporter::session::Session;

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_logging(config.json_logs);

    let file = FileConfig::load(&config.config)?;
    let descriptors = file.descriptors(&config.config)?;
    let addr = config.bind_addr(&file)?;

    let mut devices = DeviceRegistry::new();
    let mut loops = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let period = descriptor.poll_interval;
        let session = Session::connect(descriptor, config.request_timeout())?;
        let collector = Arc::new(NvrCollector::new(session, config.staleness()));
        devices.register(collector.clone());
        loops.push(spawn_refresh_loop(collector, period));
    }

    tracing::info!(devices = loops.len(), %addr, "unvr-exporter starting");

    let state = Arc::new(AppState::new(devices));
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutting down gracefully");
    };
    let served = server::serve(addr, state, shutdown).await;

    for handle in loops {
        handle.abort();
    }
    served
}
