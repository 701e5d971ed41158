//! warelay — forwards WhatsApp messages to a processing backend as
//! normalized JSON records.

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::Parser,
    tokio::sync::mpsc,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    url::Url,
};

use {
    warelay_delivery::DeliveryClient,
    warelay_ingest::Pipeline,
    warelay_session::{
        DEFAULT_SIDECAR_PORT, SidecarDirectory, SidecarHandle, SidecarSettings, find_sidecar_dir,
        start_sidecar,
    },
};

#[derive(Parser)]
#[command(name = "warelay", about = "WhatsApp → backend ingestion relay")]
struct Cli {
    /// Backend endpoint receiving normalized messages.
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:8080/ingest")]
    backend_url: Url,

    /// Port of the sidecar WebSocket server.
    #[arg(long, env = "WARELAY_SIDECAR_PORT", default_value_t = DEFAULT_SIDECAR_PORT)]
    sidecar_port: u16,

    /// Directory containing the sidecar code (auto-detected when omitted).
    #[arg(long, env = "WARELAY_SIDECAR_DIR")]
    sidecar_dir: Option<PathBuf>,

    /// Directory holding the WhatsApp session credentials (encryption keys
    /// and pairing state only — no messages are stored).
    #[arg(long, env = "WARELAY_AUTH_DIR", default_value = "warelay-auth")]
    auth_dir: PathBuf,

    /// Attach to an externally managed sidecar instead of spawning one.
    #[arg(long, default_value_t = false)]
    no_sidecar: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "warelay starting");

    // The sidecar owns the protocol session; everything downstream is ours.
    let mut sidecar_process = if cli.no_sidecar {
        None
    } else {
        let dir = find_sidecar_dir(cli.sidecar_dir.as_deref()).context("locating sidecar")?;
        let settings = SidecarSettings {
            dir,
            port: cli.sidecar_port,
            auth_dir: cli.auth_dir.clone(),
        };
        Some(
            start_sidecar(&settings)
                .await
                .context("starting sidecar process")?,
        )
    };

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let handle = SidecarHandle::connect(cli.sidecar_port, cli.auth_dir.clone(), events_tx)
        .await
        .context("connecting to sidecar")?;

    let delivery =
        DeliveryClient::new(cli.backend_url.clone()).context("building delivery client")?;
    info!(endpoint = %cli.backend_url, "forwarding normalized messages");

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(SidecarDirectory::new(Arc::new(handle))),
        delivery,
    ));
    let worker = tokio::spawn(pipeline.run(events_rx));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down; in-flight deliveries may be abandoned");

    if let Some(process) = sidecar_process.as_mut() {
        process.stop().await.context("stopping sidecar process")?;
    }
    worker.abort();

    Ok(())
}
