//! remote-hand: let one client drive this machine's keyboard and mouse.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use remote_hand_agent::{setup, Agent};
use remote_hand_input::{InputCapture, Platform};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "remote-hand",
    about = "Accept one client and inject its keyboard and mouse input",
    version
)]
struct Cli {
    /// Address to listen at [default: localhost]. Set to 0.0.0.0 to allow
    /// connections from other machines.
    #[arg(short, long)]
    address: Option<String>,

    /// Port to listen at [default: 12345].
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config_path();
    let found = config_path.exists();
    let mut config = setup::load_config(Some(&config_path))?;
    if let Some(address) = cli.address {
        config.server.address = address;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    if found {
        info!(path = %config_path.display(), "loaded config");
    } else {
        info!(path = %config_path.display(), "no config file found, using defaults");
    }
    info!(
        address = %config.server.address,
        port = config.server.port,
        "starting remote-hand agent"
    );

    let (platform, capture) = backend()?;
    let agent = Agent::bind(config, platform, capture).await?;

    let shutdown = agent.shutdown_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("stopping remote-hand agent");
            let _ = shutdown.send(()).await;
        }
    });

    if let Err(e) = agent.run().await {
        error!(error = %e, "remote-hand agent stopped");
        return Err(e.into());
    }
    Ok(())
}

impl Cli {
    /// The config file to read: `--config`, or the per-user default.
    fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(setup::default_config_path)
    }
}

#[cfg(feature = "linux")]
fn backend() -> anyhow::Result<(Arc<dyn Platform>, Box<dyn InputCapture>)> {
    use anyhow::Context;
    use remote_hand_input::linux::{EvdevCapture, UinputPlatform};

    let platform = UinputPlatform::new().context("failed to set up uinput injection")?;
    let mut capture = EvdevCapture::new();
    if let Some(node) = platform.device_node() {
        capture = capture.with_device(node.clone());
    }
    Ok((Arc::new(platform), Box::new(capture)))
}

#[cfg(not(feature = "linux"))]
fn backend() -> anyhow::Result<(Arc<dyn Platform>, Box<dyn InputCapture>)> {
    anyhow::bail!("no input backend compiled in; rebuild with the `linux` feature")
}
