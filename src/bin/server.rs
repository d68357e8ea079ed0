//! sleep-skip-server binary
//!
//! Runs the sleep engine against an in-memory world server and feeds it
//! JSON-lines events from stdin (see `sleep_skip::protocol`).
//!
//! ## Configuration (CLI / env, plus the settings file via `config` crate)
//!
//! | Key                   | Default           | Description                       |
//! |-----------------------|-------------------|-----------------------------------|
//! | `SLEEP_CONFIG`        | `sleep.toml`      | Settings file (optional)          |
//! | `SLEEP_TICK_RATE_HZ`  | `20`              | Server tick rate                  |
//! | `SLEEP_WORLDS`        | `world`           | Overworlds loaded at startup      |
//! | `SLEEP_*`             |                   | Any `SleepSettings` field         |

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use sleep_skip::{
    driver::{SleepAgent, SleepAgentConfig},
    local::{LocalServer, LocalServerConfig},
    protocol::{HostEvent, NIGHTFALL},
    settings::SleepSettings,
    types::{WorldKey, WorldKind},
    SleepEvaluator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "sleep-skip-server", about = "Skip the night when enough players sleep", version)]
struct Args {
    /// Settings file (TOML)
    #[arg(long, env = "SLEEP_CONFIG", default_value = "sleep.toml")]
    config: PathBuf,

    /// Tick rate (Hz)
    #[arg(long, env = "SLEEP_TICK_RATE_HZ", default_value_t = 20.0)]
    tick_rate_hz: f32,

    /// Overworlds to load at startup
    #[arg(long = "world", env = "SLEEP_WORLDS", value_delimiter = ',', default_value = "world")]
    worlds: Vec<String>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sleep_skip=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let settings = SleepSettings::load(Some(args.config.as_path()))
        .with_context(|| format!("invalid settings in {}", args.config.display()))?;

    tracing::info!(
        config = %args.config.display(),
        tick_rate_hz = args.tick_rate_hz,
        worlds = ?args.worlds,
        "starting sleep-skip-server"
    );

    let evaluator = SleepEvaluator::new(&settings).context("invalid sleep settings")?;

    let mut server = LocalServer::new(LocalServerConfig::default());
    for name in &args.worlds {
        server.load_world(WorldKey::new(name.as_str()), WorldKind::Overworld, NIGHTFALL);
    }
    let server = Arc::new(Mutex::new(server));

    let agent = SleepAgent::new(
        SleepAgentConfig {
            tick_rate_hz: args.tick_rate_hz,
        },
        evaluator,
        server,
    );

    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match HostEvent::parse_line(&line) {
                    Some(Ok(event)) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => tracing::warn!("ignoring malformed event: {}", e),
                    None => {}
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });

    let stats = agent.run(rx).await?;
    tracing::info!(
        nights = stats.completed_nights,
        ticks = stats.total_ticks,
        "sleep-skip-server stopped"
    );
    Ok(())
}
