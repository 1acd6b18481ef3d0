mod authority;
mod bots;
mod config;
mod events;
mod server;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tokio::time::MissedTickBehavior;

use config::ServerConfig;
use server::GameServer;

#[derive(Parser)]
#[command(name = "clash-server")]
#[command(about = "Authoritative prediction and collision arbitration server with simulated clients")]
struct Args {
    #[arg(long, help = "JSON tuning file; command-line values override it")]
    config: Option<PathBuf>,

    #[arg(short, long)]
    tick_rate: Option<u32>,

    #[arg(short, long, help = "Number of simulated clients")]
    clients: Option<usize>,

    #[arg(short, long, help = "Stop after this many seconds instead of waiting for Ctrl-C")]
    seconds: Option<f32>,

    #[arg(long, help = "One-way latency in ms")]
    latency_ms: Option<u32>,

    #[arg(long, help = "Jitter in ms")]
    jitter_ms: Option<u32>,

    #[arg(long, help = "Loss percentage for unreliable messages (0-100)")]
    loss_percent: Option<f32>,

    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<(ServerConfig, Option<f32>)> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(tick_rate) = self.tick_rate {
            config.tick_rate = tick_rate;
        }
        if let Some(clients) = self.clients {
            config.clients = clients;
        }
        if let Some(latency) = self.latency_ms {
            config.link.min_latency_ms = latency;
            config.link.max_latency_ms = latency;
        }
        if let Some(jitter) = self.jitter_ms {
            config.link.jitter_ms = jitter;
        }
        if let Some(loss) = self.loss_percent {
            config.link.loss_percent = loss;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        config.validate()?;
        Ok((config, self.seconds))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (config, seconds) = Args::parse().into_config()?;
    log::info!(
        "Starting at {} Hz with {} clients ({} ms latency, {} ms jitter, {}% loss)",
        config.tick_rate,
        config.clients,
        config.link.min_latency_ms,
        config.link.jitter_ms,
        config.link.loss_percent
    );

    let mut server = GameServer::new(config, Instant::now());
    let mut interval = tokio::time::interval(server.tick_duration());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = async {
        match seconds {
            Some(s) => tokio::time::sleep(Duration::from_secs_f32(s)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                server.tick_once(Instant::now());
                for event in server.drain_events() {
                    event.log();
                }
            }
            _ = &mut deadline => {
                log::info!("Run time elapsed");
                break;
            }
            result = &mut shutdown => {
                result?;
                log::info!("Interrupted");
                break;
            }
        }
    }

    let stats = server.stats();
    server.shutdown();
    for event in server.drain_events() {
        event.log();
    }

    log::info!(
        "Ran {} ticks: {} collisions resolved, {} suppressed, {} abandoned",
        stats.tick,
        stats.collisions_resolved,
        stats.collisions_suppressed,
        stats.collisions_abandoned
    );
    log::info!(
        "{} reconciliations, {} extrapolated ticks, {} packets lost, {} hidden at exit",
        stats.reconciliations,
        stats.extrapolated_ticks,
        stats.packets_dropped,
        stats.hidden
    );
    log::info!(
        "Worst prediction error {:.4}, worst drift {:.4}, {} inputs rejected",
        stats.max_prediction_error,
        stats.max_drift,
        stats.rejected_inputs
    );
    Ok(())
}
