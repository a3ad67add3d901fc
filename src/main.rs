//! Athlete Vitals Agent CLI
//!
//! Serves the monitor and game over HTTP, or probes the broker once.

use anyhow::Context;
use athlete_vitals_agent::{
    classify::{classify_heart_rate, classify_saturation},
    config::MonitorConfig,
    monitor::AthleteMonitor,
    scheduler,
    server::{self, AppState},
    telemetry::{BrokerConfig, OrionSource, TelemetrySource},
    VERSION,
};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "athlete-vitals")]
#[command(version = VERSION)]
#[command(about = "Athlete vitals monitor and pass-game scorer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct BrokerArgs {
    /// Base URL of the Orion context broker
    #[arg(long, default_value = "http://127.0.0.1:1026")]
    broker_url: String,

    /// Entity id of the tracked athlete
    #[arg(long, default_value = "urn:ngsi-ld:Atleta:0001")]
    entity_id: String,

    /// fiware-service header value
    #[arg(long, default_value = "smart")]
    service: String,

    /// fiware-servicepath header value
    #[arg(long, default_value = "/")]
    service_path: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server with the background refresh scheduler
    Serve {
        #[command(flatten)]
        broker: BrokerArgs,

        /// Address to bind the HTTP server to
        #[arg(long, default_value = "127.0.0.1:8000")]
        listen: SocketAddr,

        /// Initial refresh interval in seconds (1-60)
        #[arg(long, default_value = "2")]
        refresh_interval: u64,

        /// Initial history bound (10-1000)
        #[arg(long, default_value = "50")]
        history_limit: usize,
    },

    /// Fetch and classify one reading, then exit
    Probe {
        #[command(flatten)]
        broker: BrokerArgs,
    },
}

impl BrokerArgs {
    fn into_config(self) -> BrokerConfig {
        BrokerConfig {
            base_url: self.broker_url,
            service: self.service,
            service_path: self.service_path,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "athlete_vitals_agent=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            broker,
            listen,
            refresh_interval,
            history_limit,
        } => cmd_serve(broker, listen, refresh_interval, history_limit).await,
        Commands::Probe { broker } => cmd_probe(broker).await,
    }
}

async fn cmd_serve(
    broker: BrokerArgs,
    listen: SocketAddr,
    refresh_interval: u64,
    history_limit: usize,
) -> anyhow::Result<()> {
    let entity_id = broker.entity_id.clone();
    let source = OrionSource::new(broker.into_config()).context("building broker client")?;

    let config = MonitorConfig {
        refresh_interval_secs: refresh_interval,
        history_limit,
        ..MonitorConfig::default()
    };
    config.validate().context("invalid startup configuration")?;

    let monitor = Arc::new(AthleteMonitor::new(entity_id, config, Box::new(source)));

    // Prime the cache so the first game pass does not race the scheduler.
    if !monitor.refresh().await {
        tracing::warn!("initial telemetry fetch failed, scheduler will retry");
    }

    let scheduler = scheduler::spawn(monitor.clone());
    let state = Arc::new(AppState::new(monitor));
    let (addr, server_shutdown) = server::run(listen, state).await?;

    tracing::info!("ready on http://{addr}, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;

    tracing::info!("shutting down");
    let _ = server_shutdown.send(());
    scheduler.shutdown().await;

    Ok(())
}

async fn cmd_probe(broker: BrokerArgs) -> anyhow::Result<()> {
    let entity_id = broker.entity_id.clone();
    let source = OrionSource::new(broker.into_config()).context("building broker client")?;

    let raw = source
        .fetch(&entity_id)
        .await
        .context("fetching athlete entity")?;
    let reading = athlete_vitals_agent::telemetry::Reading::from_raw(raw);

    let config = MonitorConfig::default();
    let hr = classify_heart_rate(reading.heart_rate, &config.heart_rate_bands);
    let sat = classify_saturation(reading.saturation, &config.saturation_bands);

    println!("Athlete: {} ({})", reading.subject_id, reading.type_tag);
    println!("Heart rate: {} bpm ({:?}, {:?})", reading.heart_rate, hr.status, hr.alert);
    println!(
        "Saturation: {:.1}% ({:?}, {:?})",
        reading.saturation, sat.status, sat.alert
    );
    println!("Blink: {}", reading.blink);
    if !reading.source_instant.is_empty() {
        println!("Reported at: {}", reading.source_instant);
    }

    Ok(())
}
