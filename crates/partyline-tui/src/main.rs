//! Partyline entry point.

use std::{error::Error, fs::File, path::PathBuf, sync::Arc};

use clap::Parser;
use partyline_relay::{
    END_OF_SESSION, MemoryBus, NoticeSender, OffsetReset, Relay, RelayConfig,
};
use partyline_tui::Runtime;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Partyline terminal chat client
#[derive(Parser, Debug)]
#[command(name = "partyline")]
#[command(about = "Terminal chat over a topic-based message bus")]
#[command(version)]
struct Args {
    /// Kafka bootstrap servers, `host:port` comma-separated
    ///
    /// If not provided, runs in loopback mode against an in-process bus.
    #[arg(short, long)]
    brokers: Option<String>,

    /// Topic to chat on
    #[arg(short, long, default_value = "partyline")]
    topic: String,

    /// Consumer group identity
    #[arg(short, long, default_value = "partyline-client")]
    group_id: String,

    /// Read position when the group has no committed offset
    #[arg(long, default_value_t = OffsetReset::Earliest)]
    offset_reset: OffsetReset,

    /// Payload that ends the session when received
    #[arg(long, default_value = END_OF_SESSION)]
    end_token: String,

    /// Write logs to this file (the terminal itself is taken over by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        init_tracing(path)?;
    }

    let mut config = RelayConfig::new(args.topic, args.group_id);
    config.offset_reset = args.offset_reset;
    config.termination_token = args.end_token;

    match args.brokers {
        Some(brokers) => {
            config.bootstrap_servers = brokers;
            run_kafka(config).await
        },
        None => run_loopback(config).await,
    }
}

/// Chat against the in-process loopback bus.
///
/// Everything typed is published and immediately consumed back, so the
/// full relay path is exercised without a broker.
async fn run_loopback(config: RelayConfig) -> Result<(), Box<dyn Error>> {
    let bus = MemoryBus::new();
    let (producer, consumer) = bus.connect(&config);
    let (sink, notices) = NoticeSender::channel();

    let topic = config.topic.clone();
    let relay = Relay::start(config, producer, consumer, sink)?;
    Ok(Runtime::new(topic, relay, notices)?.run().await?)
}

/// Chat against a real Kafka cluster.
#[cfg(feature = "kafka")]
async fn run_kafka(config: RelayConfig) -> Result<(), Box<dyn Error>> {
    let (producer, consumer) = partyline_relay::bus::kafka::connect(&config)?;
    let (sink, notices) = NoticeSender::channel();

    let topic = config.topic.clone();
    let relay = Relay::start(config, producer, consumer, sink)?;
    Ok(Runtime::new(topic, relay, notices)?.run().await?)
}

#[cfg(not(feature = "kafka"))]
async fn run_kafka(_config: RelayConfig) -> Result<(), Box<dyn Error>> {
    Err("this build has no Kafka support; rebuild with --features kafka".into())
}

/// Route logs to a file; stdout belongs to the UI.
fn init_tracing(path: &std::path::Path) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        .with(filter)
        .init();
    Ok(())
}
