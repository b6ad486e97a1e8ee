//! feedcast command line
//!
//! ```text
//! feedcast relay   [--ws-uri <uri>] [--local-host <host>] [--local-port <port>]
//!                  [--filter-text <keyword>] [--filter-lang <en,de,...>]
//! feedcast consume [--host <host>] [--port <port>]
//!                  [--retry-interval-ms <ms>] [--poll-interval-ms <ms>]
//! ```
//!
//! Logging is controlled with `RUST_LOG` (default `feedcast=info`).

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use feedcast::client::{ConsumerConfig, ReconnectingConsumer};
use feedcast::filter::FilterConfig;
use feedcast::ingest::{IngestAdapter, IngestConfig, DEFAULT_JETSTREAM_URI};
use feedcast::protocol::Frame;
use feedcast::registry::RegistryConfig;
use feedcast::server::{RelayServer, ServerConfig};

#[derive(Parser)]
#[command(
    name = "feedcast",
    about = "Relay a filtered Jetstream feed to TCP subscribers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the upstream feed and broadcast matching posts
    Relay {
        /// Jetstream WebSocket URI
        #[arg(long, default_value = DEFAULT_JETSTREAM_URI)]
        ws_uri: String,
        /// Interface subscribers connect to
        #[arg(long, default_value = "127.0.0.1")]
        local_host: String,
        /// TCP port subscribers connect to
        #[arg(long, default_value_t = 12345)]
        local_port: u16,
        /// Only forward posts whose text contains this keyword
        #[arg(long, default_value = "")]
        filter_text: String,
        /// Comma-separated languages, a post must carry any of them
        #[arg(long, default_value = "")]
        filter_lang: String,
        /// Refuse subscribers beyond this count (0 = unlimited)
        #[arg(long, default_value_t = 0)]
        max_subscribers: usize,
    },

    /// Connect to a relay and log every frame received
    Consume {
        /// Relay host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Relay port
        #[arg(long, default_value_t = 12345)]
        port: u16,
        /// Minimum time between connection attempts
        #[arg(long, default_value_t = 2000)]
        retry_interval_ms: u64,
        /// How often the socket is polled
        #[arg(long, default_value_t = 16)]
        poll_interval_ms: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("feedcast=info")),
        )
        .init();

    match cli.command {
        Commands::Relay {
            ws_uri,
            local_host,
            local_port,
            filter_text,
            filter_lang,
            max_subscribers,
        } => {
            let addr = resolve(&local_host, local_port).await?;
            let filter = FilterConfig::from_args(&filter_text, &filter_lang);
            run_relay(addr, ws_uri, filter, max_subscribers).await?;
        }
        Commands::Consume {
            host,
            port,
            retry_interval_ms,
            poll_interval_ms,
        } => {
            let config = ConsumerConfig::new(format!("{}:{}", host, port))
                .retry_interval(Duration::from_millis(retry_interval_ms));
            run_consumer(config, Duration::from_millis(poll_interval_ms)).await;
        }
    }

    Ok(())
}

async fn resolve(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("no address found for {}", host),
            )
        })
}

async fn run_relay(
    addr: SocketAddr,
    ws_uri: String,
    filter: FilterConfig,
    max_subscribers: usize,
) -> feedcast::Result<()> {
    let config = ServerConfig::with_addr(addr);
    let (tx, rx) = mpsc::channel(config.record_channel_capacity);

    let server = RelayServer::bind_with_registry_config(
        config,
        RegistryConfig::default().max_subscribers(max_subscribers),
    )
    .await?;
    let adapter = IngestAdapter::new(IngestConfig::new(ws_uri), filter);

    let result = server
        .run_until(rx, adapter.run(tx), async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    let ingest = adapter.stats().snapshot();
    tracing::info!(
        received = ingest.messages_received,
        skipped = ingest.messages_skipped,
        matched = ingest.records_matched,
        "Ingestion summary"
    );

    result
}

async fn run_consumer(config: ConsumerConfig, poll_interval: Duration) {
    let mut consumer = ReconnectingConsumer::new(config);
    let (tx, mut rx) = mpsc::channel::<Frame>(256);

    let print = async move {
        while let Some(frame) = rx.recv().await {
            tracing::info!(text = %frame.text, "Frame received");
        }
    };

    tokio::select! {
        _ = consumer.run(tx, poll_interval) => {}
        _ = print => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    consumer.disconnect();
    let stats = consumer.stats();
    tracing::info!(
        frames = stats.frames_received,
        connects = stats.connects,
        disconnects = stats.disconnects,
        "Consumer stopped"
    );
}
