//! Nodelink CLI - query a data availability node over its JSON-RPC socket.
//!
//! Results are printed to stdout as JSON; logs go to stderr.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nodelink_core::{Client, ClientOptions, RpcConfig};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "nodelink")]
#[command(about = "JSON-RPC client for a data availability node")]
struct Args {
    /// Node RPC host
    #[arg(long, default_value = RpcConfig::DEFAULT_HOST)]
    host: String,

    /// Node RPC port
    #[arg(short, long, default_value_t = RpcConfig::DEFAULT_PORT)]
    port: u16,

    /// Bearer token for the node's RPC auth
    #[arg(long, env = RpcConfig::AUTH_TOKEN_ENV, hide_env_values = true)]
    auth_token: Option<String>,

    /// Seconds to wait for each response
    #[arg(long, default_value_t = RpcConfig::DEFAULT_RESPONSE_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Height and hash of the node's local head
    Head,
    /// Balance of the node's account
    Balance,
    /// Connected peers
    Peers,
    /// Data availability sampling statistics
    SamplingStats,
    /// Stream new headers as they arrive
    SubscribeHeaders {
        /// Stop after this many headers
        #[arg(long)]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs on stderr so stdout stays machine readable. RUST_LOG overrides --debug.
    let default_level = if args.debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut options = ClientOptions::default()
        .with_host(args.host)
        .with_port(args.port)
        .with_response_timeout(Duration::from_secs(args.timeout_secs));
    if let Some(token) = args.auth_token {
        options = options.with_auth_token(token);
    }
    debug!("Connecting with {:?}", options.url()?);

    let connection = Client::new(options).connect().await?;
    let result = commands::run(&connection.api(), args.command).await;
    connection.close().await;
    result
}
