//! Subcommand handlers.

use crate::Command;
use anyhow::{Context, Result};
use futures::StreamExt;
use nodelink_core::types::ExtendedHeader;
use nodelink_core::NodeApi;
use serde::Serialize;
use tracing::info;

/// Height and hash, the part of a header worth printing by default.
#[derive(Debug, Serialize)]
struct HeadSummary {
    height: u64,
    hash: String,
}

impl From<&ExtendedHeader> for HeadSummary {
    fn from(header: &ExtendedHeader) -> Self {
        Self {
            height: header.height(),
            hash: header.hash().to_string(),
        }
    }
}

pub async fn run(api: &NodeApi, command: Command) -> Result<()> {
    match command {
        Command::Head => {
            let head = api.header().local_head().await?;
            print_json(&HeadSummary::from(&head))
        }
        Command::Balance => print_json(&api.state().balance().await?),
        Command::Peers => print_json(&api.p2p().peers().await?),
        Command::SamplingStats => print_json(&api.das().sampling_stats().await?),
        Command::SubscribeHeaders { count } => subscribe_headers(api, count).await,
    }
}

async fn subscribe_headers(api: &NodeApi, count: Option<usize>) -> Result<()> {
    let mut headers = api.header().subscribe().await?;
    let mut seen = 0usize;

    loop {
        if count.is_some_and(|limit| seen >= limit) {
            break;
        }
        tokio::select! {
            header = headers.next() => match header {
                Some(header) => {
                    let header = header.context("Failed to decode header")?;
                    print_json(&HeadSummary::from(&header))?;
                    seen += 1;
                }
                None => {
                    info!("Header subscription ended");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
