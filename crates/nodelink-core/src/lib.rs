//! Nodelink Core - JSON-RPC client for a data-availability node.
//!
//! One persistent WebSocket carries every call and subscription. The
//! [`RpcEngine`] correlates responses to the calls that issued them and fans
//! subscription notifications out to independent streams; the [`api`]
//! facades put typed methods on top.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use nodelink_core::{Client, ClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> nodelink_core::Result<()> {
//!     let client = Client::new(ClientOptions::default().with_auth_token("..."));
//!     let connection = client.connect().await?;
//!     let api = connection.api();
//!
//!     let balance = api.state().balance().await?;
//!     println!("{} {}", balance.amount, balance.denom);
//!
//!     let mut headers = api.header().subscribe().await?;
//!     while let Some(header) = headers.next().await {
//!         println!("new head: {}", header?.height());
//!     }
//!
//!     connection.close().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod rpc;
pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use api::NodeApi;
pub use client::{Client, ClientOptions, Connection};
pub use config::{EngineConfig, RpcConfig};
pub use error::{Result, RpcError};
pub use rpc::{ConnectionScope, Dispatcher, RpcEngine, Subscription, Transport};
pub use types::Base64;
