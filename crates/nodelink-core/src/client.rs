//! Connection setup for a node's RPC endpoint.
//!
//! [`Client`] holds the endpoint options; [`Client::connect`] opens the
//! WebSocket, attaches it to a fresh [`RpcEngine`] and starts the listener.
//! The returned [`Connection`] is the scope of that socket: closing or
//! dropping it fails outstanding calls and ends every subscription.

use crate::api::NodeApi;
use crate::config::{EngineConfig, RpcConfig};
use crate::rpc::{ConnectionScope, RpcEngine};
use crate::websocket::{self, spawn_listener, WebSocketTransport};
use crate::{Result, RpcError};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use url::Url;

/// Endpoint and engine options for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    pub auth_token: Option<String>,
    pub response_timeout: Duration,
    pub subscription_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: RpcConfig::DEFAULT_HOST.to_string(),
            port: RpcConfig::DEFAULT_PORT,
            auth_token: None,
            response_timeout: RpcConfig::DEFAULT_RESPONSE_TIMEOUT,
            subscription_capacity: RpcConfig::SUBSCRIPTION_QUEUE_CAPACITY,
        }
    }
}

impl ClientOptions {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_subscription_capacity(mut self, capacity: usize) -> Self {
        self.subscription_capacity = capacity;
        self
    }

    /// WebSocket URL of the endpoint.
    pub fn url(&self) -> Result<Url> {
        if self.host.is_empty() {
            return Err(RpcError::Config {
                message: "Host must not be empty".to_string(),
            });
        }
        Ok(Url::parse(&format!("ws://{}:{}", self.host, self.port))?)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_response_timeout(self.response_timeout)
            .with_subscription_capacity(self.subscription_capacity)
    }
}

/// Client for a node's JSON-RPC endpoint.
#[derive(Debug, Clone, Default)]
pub struct Client {
    options: ClientOptions,
}

impl Client {
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Open a connection to the node.
    pub async fn connect(&self) -> Result<Connection> {
        let url = self.options.url()?;
        let stream = websocket::connect(&url, self.options.auth_token.as_deref()).await?;
        info!("Connected to node at {}", url);
        Connection::from_stream(stream, self.options.engine_config())
    }
}

/// One live connection: an engine attached to a WebSocket plus the task
/// reading from it.
pub struct Connection<S = MaybeTlsStream<TcpStream>> {
    engine: RpcEngine,
    scope: Option<ConnectionScope>,
    transport: Arc<WebSocketTransport<S>>,
    listener: Option<JoinHandle<()>>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an already established WebSocket.
    pub fn from_stream(stream: WebSocketStream<S>, config: EngineConfig) -> Result<Self> {
        let (sink, source) = stream.split();
        let transport = Arc::new(WebSocketTransport::new(sink));

        let engine = RpcEngine::new(config);
        let scope = engine.attach(transport.clone())?;
        let listener = spawn_listener(source, scope.dispatcher());

        Ok(Self {
            engine,
            scope: Some(scope),
            transport,
            listener: Some(listener),
        })
    }

    /// Typed access to the node API namespaces.
    pub fn api(&self) -> NodeApi {
        NodeApi::new(self.engine.clone())
    }

    pub fn engine(&self) -> &RpcEngine {
        &self.engine
    }

    /// False once the connection was closed locally or by the peer.
    pub fn is_connected(&self) -> bool {
        self.scope.as_ref().is_some_and(|scope| scope.is_attached())
    }

    /// Close the connection, failing outstanding calls with `ConnectionClosed`.
    pub async fn close(mut self) {
        if let Some(scope) = self.scope.take() {
            scope.detach();
        }
        self.transport.close().await;
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        debug!("Connection closed");
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("engine", &self.engine)
            .field("attached", &self.scope.as_ref().map(|s| s.is_attached()))
            .finish()
    }
}
