//! WebSocket transport for the RPC engine.
//!
//! The socket is split in two: the write half becomes a [`Transport`] the
//! engine sends requests through, and the read half is drained by a listener
//! task that feeds every frame to the scope's [`Dispatcher`].
//!
//! # Thread Safety
//!
//! The write half sits behind a tokio `Mutex`, so concurrent calls from
//! multiple tasks are serialized frame by frame.

use crate::rpc::{Dispatcher, Transport};
use crate::{Result, RpcError};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, warn};
use url::Url;

/// Client socket as returned by [`connect`].
pub type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open a WebSocket to `url`, authenticating with a bearer token if given.
pub async fn connect(url: &Url, auth_token: Option<&str>) -> Result<ClientStream> {
    let mut request = url.as_str().into_client_request()?;
    if let Some(token) = auth_token {
        let value =
            HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| RpcError::Config {
                message: format!("Invalid auth token: {}", e),
            })?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (stream, response) = connect_async(request).await?;
    debug!(%url, status = %response.status(), "WebSocket connected");
    Ok(stream)
}

/// Write half of a WebSocket used as the engine's transport.
pub struct WebSocketTransport<S> {
    sink: Mutex<SplitSink<WebSocketStream<S>, WsMessage>>,
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(sink: SplitSink<WebSocketStream<S>, WsMessage>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Send a close frame. Errors from an already closed socket are ignored.
    pub async fn close(&self) {
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            debug!("WebSocket close: {}", e);
        }
    }
}

#[async_trait::async_trait]
impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, message: String) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.send(WsMessage::Text(message)).await?;
        Ok(())
    }
}

/// Spawn the listener that feeds inbound frames to `dispatcher`.
///
/// The task ends when the peer closes the socket, a read fails, or a
/// response arrives for an id nobody is waiting for; in every case it
/// detaches the scope before returning.
pub fn spawn_listener<S>(
    source: SplitStream<WebSocketStream<S>>,
    dispatcher: Dispatcher,
) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(listen(source, dispatcher))
}

async fn listen<S>(mut source: SplitStream<WebSocketStream<S>>, dispatcher: Dispatcher)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    while let Some(frame) = source.next().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!("Dropping binary frame with invalid UTF-8");
                    continue;
                }
            },
            Ok(WsMessage::Close(frame)) => {
                debug!(?frame, "WebSocket closed by peer");
                break;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!("WebSocket read failed: {}", e);
                break;
            }
        };

        match dispatcher.dispatch(&text) {
            Ok(()) => {}
            Err(RpcError::MalformedMessage { message }) => {
                warn!("Dropping malformed message: {}", message);
            }
            Err(RpcError::NotAttached) => break,
            Err(e) if e.is_fatal() => {
                error!("Closing connection: {}", e);
                break;
            }
            Err(e) => warn!("Dispatch failed: {}", e),
        }
    }

    if dispatcher.detach() {
        debug!("Listener detached connection scope");
    }
}
