//! End-to-end tests against a scripted WebSocket node on localhost.

use futures::{SinkExt, StreamExt};
use nodelink_core::rpc::RpcRequest;
use nodelink_core::{Client, ClientOptions, Connection, RpcError};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

enum Outbound {
    Text(String),
    Close,
}

/// Node side of one WebSocket connection.
struct MockNode {
    port: u16,
    requests: mpsc::UnboundedReceiver<RpcRequest>,
    outbound: mpsc::UnboundedSender<Outbound>,
    authorization: oneshot::Receiver<Option<String>>,
}

impl MockNode {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (request_tx, requests) = mpsc::unbounded_channel();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel();
        let (auth_tx, authorization) = oneshot::channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let capture_auth =
                |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                    let header = request
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let _ = auth_tx.send(header);
                    Ok(response)
                };
            let socket = tokio_tungstenite::accept_hdr_async(stream, capture_auth)
                .await
                .unwrap();
            let (mut sink, mut source) = socket.split();

            loop {
                tokio::select! {
                    frame = source.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            let request: RpcRequest = serde_json::from_str(&text).unwrap();
                            let _ = request_tx.send(request);
                        }
                        Some(Ok(_)) => {}
                        _ => break,
                    },
                    message = outbound_rx.recv() => match message {
                        Some(Outbound::Text(text)) => {
                            if sink.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Some(Outbound::Close) | None => {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    },
                }
            }
        });

        Self {
            port,
            requests,
            outbound,
            authorization,
        }
    }

    fn options(&self) -> ClientOptions {
        ClientOptions::default()
            .with_host("127.0.0.1")
            .with_port(self.port)
            .with_response_timeout(Duration::from_secs(10))
    }

    async fn next_request(&mut self) -> RpcRequest {
        self.requests.recv().await.expect("request received")
    }

    fn send(&self, message: Value) {
        self.send_raw(message.to_string());
    }

    fn send_raw(&self, raw: impl Into<String>) {
        self.outbound.send(Outbound::Text(raw.into())).unwrap();
    }

    fn close(&self) {
        self.outbound.send(Outbound::Close).unwrap();
    }
}

async fn connect(node: &MockNode) -> Connection {
    Client::new(node.options()).connect().await.unwrap()
}

/// Wait for the listener task to tear the connection down.
async fn wait_disconnected(connection: &Connection) {
    for _ in 0..100 {
        if !connection.is_connected() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("connection still attached");
}

#[tokio::test]
async fn test_call_round_trip() {
    let mut node = MockNode::start().await;
    let connection = connect(&node).await;
    let api = connection.api();

    let balance = tokio::spawn(async move { api.state().balance().await });
    let request = node.next_request().await;
    assert_eq!(request.method, "state.Balance");
    assert!(request.params.is_empty());

    node.send(json!({
        "jsonrpc": "2.0",
        "id": request.id,
        "result": {"amount": "1000", "denom": "utia"}
    }));

    let balance = balance.await.unwrap().unwrap();
    assert_eq!(balance.amount, 1000);
    assert_eq!(balance.denom, "utia");

    connection.close().await;
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let node = MockNode::start().await;
    let connection = Client::new(node.options().with_auth_token("s3cret"))
        .connect()
        .await
        .unwrap();

    assert_eq!(
        node.authorization.await.unwrap().as_deref(),
        Some("Bearer s3cret")
    );
    connection.close().await;
}

#[tokio::test]
async fn test_subscription_over_socket() {
    let mut node = MockNode::start().await;
    let connection = connect(&node).await;
    let engine = connection.engine().clone();

    let subscribe = tokio::spawn(async move {
        engine
            .subscribe_typed::<u64>("header.Subscribe", vec![])
            .await
    });
    let request = node.next_request().await;
    node.send(json!({"jsonrpc": "2.0", "id": request.id, "result": "sub-7"}));
    let mut stream = subscribe.await.unwrap().unwrap();

    // A malformed frame between items is dropped without ending the stream.
    node.send(json!({"jsonrpc": "2.0", "method": "header.Subscribe", "params": ["sub-7", 1]}));
    node.send_raw("{ not json");
    node.send(json!({"jsonrpc": "2.0", "method": "header.Subscribe", "params": ["sub-7", 2]}));

    assert_eq!(stream.next().await.unwrap().unwrap(), 1);
    assert_eq!(stream.next().await.unwrap().unwrap(), 2);
    assert!(connection.is_connected());

    node.close();
    assert!(stream.next().await.is_none());
    wait_disconnected(&connection).await;
}

#[tokio::test]
async fn test_unmatched_response_tears_down_connection() {
    let mut node = MockNode::start().await;
    let connection = connect(&node).await;
    let api = connection.api();

    let pending = tokio::spawn(async move { api.header().sync_wait().await });
    node.next_request().await;

    node.send(json!({"jsonrpc": "2.0", "id": "stranger", "result": null}));

    assert!(matches!(
        pending.await.unwrap(),
        Err(RpcError::ConnectionClosed)
    ));
    wait_disconnected(&connection).await;
    assert!(matches!(
        connection.api().state().balance().await,
        Err(RpcError::NotAttached)
    ));
}

#[tokio::test]
async fn test_peer_close_fails_pending_calls() {
    let mut node = MockNode::start().await;
    let connection = connect(&node).await;
    let api = connection.api();

    let pending = tokio::spawn(async move { api.das().wait_catch_up().await });
    node.next_request().await;
    node.close();

    assert!(matches!(
        pending.await.unwrap(),
        Err(RpcError::ConnectionClosed)
    ));
    wait_disconnected(&connection).await;
}

#[tokio::test]
async fn test_local_close_fails_pending_calls() {
    let mut node = MockNode::start().await;
    let connection = connect(&node).await;
    let api = connection.api();

    let pending = tokio::spawn(async move { api.p2p().info().await });
    node.next_request().await;

    connection.close().await;

    assert!(matches!(
        pending.await.unwrap(),
        Err(RpcError::ConnectionClosed)
    ));
}
