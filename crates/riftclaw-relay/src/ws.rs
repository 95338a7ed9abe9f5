//! `WebSocket` endpoint: one task pair per client connection.
//!
//! The upgrade handler splits the socket. A writer task drains the
//! connection's [`Transport`] channel onto the socket and emits keepalive
//! pings; the reader loop feeds every inbound frame to the [`Relay`] in
//! arrival order. When either side ends, the connection is disconnected
//! from the relay before anything else happens, so no frame is handled
//! after cleanup has begun.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, interval_at};
use tracing::{debug, warn};

use crate::relay::Relay;
use crate::transport::{Frame, Transport};

/// Upgrade an HTTP request to a relay `WebSocket` connection.
///
/// # Route
///
/// `GET /` and `GET /ws`
pub async fn ws_relay(
    ws: WebSocketUpgrade,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    State(relay): State<Arc<Relay>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, remote_addr, relay))
}

/// Drive one client connection until it closes.
async fn handle_socket(socket: WebSocket, remote_addr: SocketAddr, relay: Arc<Relay>) {
    let (sink, mut stream) = socket.split();
    let (transport, rx) = Transport::channel();
    let keepalive = relay.config().relay.keepalive_interval();
    let mut writer = tokio::spawn(write_frames(sink, rx, keepalive));

    let id = match relay.connect(transport, remote_addr).await {
        Ok(id) => id,
        Err(e) => {
            debug!(%remote_addr, error = %e, "Connection refused");
            // The writer flushes the error and close frame, then exits.
            if let Err(e) = writer.await {
                debug!(error = %e, "Writer task failed");
            }
            return;
        }
    };

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        relay.handle_frame(id, text.as_str().as_bytes()).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        relay.handle_frame(id, &bytes).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!(connection_id = %id, code = ?frame.map(|f| f.code), "Client closed");
                        break;
                    }
                    None => {
                        debug!(connection_id = %id, "Client stream ended");
                        break;
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Err(e)) => {
                        warn!(connection_id = %id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }
            _ = &mut writer => {
                debug!(connection_id = %id, "Writer finished");
                break;
            }
        }
    }

    relay.disconnect(id).await;
    writer.abort();
}

/// Drain queued frames onto the socket, pinging on the keepalive interval.
async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Frame>,
    keepalive: Option<Duration>,
) {
    let mut ticker = keepalive.map(|period| interval_at(Instant::now() + period, period));

    loop {
        tokio::select! {
            frame = rx.recv() => {
                match frame {
                    Some(Frame::Text(json)) => {
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            debug!("WebSocket send failed");
                            return;
                        }
                    }
                    Some(Frame::Close { code, reason }) => {
                        let close = Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        }));
                        if let Err(e) = sink.send(close).await {
                            debug!(error = %e, "Close frame not delivered");
                        }
                        return;
                    }
                    None => {
                        if let Err(e) = sink.close().await {
                            debug!(error = %e, "Socket close failed");
                        }
                        return;
                    }
                }
            }
            () = next_tick(ticker.as_mut()) => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    debug!("Keepalive ping failed");
                    return;
                }
            }
        }
    }
}

/// Wait for the next keepalive tick, or forever when keepalive is off.
async fn next_tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
