//! Deck channel connection.
//!
//! A client connection to the channel server that:
//! - registers as a listener on one channel
//! - keeps the connection alive with periodic pings
//! - forwards other clients' requests to an event channel

use crate::message::{ChannelRequest, MAX_MESSAGE_SIZE};
use anyhow::{anyhow, Result};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

/// Interval between keepalive pings.
pub const PING_INTERVAL: Duration = Duration::from_secs(5);

type WsWrite = futures::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsRead = futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Event emitted by the channel connection.
#[derive(Debug)]
pub enum ChannelEvent {
    /// Another client sent a request on our channel
    Message(ChannelRequest),
    /// Connection was closed or failed
    Closed,
}

/// A listener connection on one channel.
pub struct ChannelConnection {
    client_id: String,
    channel: String,
    /// Write half of the WebSocket (shared with the ping task)
    write: Arc<Mutex<WsWrite>>,
    read_task: Option<JoinHandle<()>>,
    ping_task: Option<JoinHandle<()>>,
}

impl ChannelConnection {
    /// Connect to `url`, register on `channel` and start pinging.
    pub async fn connect(
        url: &str,
        client_id: &str,
        channel: &str,
        event_tx: mpsc::UnboundedSender<ChannelEvent>,
    ) -> Result<Self> {
        Self::connect_with_interval(url, client_id, channel, event_tx, PING_INTERVAL).await
    }

    /// Like `connect`, with a custom ping interval.
    pub async fn connect_with_interval(
        url: &str,
        client_id: &str,
        channel: &str,
        event_tx: mpsc::UnboundedSender<ChannelEvent>,
        ping_interval: Duration,
    ) -> Result<Self> {
        debug!("Connecting to channel server {}", url);
        let (ws_stream, _) = connect_async(url).await?;
        let (write, read) = ws_stream.split();
        let write = Arc::new(Mutex::new(write));

        let mut connection = Self {
            client_id: client_id.to_string(),
            channel: channel.to_string(),
            write,
            read_task: None,
            ping_task: None,
        };

        connection
            .send(&ChannelRequest::register_listener(client_id, channel))
            .await?;
        info!("Listening on channel {}", channel);

        let own_id = client_id.to_string();
        connection.read_task = Some(tokio::spawn(async move {
            Self::read_loop(own_id, read, event_tx).await;
        }));

        let ping = ChannelRequest::ping(client_id, channel).to_text();
        let ping_write = Arc::clone(&connection.write);
        connection.ping_task = Some(tokio::spawn(async move {
            Self::ping_loop(ping, ping_write, ping_interval).await;
        }));

        Ok(connection)
    }

    /// Read loop that forwards foreign requests to the event channel.
    async fn read_loop(
        client_id: String,
        mut read: WsRead,
        event_tx: mpsc::UnboundedSender<ChannelEvent>,
    ) {
        loop {
            match read.next().await {
                Some(Ok(msg)) => {
                    let text = match msg {
                        Message::Text(text) => text,
                        Message::Binary(data) => String::from_utf8_lossy(&data).into_owned(),
                        Message::Ping(_) | Message::Pong(_) => continue,
                        Message::Close(_) => {
                            debug!("Received close frame from channel server");
                            break;
                        }
                        Message::Frame(_) => continue,
                    };

                    if text.len() > MAX_MESSAGE_SIZE {
                        warn!(
                            "Channel message exceeds max size ({} > {}), dropping",
                            text.len(),
                            MAX_MESSAGE_SIZE
                        );
                        continue;
                    }

                    let Some(request) = ChannelRequest::from_text(&text) else {
                        warn!("Ignoring unrecognized channel message");
                        continue;
                    };

                    if request.client_id == client_id {
                        debug!("Ignoring our own {} request", request.request);
                        continue;
                    }
                    if request.is_ack() {
                        continue;
                    }

                    debug!("Channel request {:?} from {}", request.request, request.client_id);
                    if event_tx.send(ChannelEvent::Message(request)).is_err() {
                        // Receiver dropped
                        return;
                    }
                }
                Some(Err(e)) => {
                    match e {
                        WsError::ConnectionClosed | WsError::AlreadyClosed => {
                            debug!("Channel connection closed");
                        }
                        _ => {
                            error!("Channel WebSocket error: {}", e);
                        }
                    }
                    break;
                }
                None => {
                    debug!("Channel stream ended");
                    break;
                }
            }
        }

        let _ = event_tx.send(ChannelEvent::Closed);
    }

    async fn ping_loop(ping: String, write: Arc<Mutex<WsWrite>>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; registration already went out
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let result = write.lock().await.send(Message::Text(ping.clone())).await;
            if let Err(e) = result {
                debug!("Stopping pings: {}", e);
                break;
            }
        }
    }

    /// Send a request on the connection.
    pub async fn send(&self, request: &ChannelRequest) -> Result<()> {
        let mut write = self.write.lock().await;
        write
            .send(Message::Text(request.to_text()))
            .await
            .map_err(|e| anyhow!("Failed to send channel message: {}", e))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Close the connection gracefully.
    pub async fn close(&mut self) {
        if let Some(task) = self.ping_task.take() {
            task.abort();
        }

        let _ = self.write.lock().await.send(Message::Close(None)).await;

        if let Some(task) = self.read_task.take() {
            task.abort();
        }
    }
}

impl Drop for ChannelConnection {
    fn drop(&mut self) {
        if let Some(task) = self.ping_task.take() {
            task.abort();
        }
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
    }
}
