//! WebSocket link to the relay.
//!
//! Two tasks share the socket: the reader forwards text frames to the main
//! loop, the writer drains the session's outbound channel. Either side
//! ending ends the link; there is no reconnect.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{client::IntoClientRequest, Message};

use rc_proto::OutboundFrame;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame from the relay, undecoded.
    Frame(String),
    Closed,
}

pub struct Transport {
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// How long [`Transport::finish`] waits for queued frames to reach the relay.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

impl Transport {
    /// Flush what the session already queued, then tear the link down.
    ///
    /// The writer only finishes once every outbound sender is dropped, so
    /// drop the session first.
    pub async fn finish(mut self) {
        if tokio::time::timeout(DRAIN_TIMEOUT, &mut self.writer).await.is_err() {
            tracing::warn!(target: "rc_client", event = "relay_drain_timeout");
            self.writer.abort();
        }
        self.reader.abort();
    }
}

/// Convert an HTTP(S) URL to the WS(S) scheme. `ws://` and `wss://` pass
/// through unchanged.
pub fn to_ws_scheme(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

pub async fn connect(url: &str, mut outbound: mpsc::UnboundedReceiver<OutboundFrame>) -> Result<Transport> {
    let url = to_ws_scheme(url);
    let request = url
        .as_str()
        .into_client_request()
        .with_context(|| format!("invalid WebSocket URL: {url}"))?;
    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .with_context(|| format!("cannot connect to relay at {url}"))?;
    tracing::info!(target: "rc_client", event = "relay_connected", url = %url);

    let (mut sink, mut stream) = ws_stream.split();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let writer_events = events_tx.clone();

    let reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if events_tx.send(TransportEvent::Frame(text)).is_err() {
                        return;
                    }
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!(
                        target: "rc_client",
                        event = "relay_closed",
                        reason = frame.as_ref().map(|f| f.reason.to_string()).unwrap_or_default()
                    );
                    break;
                }
                Ok(Message::Binary(data)) => {
                    tracing::debug!(target: "rc_client", event = "binary_frame_ignored", len = data.len());
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(target: "rc_client", event = "relay_read_error", error = %e);
                    break;
                }
            }
        }
        let _ = events_tx.send(TransportEvent::Closed);
    });

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let text = match frame.encode() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(target: "rc_client", event = "frame_encode_failed", error = %e);
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(text)).await {
                tracing::warn!(target: "rc_client", event = "relay_write_error", error = %e);
                let _ = writer_events.send(TransportEvent::Closed);
                break;
            }
        }
        let _ = sink.close().await;
    });

    Ok(Transport {
        events: events_rx,
        reader,
        writer,
    })
}
