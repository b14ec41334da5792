//! WebSocket transport
//!
//! One text frame per packet batch. Pings are answered by tungstenite itself.

use crate::protocol::{ClientPacket, ServerPacket, deserialize, serialize};
use crate::transport::{PacketReader, PacketWriter};
use ap_core::{ApError, Result};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

/// Read half of a WebSocket connection
pub struct WsReader<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

/// Write half of a WebSocket connection
pub struct WsWriter<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

pub type ClientReader = WsReader<MaybeTlsStream<TcpStream>>;
pub type ClientWriter = WsWriter<MaybeTlsStream<TcpStream>>;

/// Split an established WebSocket into packet halves
pub fn split<S>(ws: WebSocketStream<S>) -> (WsReader<S>, WsWriter<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (sink, stream) = ws.split();
    (WsReader { stream }, WsWriter { sink })
}

/// Open a WebSocket to `uri`, giving up after `timeout`
pub async fn connect(uri: &str, timeout: Duration) -> Result<(ClientReader, ClientWriter)> {
    let (ws, response) = tokio::time::timeout(timeout, connect_async(uri))
        .await
        .map_err(|_| {
            ApError::TransientNetwork(format!(
                "timed out after {}s connecting to {}",
                timeout.as_secs(),
                uri
            ))
        })?
        .map_err(|e| ApError::TransientNetwork(e.to_string()))?;

    info!("WebSocket open to {} (HTTP {})", uri, response.status());
    Ok(split(ws))
}

fn decode(text: &str) -> Option<Vec<ServerPacket>> {
    let preview: String = text.chars().take(200).collect();
    debug!("[Server→Client] len={} json={}", text.len(), preview);

    match deserialize(text) {
        Ok(packets) => Some(packets),
        Err(e) => {
            warn!("Dropping undecodable frame: {}", e);
            None
        }
    }
}

#[async_trait]
impl<S> PacketReader for WsReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_packets(&mut self) -> Result<Option<Vec<ServerPacket>>> {
        loop {
            match self.stream.next().await {
                None | Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Err(e)) => return Err(ApError::TransientNetwork(e.to_string())),
                Some(Ok(Message::Text(text))) => {
                    if let Some(packets) = decode(&text) {
                        return Ok(Some(packets));
                    }
                }
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => {
                        if let Some(packets) = decode(text) {
                            return Ok(Some(packets));
                        }
                    }
                    Err(e) => warn!("Dropping non-UTF-8 frame: {}", e),
                },
                Some(Ok(_)) => {}
            }
        }
    }
}

#[async_trait]
impl<S> PacketWriter for WsWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_packets(&mut self, packets: &[ClientPacket]) -> Result<()> {
        let text = serialize(packets)?;
        debug!("[Client→Server] len={} packets={}", text.len(), packets.len());
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ApError::TransientNetwork(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.sink
            .close()
            .await
            .map_err(|e| ApError::TransientNetwork(e.to_string()))
    }
}
