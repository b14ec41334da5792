//! Transport abstractions for the server connection
//!
//! Provides PacketReader/PacketWriter traits that carry whole packet batches,
//! plus the background task that pumps one connection between its transport
//! and the session's channels.

use crate::protocol::{ClientPacket, ServerPacket};
use ap_core::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Trait for async reading from a transport
#[async_trait]
pub trait PacketReader: Send {
    /// Read the next batch of packets; `None` once the peer closed cleanly
    async fn read_packets(&mut self) -> Result<Option<Vec<ServerPacket>>>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait PacketWriter: Send {
    /// Write one batch of packets as a single frame
    async fn write_packets(&mut self, packets: &[ClientPacket]) -> Result<()>;

    /// Close the transport
    async fn close(&mut self) -> Result<()>;
}

/// What a connection task reports back to its session
#[derive(Debug)]
pub enum Inbound {
    Packets(Vec<ServerPacket>),
    /// The connection ended; no further messages follow
    Closed(String),
}

/// Background task that owns one connection
///
/// This task:
/// - Writes batches queued by the session to the transport
/// - Forwards every packet batch read from the transport to the session
/// - Reports `Inbound::Closed` when the transport fails or the peer hangs up
///
/// The task ends quietly when the session drops its outbound sender.
pub async fn connection_task<R: PacketReader, W: PacketWriter>(
    mut reader: R,
    mut writer: W,
    mut outbound: mpsc::UnboundedReceiver<Vec<ClientPacket>>,
    inbound: mpsc::UnboundedSender<Inbound>,
) {
    let reason = loop {
        tokio::select! {
            batch = outbound.recv() => {
                match batch {
                    Some(packets) => {
                        if let Err(e) = writer.write_packets(&packets).await {
                            warn!("Write failed: {}", e);
                            break e.to_string();
                        }
                    }
                    None => {
                        debug!("Outbound channel closed, connection task exiting");
                        let _ = writer.close().await;
                        return;
                    }
                }
            }

            read = reader.read_packets() => {
                match read {
                    Ok(Some(packets)) => {
                        if inbound.send(Inbound::Packets(packets)).is_err() {
                            debug!("Session gone, connection task exiting");
                            let _ = writer.close().await;
                            return;
                        }
                    }
                    Ok(None) => break "connection closed by server".to_string(),
                    Err(e) => {
                        warn!("Read failed: {}", e);
                        break e.to_string();
                    }
                }
            }
        }
    };

    let _ = inbound.send(Inbound::Closed(reason));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_core::ApError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Reader replaying scripted results, then pending forever
    struct ScriptedReader {
        script: VecDeque<Result<Option<Vec<ServerPacket>>>>,
    }

    #[async_trait]
    impl PacketReader for ScriptedReader {
        async fn read_packets(&mut self) -> Result<Option<Vec<ServerPacket>>> {
            match self.script.pop_front() {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingWriter {
        written: Arc<Mutex<Vec<ClientPacket>>>,
        closed: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl PacketWriter for RecordingWriter {
        async fn write_packets(&mut self, packets: &[ClientPacket]) -> Result<()> {
            self.written.lock().unwrap().extend_from_slice(packets);
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_forwards_packets_then_reports_close() {
        let reader = ScriptedReader {
            script: VecDeque::from([
                Ok(Some(vec![ServerPacket::Unknown])),
                Ok(None),
            ]),
        };
        let (_out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, mut in_rx) = mpsc::unbounded_channel();

        connection_task(reader, RecordingWriter::default(), out_rx, in_tx).await;

        match in_rx.recv().await {
            Some(Inbound::Packets(packets)) => assert_eq!(packets, vec![ServerPacket::Unknown]),
            other => panic!("Unexpected: {:?}", other),
        }
        match in_rx.recv().await {
            Some(Inbound::Closed(reason)) => assert_eq!(reason, "connection closed by server"),
            other => panic!("Unexpected: {:?}", other),
        }
        assert!(in_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_read_error_becomes_close_reason() {
        let reader = ScriptedReader {
            script: VecDeque::from([Err(ApError::TransientNetwork("reset by peer".into()))]),
        };
        let (_out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, mut in_rx) = mpsc::unbounded_channel();

        connection_task(reader, RecordingWriter::default(), out_rx, in_tx).await;

        match in_rx.recv().await {
            Some(Inbound::Closed(reason)) => assert_eq!(reason, "Network error: reset by peer"),
            other => panic!("Unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_writes_batches_and_exits_when_session_drops_sender() {
        let reader = ScriptedReader {
            script: VecDeque::new(),
        };
        let writer = RecordingWriter::default();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, mut in_rx) = mpsc::unbounded_channel();

        out_tx
            .send(vec![ClientPacket::LocationChecks { locations: vec![1, 2] }])
            .unwrap();
        drop(out_tx);
        connection_task(reader, writer.clone(), out_rx, in_tx).await;

        assert_eq!(
            *writer.written.lock().unwrap(),
            vec![ClientPacket::LocationChecks { locations: vec![1, 2] }]
        );
        assert!(*writer.closed.lock().unwrap());
        // Quiet exit: no close report
        assert!(in_rx.recv().await.is_none());
    }
}
