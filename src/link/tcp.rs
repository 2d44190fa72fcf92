use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TransportError;

use super::{FRAME_CHANNEL_CAPACITY, Frame, FrameReceiver, Transport, TransportTarget};

/// Longest frame accepted before the stream is treated as broken.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Socket transport speaking newline-delimited frames in both directions.
#[derive(Debug, Default)]
pub struct TcpTransport {
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    reader: Mutex<Option<OwnedReadHalf>>,
    reader_cancel: Mutex<Option<CancellationToken>>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn stop_reader(&self) {
        let token = self
            .reader_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self, target: &TransportTarget) -> bool {
        let stream = match TcpStream::connect((target.host.as_str(), target.port)).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to connect to {}: {}", target, e);
                return false;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY: {}", e);
        }

        // A reconnect replaces whatever the previous socket left behind
        self.stop_reader();
        let (read_half, write_half) = stream.into_split();
        *self.reader.lock().unwrap_or_else(PoisonError::into_inner) = Some(read_half);
        *self.writer.lock().await = Some(write_half);

        info!("Socket connected to {}", target);
        true
    }

    async fn send_message(&self, message: &str) -> bool {
        let mut guard = self.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            warn!("Cannot send, socket is not connected");
            return false;
        };

        let mut line = Vec::with_capacity(message.len() + 1);
        line.extend_from_slice(message.as_bytes());
        line.push(b'\n');

        match writer.write_all(&line).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Socket write failed: {}", e);
                false
            }
        }
    }

    fn start_listening(&self) -> FrameReceiver {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

        let reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(reader) = reader else {
            // Reader is gone (never connected, closed, or already listening)
            let _ = tx.try_send(Err(TransportError::NotConnected));
            return rx;
        };

        let cancel = CancellationToken::new();
        *self
            .reader_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cancel.clone());

        tokio::spawn(async move {
            let codec = AnyDelimiterCodec::new_with_max_length(
                b"\n".to_vec(),
                b"\n".to_vec(),
                MAX_FRAME_LEN,
            );
            let mut lines = FramedRead::new(reader, codec);
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    next = lines.next() => next,
                };

                let frame: Frame = match next {
                    Some(Ok(line)) => Ok(line.strip_suffix(b"\r").unwrap_or(&line[..]).to_vec()),
                    Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded)) => {
                        Err(TransportError::FrameTooLong { max: MAX_FRAME_LEN })
                    }
                    Some(Err(AnyDelimiterCodecError::Io(e))) => Err(e.into()),
                    None => {
                        debug!("Socket closed by peer");
                        break;
                    }
                };

                // The codec cannot resume after an error
                let failed = frame.is_err();
                if tx.send(frame).await.is_err() || failed {
                    break;
                }
            }
        });

        rx
    }

    async fn close(&self) {
        self.stop_reader();
        self.reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("Socket shutdown: {}", e);
            }
        }
    }
}
