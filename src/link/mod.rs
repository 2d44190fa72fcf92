//! Collaborator ports the session controller drives: the socket-like
//! [`Transport`] to the planter and the [`NetworkAttach`] step that puts the
//! host on the planter's Wi-Fi first.

pub mod fake;
pub mod tcp;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::TransportError;

/// Buffered frames between a transport's reader and the session listener.
pub const FRAME_CHANNEL_CAPACITY: usize = 64;

/// One inbound frame, or the error that ended the stream.
pub type Frame = Result<Vec<u8>, TransportError>;

/// Inbound frame stream. The channel closing means the stream ended.
pub type FrameReceiver = mpsc::Receiver<Frame>;

/// Where the transport should dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportTarget {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Bidirectional message channel to a device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the channel. Returns false if the device refused or was unreachable.
    async fn connect(&self, target: &TransportTarget) -> bool;

    /// Send one text message. Returns false if it could not be written.
    async fn send_message(&self, message: &str) -> bool;

    /// Start receiving frames. Runs until [`close`](Self::close) or a socket error.
    fn start_listening(&self) -> FrameReceiver;

    async fn close(&self);
}

/// Joins the host to a wireless network.
#[async_trait]
pub trait NetworkAttach: Send + Sync {
    async fn attach(&self, ssid: &str, password: &str) -> bool;
}

/// For hosts that are already on the planter's network (e.g. joined by the OS).
#[derive(Debug, Default, Clone, Copy)]
pub struct PreAttachedNetwork;

#[async_trait]
impl NetworkAttach for PreAttachedNetwork {
    async fn attach(&self, ssid: &str, _password: &str) -> bool {
        info!("Assuming host is already attached to {}", ssid);
        true
    }
}
