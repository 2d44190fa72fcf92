use thiserror::Error;

/// Why a connect attempt was refused. Session state is untouched in every case.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Wi-Fi credentials missing for this device")]
    MissingCredentials,

    #[error("Failed to join Wi-Fi network '{ssid}'")]
    NetworkAttachFailed { ssid: String },

    #[error("Failed to open socket to {target}")]
    TransportConnectFailed { target: String },
}

/// Per-frame telemetry decode failure. Logged and dropped by the listener.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Empty telemetry payload")]
    EmptyPayload,

    #[error("Malformed telemetry payload: {0}")]
    MalformedPayload(String),
}

/// Failure of the inbound frame stream itself.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport is not connected")]
    NotConnected,

    #[error("Frame exceeds {max} bytes without a delimiter")]
    FrameTooLong { max: usize },
}
