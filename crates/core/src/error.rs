use thiserror::Error;

/// Top-level error type used across the entire application.
#[derive(Debug, Error)]
pub enum CuveError {
    /// The request never produced an HTTP response (connect, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The device answered with a non-2xx status.
    #[error("device returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The device answered `{"ok": false}`.
    #[error("device rejected request{}", .0.as_deref().map(|e| format!(": {e}")).unwrap_or_default())]
    Rejected(Option<String>),

    /// The body was not the JSON shape we expected.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl CuveError {
    /// `true` for failures reported by the device itself rather than the transport.
    pub fn is_server_side(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Rejected(_))
    }
}

pub type Result<T, E = CuveError> = std::result::Result<T, E>;
