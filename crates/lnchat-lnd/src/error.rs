use thiserror::Error;

/// Errors produced while talking to the node.
#[derive(Error, Debug)]
pub enum RpcError {
    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The node answered with a non-success status code.
    #[error("Node returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The node reported an error frame inside a stream.
    #[error("Stream error {code}: {message}")]
    Stream { code: i64, message: String },

    /// A response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Reading credentials from disk failed.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid or incomplete connection settings.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        RpcError::Decode(e.to_string())
    }
}

impl From<base64::DecodeError> for RpcError {
    fn from(e: base64::DecodeError) -> Self {
        RpcError::Decode(format!("invalid base64: {e}"))
    }
}
