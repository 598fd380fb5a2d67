use thiserror::Error;

/// Errors returned by template resolution and ComfyUI operations.
#[derive(Error, Debug)]
pub enum ComfyError {
    /// ComfyUI returned a non-success HTTP status.
    #[error("ComfyUI returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response from ComfyUI was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// WebSocket connect or receive failure with context.
    #[error("{context}: {source}")]
    WebSocket {
        context: String,
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// The WebSocket closed before the prompt finished executing.
    #[error("WebSocket closed before prompt {0} completed")]
    ConnectionClosed(String),

    /// A declared path does not lead to an object inside the template.
    #[error("Path '{path}' for input '{key}' does not resolve in the prompt data")]
    PathNotFound { key: String, path: String },

    /// No declared path, and no key with this name anywhere in the template.
    #[error("Path for input '{key}' was not specified, and a search did not find a matching key in the prompt data")]
    KeyNotFound { key: String },

    /// Generation was attempted without a prompt template.
    #[error("No prompt data loaded from '{0}'")]
    MissingTemplate(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing an output image failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ComfyError>;
