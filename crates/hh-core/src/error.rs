//! Error types for hackable-host

use thiserror::Error;

/// Main error type for the host
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Operation requires state {expected}, host is {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors raised while opening a native core
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Failed to open \"{path}\": {message}")]
    Open { path: String, message: String },

    #[error("Missing symbol {symbol} in \"{path}\": {message}")]
    MissingSymbol {
        path: String,
        symbol: &'static str,
        message: String,
    },
}

/// Errors raised while loading content into a core
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Failed to read content \"{path}\": {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Core rejected content \"{0}\"")]
    Rejected(String),

    #[error("Core needs content to run")]
    ContentRequired,

    #[error("Invalid content path: {0}")]
    InvalidPath(String),

    #[error("AV negotiation failed: {0}")]
    AvNegotiation(String),
}

/// Audio output errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No output device available")]
    NoDevice,

    #[error("Device error: {0}")]
    Device(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

/// Result type alias for host operations
pub type Result<T> = std::result::Result<T, HostError>;
