use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsentError {
    // Configuration Errors
    #[error("Unknown deferred item kind: <{tag}>")]
    UnknownItemKind { tag: String },
    #[error("Deferred {tag} element has no deferred source")]
    MissingDeferredSource { tag: String },
    #[error("Unknown embed handler: {name}")]
    UnknownHandler { name: String },
    #[error("Unknown alternative handler '{name}' bound to category '{category}'")]
    UnknownAlternative { category: String, name: String },
    #[error("Invalid arguments for handler '{handler}': {reason}")]
    InvalidHandlerArguments { handler: String, reason: String },
    #[error("Invalid alternative bindings: {reason}")]
    InvalidAlternatives { reason: String },
    #[error("Invalid page configuration: {reason}")]
    InvalidPageConfig { reason: String },
    #[error("{registered} deferred items registered, {} rejected", .rejected.len())]
    RejectedItems {
        registered: usize,
        rejected: Vec<ConsentError>,
    },

    // Document Errors
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("Script evaluation failed: {reason}")]
    ScriptEvaluationFailed { reason: String },

    // Storage Errors
    #[error("Storage read failed for '{key}': {message}")]
    StorageRead { key: String, message: String },
    #[error("Storage write failed for '{key}': {message}")]
    StorageWrite { key: String, message: String },
    #[error("Storage database error: {message}")]
    StorageDatabase { message: String },
    #[error("Storage database is locked")]
    StorageLocked,

    // Beacon Errors
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Name not resolved: {host}")]
    NameNotResolved { host: String },
    #[error("Connection to {host}:{port} failed")]
    ConnectionFailed { host: String, port: u16 },
    #[error("SSL handshake with {host} failed")]
    SslHandshakeFailed { host: String },
    #[error("Beacon request failed: {message}")]
    BeaconFailed { message: String },
    #[error("Beacon timed out")]
    TimedOut,
    #[error("No async runtime available to send beacon")]
    NoRuntime,
}

impl ConsentError {
    /// Configuration errors abort activation; everything else is recoverable.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ConsentError::UnknownItemKind { .. }
                | ConsentError::MissingDeferredSource { .. }
                | ConsentError::UnknownHandler { .. }
                | ConsentError::UnknownAlternative { .. }
                | ConsentError::InvalidHandlerArguments { .. }
                | ConsentError::InvalidAlternatives { .. }
                | ConsentError::InvalidPageConfig { .. }
                | ConsentError::RejectedItems { .. }
        )
    }

    /// Errors raised by the beacon transport.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ConsentError::InvalidUrl(_)
                | ConsentError::NameNotResolved { .. }
                | ConsentError::ConnectionFailed { .. }
                | ConsentError::SslHandshakeFailed { .. }
                | ConsentError::BeaconFailed { .. }
                | ConsentError::TimedOut
                | ConsentError::NoRuntime
        )
    }

    pub fn unknown_handler(name: impl Into<String>) -> Self {
        ConsentError::UnknownHandler { name: name.into() }
    }

    pub fn invalid_arguments(handler: impl Into<String>, reason: impl Into<String>) -> Self {
        ConsentError::InvalidHandlerArguments {
            handler: handler.into(),
            reason: reason.into(),
        }
    }

    pub fn beacon_failed(message: impl ToString) -> Self {
        ConsentError::BeaconFailed {
            message: message.to_string(),
        }
    }
}

impl From<url::ParseError> for ConsentError {
    fn from(err: url::ParseError) -> Self {
        ConsentError::InvalidUrl(err.to_string())
    }
}
