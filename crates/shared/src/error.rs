use thiserror::Error;

/// Failure reported by a page host capability.
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error("page host has no {0} element")]
    MissingMount(&'static str),
    #[error("unknown element handle {0}")]
    UnknownElement(usize),
    #[error("element #{0} not found inside banner")]
    MissingControl(String),
    #[error("{operation} failed: {message}")]
    Operation {
        operation: &'static str,
        message: String,
    },
}

impl HostError {
    pub fn operation(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("consent store failure: {0:#}")]
    Store(#[source] anyhow::Error),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("unrecognized stored consent value '{0}'")]
    UnrecognizedStatus(String),
    #[error("invalid analytics endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },
}

impl ConsentError {
    pub fn store(source: anyhow::Error) -> Self {
        Self::Store(source)
    }
}
