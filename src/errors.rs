use thiserror::Error;

/// Errors that can occur in the client.
#[derive(Error, Debug)]
pub enum ForefrontError {
    /// IO error (state files, staged artifacts, archives)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or invalid caller-supplied parameter
    #[error("Configuration error: {0}")]
    Config(String),

    /// Optional converter extension is not installed/registered
    #[error("You must install the {package} extension and register its converter!")]
    Dependency { package: String },

    /// The remote endpoint does not exist (HTTP 404)
    #[error("Endpoint is down!")]
    NotFound,

    /// Credentials were rejected (HTTP 401)
    #[error("Your authentication is wrong!")]
    Unauthorized,

    /// Any other non-success HTTP status
    #[error("Request failed with HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    /// The request never produced a status (connection refused, DNS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON shape we expected
    #[error("Endpoint response is malformed: {0}")]
    MalformedResponse(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Anything else; the cause is chained for diagnosis
    #[error("Something went wrong! Please report this on GitHub issues")]
    Unexpected {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ForefrontError>;

impl ForefrontError {
    /// Wrap an arbitrary failure as a generic report-this error, keeping
    /// the cause in the chain.
    pub fn unexpected(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        ForefrontError::Unexpected {
            source: Box::new(source),
        }
    }
}
