use pokedex_api::ApiError;
use thiserror::Error;

/// All the ways a Pokédex operation can go wrong
///
/// Form validation problems are not in here on purpose: those are
/// field-scoped and live in [`crate::validation::FieldErrors`].
#[derive(Error, Debug)]
pub enum Error {
    /// Backend answered with a non-2xx status; `message` is shown to the user as-is
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Snapshot store failed: {0}")]
    Cache(#[from] pokedex_cache::CacheError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

impl Error {
    /// HTTP status behind the error, when the backend produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::NotFound(_) => Some(404),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, message } => Error::Api { status, message },
            ApiError::NotFound(what) => Error::NotFound(what),
            ApiError::NetworkError(e) => Error::Network(e),
            ApiError::ParseError(e) => Error::Serialization(e),
            ApiError::InvalidConfig(msg) => Error::Config(msg),
        }
    }
}
