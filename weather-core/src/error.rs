use thiserror::Error;

/// Classified failure of a weather fetch or a store operation.
///
/// The `Display` text of every variant is meant to be shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    #[error("City not found. Please check the spelling and try again.")]
    NotFound,

    #[error("Invalid API key. Please check your configuration.")]
    Unauthorized,

    #[error("Failed to fetch weather data (status {0}). Please try again later.")]
    ProviderError(u16),

    #[error("Invalid weather data received from API")]
    InvalidResponse,

    #[error("Network error. Please check your internet connection.")]
    NetworkError,

    #[error("An unexpected error occurred. Please try again.")]
    Unknown,

    #[error("Please enter a valid location")]
    EmptyInput,

    #[error("This location is already added")]
    DuplicateLocation,
}

impl WeatherError {
    /// HTTP status that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound => Some(404),
            Self::Unauthorized => Some(401),
            Self::ProviderError(status) => Some(*status),
            _ => None,
        }
    }

    /// Map a non-success HTTP status to its error kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            401 => Self::Unauthorized,
            other => Self::ProviderError(other),
        }
    }

    /// Reclassify a transport-level failure from the HTTP client.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
            Self::NetworkError
        } else if err.is_decode() {
            Self::InvalidResponse
        } else {
            Self::Unknown
        }
    }
}
