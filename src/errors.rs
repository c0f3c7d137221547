/*!
 * Error types for the mdtranslate application.
 *
 * Request-level failures use `TranslationError`, backend failures use
 * `ProviderError`. Infrastructure code (config, database, CLI) uses
 * `anyhow::Result` and converts into `AppError` at the edges.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The call did not complete within its deadline
    #[error("Request timed out after {0} ms")]
    Timeout(u64),
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Authentication failures and client errors (other than 408 and 429)
    /// are final; everything else is worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AuthenticationError(_) => false,
            Self::ApiError { status_code, .. } => match *status_code {
                408 | 429 => true,
                400..=499 => false,
                _ => true,
            },
            _ => true,
        }
    }
}

/// Errors that fail a whole translation request
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The request carried no translatable text
    #[error("Input text is empty")]
    EmptyInput,

    /// The request exceeded the configured size limit
    #[error("Input text too long: {length} characters (maximum {max})")]
    InputTooLong {
        /// Character count of the rejected input
        length: usize,
        /// Configured maximum
        max: usize,
    },

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error opening or using the cache backend
    #[error("Cache error: {0}")]
    Cache(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
