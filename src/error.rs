use thiserror::Error;

/// Gateway codes returned when the session cookie or verification token is no
/// longer accepted.
const SESSION_ERROR_CODES: &[i64] = &[100003, 125001, 125002, 125003];

/// Errors raised by the relay library.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration file missing, unreadable or invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// The gateway rejected the admin credential
    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The gateway answered with an `<error>` document
    #[error("gateway error {code}: {message}")]
    Gateway { code: i64, message: String },

    /// A response could not be understood
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The chat API refused a request
    #[error("chat error: {0}")]
    Chat(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl RelayError {
    /// True when the gateway reported that the session is gone.
    pub fn is_session_error(&self) -> bool {
        matches!(self, RelayError::Gateway { code, .. } if SESSION_ERROR_CODES.contains(code))
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
