use thiserror::Error;

/// Exit code for a missing or invalid local configuration.
pub const EXIT_CONFIG: i32 = 1;
/// Exit code for a failed token exchange.
pub const EXIT_AUTH: i32 = 2;
/// Exit code when neither policy service could be read.
pub const EXIT_NO_POLICIES: i32 = 3;
/// Exit code after a user interrupt.
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Error, Debug)]
pub enum RetrieverError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Authentication failed{}: {message}", status_suffix(.status))]
    AuthError {
        status: Option<u16>,
        message: String,
    },

    #[error("API error{}: {message}", status_suffix(.status))]
    ApiError {
        status: Option<u16>,
        message: String,
    },

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

impl RetrieverError {
    pub fn auth(message: impl Into<String>) -> Self {
        RetrieverError::AuthError {
            status: None,
            message: message.into(),
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        RetrieverError::ApiError {
            status: None,
            message: message.into(),
        }
    }

    /// Process exit code when this error aborts the run.
    ///
    /// A transport failure can only abort the run during the token exchange,
    /// so it shares the authentication code. Local output failures count as
    /// configuration errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            RetrieverError::ConfigError(_) | RetrieverError::IOError(_) => EXIT_CONFIG,
            RetrieverError::TransportError(_) | RetrieverError::AuthError { .. } => EXIT_AUTH,
            RetrieverError::ApiError { .. } => EXIT_NO_POLICIES,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (HTTP {})", code))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, RetrieverError>;
