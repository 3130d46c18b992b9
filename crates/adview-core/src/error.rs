use thiserror::Error;

/// Failure reported by a storage backend. Never escapes [`crate::store::LocalStore`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("storage unavailable")]
    Unavailable,

    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failure of a remote API call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {code}: {message}")]
    Status { code: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text suitable for a form error line.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Network unavailable, please try again".to_string(),
            ApiError::Status { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => "Something went wrong".to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("insufficient balance: {balance} + {delta} would be negative")]
    InsufficientFunds { balance: f64, delta: f64 },

    #[error("amount is not a finite number")]
    InvalidAmount,

    #[error("profile could not be written")]
    Storage,

    #[error("remote operation failed: {0}")]
    Remote(#[from] ApiError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClaimError {
    #[error("reward for ad {0} already earned")]
    AlreadyEarned(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
