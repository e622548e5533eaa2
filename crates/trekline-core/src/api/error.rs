use thiserror::Error;

/// How a completed (or failed) call is classified by the response chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    NoConnectivity,
    Timeout,
    AuthorizationFailure,
    OtherServerError,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Session expired - call was not sent")]
    ExpiredSession,

    #[error("Unauthorized - credential rejected by server")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("No connectivity: {0}")]
    NoConnectivity(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn class(&self) -> ResponseClass {
        match self {
            ApiError::NoConnectivity(_) => ResponseClass::NoConnectivity,
            ApiError::Timeout => ResponseClass::Timeout,
            ApiError::Unauthorized => ResponseClass::AuthorizationFailure,
            _ => ResponseClass::OtherServerError,
        }
    }

    /// Connectivity problems the caller may retry or back off on
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::NoConnectivity(_) | ApiError::Timeout)
    }

    /// Errors after which the session is gone
    pub fn ends_session(&self) -> bool {
        matches!(self, ApiError::ExpiredSession | ApiError::Unauthorized)
    }

    /// Short message suitable for a status line
    pub fn user_message(&self) -> String {
        match self {
            ApiError::ExpiredSession | ApiError::Unauthorized => {
                "Your session has ended. Please sign in again.".to_string()
            }
            ApiError::NoConnectivity(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            ApiError::Timeout => "Connection timed out. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}
