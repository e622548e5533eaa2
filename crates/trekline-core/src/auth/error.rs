use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    #[error("token has no payload segment")]
    MissingPayload,

    #[error("token payload is not valid base64url: {0}")]
    Encoding(String),

    #[error("token payload is not JSON: {0}")]
    NotJson(String),

    #[error("token payload is not a JSON object")]
    NotAnObject,

    #[error("token expiration claim is not a timestamp: {0}")]
    InvalidExpiration(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<ClaimsError> for AuthError {
    fn from(err: ClaimsError) -> Self {
        AuthError::InvalidCredential(err.to_string())
    }
}
