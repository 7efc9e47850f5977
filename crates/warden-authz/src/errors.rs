use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("invalid permission method: '{0}'")]
    InvalidMethod(String),
    #[error("invalid permission topic: '{0}'")]
    InvalidTopic(String),
    #[error("empty oidc group string")]
    EmptyGroup,
    #[error("invalid permission encoding: {0}")]
    InvalidEncoding(String),
    #[error("invalid request path segment: '{0}'")]
    InvalidPath(String),
}

pub type AuthzResult<T> = Result<T, AuthzError>;
