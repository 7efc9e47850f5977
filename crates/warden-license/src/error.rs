use thiserror::Error;

pub type LicenseResult<T> = Result<T, LicenseError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LicenseError {
    #[error("license expired since {0}")]
    Expired(String),
    #[error("invalid license signature: {0}")]
    InvalidSignature(String),
    #[error("invalid license expiresAt '{value}': {reason}")]
    InvalidExpiry { value: String, reason: String },
    #[error("invalid license key: {0}")]
    InvalidKey(String),
    #[error("invalid license json: {0}")]
    InvalidJson(String),
}
