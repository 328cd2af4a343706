use thiserror::Error;

/// Errors raised while converting a client conversation into a backend
/// prompt. All of these surface before the backend is invoked, so the
/// endpoint can still answer with a 4xx status.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("malformed content: {reason}")]
    MalformedContent { reason: String },

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("unexpected content type '{kind}' in {role} message")]
    UnknownContentType { role: String, kind: String },
}

pub type ConvertResult<T> = Result<T, ConvertError>;
