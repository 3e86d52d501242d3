/*!
The error taxonomy every core operation answers with.

Validation and policy failures are raised where they are detected and
propagate to the boundary untouched; only storage failures get folded
into `Internal`.
*/
use crate::store::DbError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Malformed, missing, or conflicting input. The caller's fault;
    /// retrying the same request won't help.
    InvalidArgument(String),
    /// The addressed record doesn't exist.
    NotFound(String),
    /// Authenticated but not allowed. Also covers identities that map to
    /// no stored record, so lookups don't reveal which identities exist.
    AccessDenied(String),
    /// No verifiable identity on the request.
    Unauthenticated,
    /// Storage or other infrastructure failure.
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "{}", msg),
            Error::NotFound(msg) => write!(f, "{}", msg),
            Error::AccessDenied(msg) => write!(f, "{}", msg),
            Error::Unauthenticated => write!(f, "Unauthenticated"),
            Error::Internal(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<DbError> for Error {
    fn from(e: DbError) -> Error {
        Error::Internal(e.display().to_owned())
    }
}
