use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    Serialization,
    NotFound,
    InvalidArgument,
    Internal,
    InvalidState,
    Unsupported,
    Canceled,
    Segment,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    /// Malformed filter expression
    pub fn parse(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Parse, context.into())
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidArgument, context.into())
    }

    /// The segment cannot perform this kind of search
    pub fn unsupported(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Unsupported, context.into())
    }

    pub fn canceled() -> Self {
        Error::new(ErrorKind::Canceled, "context canceled".to_string())
    }

    /// Wraps a per-segment failure with the segment it came from.
    pub fn segment(segment_kind: &str, segment_id: impl fmt::Display, cause: &Error) -> Self {
        Error::new(
            ErrorKind::Segment,
            format!("unexpected error searching {} segment ({}): {}", segment_kind, segment_id, cause),
        )
    }

    pub fn is_unsupported(&self) -> bool {
        self.kind == ErrorKind::Unsupported
    }

    pub fn is_canceled(&self) -> bool {
        self.kind == ErrorKind::Canceled
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error {
            kind: ErrorKind::Serialization,
            context: err.to_string(),
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: format!("persist failed: {}", err.error),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: format!("invalid regex: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_error_keeps_cause() {
        let cause = Error::new(ErrorKind::Io, "disk gone".to_string());
        let err = Error::segment("complete", "abc", &cause);
        assert_eq!(err.kind, ErrorKind::Segment);
        assert!(err.to_string().contains("complete segment (abc)"));
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn test_absorbed_kinds() {
        assert!(Error::canceled().is_canceled());
        assert!(Error::unsupported("x").is_unsupported());
        assert!(!Error::parse("x").is_unsupported());
    }
}
