use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no formats matched")]
    NoMatch,

    #[error("matching {format}")]
    Probe {
        format: String,
        #[source]
        source: io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("{format} requires a seekable source")]
    NotSeekable { format: String },

    #[error("{operation} is not supported by {format}")]
    Unsupported {
        format: String,
        operation: &'static str,
    },

    #[error("{op} {path}: invalid path")]
    InvalidPath { op: &'static str, path: String },

    #[error("{op} {path}: file does not exist")]
    NotFound { op: &'static str, path: String },

    #[error("{op} {path}: not a directory")]
    NotADirectory { op: &'static str, path: String },

    #[error("{op} {path}: not a regular file")]
    NotAFile { op: &'static str, path: String },

    #[error("entry {index} ({name})")]
    Entry {
        index: usize,
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn entry(index: usize, name: impl Into<String>, source: impl Into<Error>) -> Self {
        let source = source.into();
        if source.is_cancelled() {
            return source;
        }

        Error::Entry {
            index,
            name: name.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn unsupported(format: impl Into<String>, operation: &'static str) -> Self {
        Error::Unsupported {
            format: format.into(),
            operation,
        }
    }

    /// True if this error, or the entry error it wraps, came from a cancelled context.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Entry { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, Error::NoMatch)
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub fn into_io_error(self) -> io::Error {
        match self {
            Error::Io(e) => e,
            Error::NotFound { .. } => io::Error::new(io::ErrorKind::NotFound, self),
            Error::InvalidPath { .. } => io::Error::new(io::ErrorKind::InvalidInput, self),
            Error::Unsupported { .. } => io::Error::new(io::ErrorKind::Unsupported, self),
            Error::Cancelled => io::Error::new(io::ErrorKind::Interrupted, self),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
