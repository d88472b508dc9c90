use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("cannot parse {what}: {message} (at offset {offset})")]
    Parse {
        what: &'static str,
        message: String,
        offset: usize,
    },

    #[error(transparent)]
    Write(#[from] PartialWrite),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn invalid_configuration<S: Into<String>>(message: S) -> Self {
        Error::InvalidConfiguration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A sink write that stopped early.
///
/// `written` is how many bytes the callee took responsibility for before
/// `error` happened. The error is the sink's own, unwrapped; `Display` prints
/// it as is.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PartialWrite {
    written: usize,
    error: io::Error,
}

impl PartialWrite {
    pub fn new(written: usize, error: io::Error) -> Self {
        Self { written, error }
    }

    #[inline]
    pub fn written(&self) -> usize {
        self.written
    }

    #[inline]
    pub fn error(&self) -> &io::Error {
        &self.error
    }

    #[inline]
    pub fn kind(&self) -> io::ErrorKind {
        self.error.kind()
    }

    pub fn is_short_write(&self) -> bool {
        is_short_write(&self.error)
    }

    pub fn into_error(self) -> io::Error {
        self.error
    }

    pub(crate) fn with_written(self, written: usize) -> Self {
        Self { written, ..self }
    }
}

impl From<PartialWrite> for io::Error {
    fn from(err: PartialWrite) -> Self {
        err.into_error()
    }
}

const SHORT_WRITE: &str = "short write";
const CLOSED: &str = "line-flushing writer is closed";

/// The error a sink reports when it accepted fewer bytes than it was given.
pub fn short_write() -> io::Error {
    io::Error::new(io::ErrorKind::WriteZero, SHORT_WRITE)
}

pub fn is_short_write(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WriteZero
}

pub(crate) fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, CLOSED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_write_passes_sink_error_through() {
        let err = PartialWrite::new(3, io::Error::new(io::ErrorKind::Other, "disk on fire"));

        assert_eq!(3, err.written());
        assert_eq!(io::ErrorKind::Other, err.kind());
        assert_eq!("disk on fire", err.to_string());
        assert!(!err.is_short_write());

        let io_err: io::Error = err.into();
        assert_eq!("disk on fire", io_err.to_string());
    }

    #[test]
    fn test_short_write() {
        let err = PartialWrite::new(4, short_write());
        assert!(err.is_short_write());
        assert_eq!("short write", err.to_string());
    }

    #[test]
    fn test_error_display() {
        #[rustfmt::skip]
        let tests = [
            (Error::invalid_configuration("flush threshold must be positive"),
             "invalid configuration: flush threshold must be positive"),
            (Error::Parse { what: "size", message: "unknown unit".to_owned(), offset: 2 },
             "cannot parse size: unknown unit (at offset 2)"),
            (Error::from(PartialWrite::new(0, short_write())), "short write"),
        ];

        for (err, expected) in &tests {
            assert_eq!(*expected, err.to_string());
        }
    }
}
