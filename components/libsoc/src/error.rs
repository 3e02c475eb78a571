use std::io;
use std::result;

pub type Result<T> = result::Result<T, Error>;

/// Errors raised by the wrappers.
///
/// `InvalidArgument` is a programming error on the caller's side and is never worth retrying.
/// `Unavailable`, `Operation` and `Io` are reported by the native layer or the host and are meant
/// to be handled, see `Error::is_io`.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid argument
    #[error(msg_embedded, no_from, non_std)]
    InvalidArgument(String),
    /// The resource is already open
    AlreadyOpen,
    /// The resource is not open
    Closed,
    /// The resource could not be acquired
    #[error(msg_embedded, no_from, non_std)]
    Unavailable(String),
    /// The operation failed
    #[error(msg_embedded, no_from, non_std)]
    Operation(String),
    /// I/O error
    Io(io::Error),
}

impl Error {
    /// Whether the error was reported by the native library or the host rather than caused by
    /// misuse of the API.
    pub fn is_io(&self) -> bool {
        match self {
            Error::Unavailable(_) | Error::Operation(_) | Error::Io(_) => true,
            Error::InvalidArgument(_) | Error::AlreadyOpen | Error::Closed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_classification() {
        assert!(Error::Unavailable("GPIO_3".to_string()).is_io());
        assert!(Error::Operation("read".to_string()).is_io());
        assert!(Error::from(io::Error::new(io::ErrorKind::Other, "x")).is_io());
        assert!(!Error::InvalidArgument("mode".to_string()).is_io());
        assert!(!Error::AlreadyOpen.is_io());
        assert!(!Error::Closed.is_io());
    }

    #[test]
    fn embedded_messages_are_displayed() {
        let err = Error::Unavailable("Unable to open GPIO_7".to_string());
        assert_eq!(err.to_string(), "Unable to open GPIO_7");
    }
}
