use std::{error, fmt, io};

use crate::socket::Mode;

pub type Result<T, E = InterfaceError> = std::result::Result<T, E>;

/// Check an error return value for timeouts.
///
/// Timeouts set through `SO_RCVTIMEO`/`SO_SNDTIMEO` surface as plain OS
/// errors. This trait adds a `should_retry` method to `io::Error` and
/// `io::Result` to check for this condition.
pub trait ShouldRetry {
    /// Check for timeout
    ///
    /// If `true`, the error is probably due to a timeout.
    fn should_retry(&self) -> bool;
}

impl ShouldRetry for io::Error {
    fn should_retry(&self) -> bool {
        match self.kind() {
            // EAGAIN, EINPROGRESS and EWOULDBLOCK are the three possible codes
            // returned when a timeout occurs. the stdlib already maps EAGAIN
            // and EWOULDBLOCK os WouldBlock
            io::ErrorKind::WouldBlock => true,
            // however, EINPROGRESS is also valid
            _ => self.raw_os_error() == Some(libc::EINPROGRESS),
        }
    }
}

impl<T> ShouldRetry for io::Result<T> {
    fn should_retry(&self) -> bool {
        match self {
            Ok(_) => false,
            Err(e) => e.should_retry(),
        }
    }
}

/// Failure mapping an interface name to its kernel index.
#[derive(Debug)]
pub enum ResolveError {
    /// The name does not fit into `ifr_name` (16 bytes, NUL included).
    NameTooLong(usize),

    /// The name is empty or contains a NUL byte.
    InvalidName,

    /// `SIOCGIFINDEX` failed, usually with `ENODEV`.
    NotFound(io::Error),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ResolveError::NameTooLong(len) => {
                write!(f, "interface name of {} bytes exceeds the 15 byte limit", len)
            }
            ResolveError::InvalidName => write!(f, "invalid interface name"),
            ResolveError::NotFound(ref e) => write!(f, "interface lookup failed: {}", e),
        }
    }
}

impl error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ResolveError::NotFound(ref e) => Some(e),
            _ => None,
        }
    }
}

/// Errors reported by `RawInterface`, `IsotpInterface` and `Interface`.
#[derive(Debug)]
pub enum InterfaceError {
    /// The interface name could not be mapped to an index.
    Resolve(ResolveError),

    /// `socket(2)` failed.
    Open(io::Error),

    /// `bind(2)` failed.
    Bind(io::Error),

    /// The operation belongs to the other transport.
    WrongMode { expected: Mode, actual: Mode },

    /// The configured send or receive timeout expired.
    Timeout,

    /// The operation is not available for this transport.
    Unsupported(&'static str),

    /// Any other transport failure, short reads and writes included.
    Io(io::Error),
}

impl InterfaceError {
    /// Maps an OS error from a blocking call, separating out timeouts.
    pub(crate) fn from_transfer(e: io::Error) -> InterfaceError {
        if e.should_retry() {
            InterfaceError::Timeout
        } else {
            InterfaceError::Io(e)
        }
    }

    /// Maps a failed `CAN_ISOTP_OPTS` call on an open socket. Since Linux
    /// 5.16 the kernel answers `EISCONN` once the socket is bound.
    pub(crate) fn from_isotp_option(e: io::Error) -> InterfaceError {
        if e.raw_os_error() == Some(libc::EISCONN) {
            InterfaceError::Unsupported("isotp options on a bound socket, pass them when opening")
        } else {
            InterfaceError::Io(e)
        }
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(*self, InterfaceError::Timeout)
    }

    #[inline]
    pub fn is_wrong_mode(&self) -> bool {
        matches!(*self, InterfaceError::WrongMode { .. })
    }
}

impl fmt::Display for InterfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            InterfaceError::Resolve(ref e) => write!(f, "could not resolve interface: {}", e),
            InterfaceError::Open(ref e) => write!(f, "could not open socket: {}", e),
            InterfaceError::Bind(ref e) => write!(f, "could not bind socket: {}", e),
            InterfaceError::WrongMode { expected, actual } => {
                write!(f, "interface is not {} type (opened as {})", expected, actual)
            }
            InterfaceError::Timeout => write!(f, "operation timed out"),
            InterfaceError::Unsupported(what) => write!(f, "unsupported operation: {}", what),
            InterfaceError::Io(ref e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl error::Error for InterfaceError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            InterfaceError::Resolve(ref e) => Some(e),
            InterfaceError::Open(ref e) | InterfaceError::Bind(ref e) | InterfaceError::Io(ref e) => {
                Some(e)
            }
            _ => None,
        }
    }
}

impl From<ResolveError> for InterfaceError {
    fn from(e: ResolveError) -> InterfaceError {
        InterfaceError::Resolve(e)
    }
}

/// Error constructing a `CanFrame`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConstructionError {
    /// CAN ID was outside the range of valid IDs
    IdTooLarge,
    /// More than 8 Bytes of payload data were passed in
    TooMuchData,
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConstructionError::IdTooLarge => write!(f, "CAN ID too large"),
            ConstructionError::TooMuchData => {
                write!(f, "Payload is larger than CAN maximum of 8 bytes")
            }
        }
    }
}

impl error::Error for ConstructionError {}

/// Malformed `<id>#<data>` frame descriptor.
#[derive(Debug, PartialEq)]
pub enum ParseFrameError {
    /// No `#` separating ID and data.
    MissingSeparator,
    /// The ID part is not a hexadecimal number.
    InvalidId(String),
    /// The data part is not a sequence of hex byte pairs.
    InvalidData(hex::FromHexError),
    /// ID or data do not fit a classic CAN frame.
    Construction(ConstructionError),
}

impl fmt::Display for ParseFrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParseFrameError::MissingSeparator => write!(f, "expected <id>#<data>"),
            ParseFrameError::InvalidId(ref id) => write!(f, "invalid arbitration id '{}'", id),
            ParseFrameError::InvalidData(ref e) => write!(f, "invalid frame bytes: {}", e),
            ParseFrameError::Construction(ref e) => write!(f, "invalid frame: {}", e),
        }
    }
}

impl error::Error for ParseFrameError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ParseFrameError::InvalidData(ref e) => Some(e),
            ParseFrameError::Construction(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConstructionError> for ParseFrameError {
    fn from(e: ConstructionError) -> ParseFrameError {
        ParseFrameError::Construction(e)
    }
}

impl From<hex::FromHexError> for ParseFrameError {
    fn from(e: hex::FromHexError) -> ParseFrameError {
        ParseFrameError::InvalidData(e)
    }
}
