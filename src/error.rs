//! Error handling primitives for the EE871 driver.

use core::fmt;

/// Crate-wide result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Failure classes reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// `begin()` has not been called, or `end()` was called.
    NotInitialized,
    /// A configuration field is missing or outside its allowed range.
    InvalidConfig,
    /// Generic E2 bus failure, including write-verify mismatches.
    BusError,
    /// The clock line did not rise within the bit or byte budget.
    Timeout,
    /// A caller-supplied argument is invalid.
    InvalidParam,
    /// The device did not identify as an EE871.
    DeviceNotFound,
    /// The checksum byte of a read did not match.
    ChecksumMismatch,
    /// The receiver did not acknowledge a byte.
    Nack,
    /// The device reported it is busy.
    Busy,
    /// Operation scheduled for later completion. Never produced by the
    /// synchronous operations of this crate.
    InProgress,
    /// A bus line is held low and recovery did not free it.
    BusStuck,
    /// `begin()` was called on an initialized driver.
    AlreadyInitialized,
    /// A value lies outside the register's documented domain.
    OutOfRange,
    /// The device does not advertise the feature.
    NotSupported,
}

impl ErrorKind {
    /// Short identifier for diagnostics output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::BusError => "E2_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::InvalidParam => "INVALID_PARAM",
            Self::DeviceNotFound => "DEVICE_NOT_FOUND",
            Self::ChecksumMismatch => "PEC_MISMATCH",
            Self::Nack => "NACK",
            Self::Busy => "BUSY",
            Self::InProgress => "IN_PROGRESS",
            Self::BusStuck => "BUS_STUCK",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::NotSupported => "NOT_SUPPORTED",
        }
    }
}

/// Error returned by every fallible driver operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Error {
    /// Failure class.
    pub kind: ErrorKind,
    /// Operation-specific detail, e.g. the offending byte or elapsed microseconds.
    pub detail: i32,
    /// Static description of the failure.
    pub message: &'static str,
}

impl Error {
    /// Creates an error without detail.
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            detail: 0,
            message,
        }
    }

    /// Creates an error carrying a detail value.
    pub const fn with_detail(kind: ErrorKind, message: &'static str, detail: i32) -> Self {
        Self {
            kind,
            detail,
            message,
        }
    }

    /// Returns `true` when the operation is still pending rather than failed.
    pub const fn is_in_progress(&self) -> bool {
        matches!(self.kind, ErrorKind::InProgress)
    }

    pub(crate) const fn not_initialized() -> Self {
        Self::new(ErrorKind::NotInitialized, "Driver not initialized")
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)?;
        if self.detail != 0 {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_defaults_to_zero() {
        let err = Error::new(ErrorKind::Nack, "Control byte NACK");
        assert_eq!(err.detail, 0);
        assert!(!err.is_in_progress());
    }

    #[test]
    fn in_progress_is_distinguished() {
        let err = Error::new(ErrorKind::InProgress, "In progress");
        assert!(err.is_in_progress());
    }

    #[test]
    fn with_detail_keeps_all_fields() {
        let err = Error::with_detail(ErrorKind::BusError, "Write verify failed", 42);
        assert_eq!(err.kind, ErrorKind::BusError);
        assert_eq!(err.detail, 42);
        assert_eq!(err.message, "Write verify failed");
    }
}
