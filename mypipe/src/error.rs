//! Transfer errors
//!
//! Short transfers are not errors. Everything reported here is returned
//! synchronously from the call that hit it.

use std::fmt;
use std::io;

use crate::region::RegionFault;

/// errno reported for an interrupted wait (restart the call)
pub const ERESTARTSYS: i32 = 512;
/// errno reported for a failed copy to or from the caller region
pub const EINVAL: i32 = 22;
/// errno reported when a non-blocking call would have waited
pub const EAGAIN: i32 = 11;

/// Error type for pipe transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeError {
    /// The wait was interrupted before any pipe state changed.
    /// Re-issue the call with the same arguments.
    Retry,
    /// Copying into or out of the caller's region failed.
    /// Cursors are unchanged; no bytes were transferred.
    TransferFault(RegionFault),
    /// A non-blocking call found no free space (write) or no data (read)
    WouldBlock,
}

impl PipeError {
    /// Kernel-style error number
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::Retry => ERESTARTSYS,
            Self::TransferFault(_) => EINVAL,
            Self::WouldBlock => EAGAIN,
        }
    }

    #[must_use]
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry)
    }
}

impl fmt::Display for PipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retry => write!(f, "interrupted while waiting, retry the call"),
            Self::TransferFault(fault) => write!(f, "transfer fault: {fault}"),
            Self::WouldBlock => write!(f, "operation would block"),
        }
    }
}

impl std::error::Error for PipeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TransferFault(fault) => Some(fault),
            Self::Retry | Self::WouldBlock => None,
        }
    }
}

impl From<RegionFault> for PipeError {
    fn from(fault: RegionFault) -> Self {
        Self::TransferFault(fault)
    }
}

impl embedded_io::Error for PipeError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::Retry => embedded_io::ErrorKind::Interrupted,
            Self::TransferFault(_) => embedded_io::ErrorKind::InvalidInput,
            Self::WouldBlock => embedded_io::ErrorKind::Other,
        }
    }
}

impl From<PipeError> for io::Error {
    fn from(e: PipeError) -> Self {
        let kind = match e {
            PipeError::Retry => io::ErrorKind::Interrupted,
            PipeError::TransferFault(_) => io::ErrorKind::InvalidInput,
            PipeError::WouldBlock => io::ErrorKind::WouldBlock,
        };
        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::Error as _;

    #[test]
    fn test_errno_values() {
        assert_eq!(PipeError::Retry.errno(), 512);
        assert_eq!(
            PipeError::TransferFault(RegionFault { offset: 0, len: 1 }).errno(),
            22
        );
        assert_eq!(PipeError::WouldBlock.errno(), 11);
    }

    #[test]
    fn test_retry_maps_to_interrupted() {
        assert_eq!(
            PipeError::Retry.kind(),
            embedded_io::ErrorKind::Interrupted
        );
        let e: io::Error = PipeError::Retry.into();
        assert_eq!(e.kind(), io::ErrorKind::Interrupted);
    }

    #[test]
    fn test_fault_display_names_range() {
        let e = PipeError::from(RegionFault { offset: 4, len: 3 });
        assert_eq!(
            e.to_string(),
            "transfer fault: cannot access 3 bytes at offset 4 of caller region"
        );
    }
}
