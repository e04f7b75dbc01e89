use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Enum representing possible failures when mapping the GPIO register block.
///
/// None of these are recoverable: without the mapping no GPIO operation can run.
/// - PermissionDenied - The process lacks the privilege to open the memory device (usually `/dev/mem` without root).
/// - DeviceNotFound - The memory device does not exist, e.g. `/dev/gpiomem` on a kernel without the driver.
/// - DeviceAccessFailed - Opening the memory device failed for any other reason.
/// - MemoryMapFailed - The device opened fine but the register block could not be mapped.
/// - BlockTooSmall - The mapped block does not reach the last GPIO register, or is not word-aligned.
/// - InitLockPoisoned - A thread panicked while mapping the process-wide block.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error(
        "permission denied opening {}, GPIO register access needs root or gpio group membership",
        .path.display()
    )]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },
    #[error("memory device {} does not exist", .path.display())]
    DeviceNotFound {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },
    #[error("failed to open memory device {}", .path.display())]
    DeviceAccessFailed {
        path: PathBuf,
        #[source]
        source: nix::Error,
    },
    #[error("failed to map device memory")]
    MemoryMapFailed(#[source] io::Error),
    #[error("mapped block of {len} bytes cannot hold the GPIO registers")]
    BlockTooSmall { len: usize },
    #[error("device initialization lock poisoned")]
    InitLockPoisoned,
}

impl DeviceError {
    pub(crate) fn from_open(path: PathBuf, source: nix::Error) -> Self {
        use nix::errno::Errno;

        match source {
            Errno::EACCES | Errno::EPERM => DeviceError::PermissionDenied { path, source },
            Errno::ENOENT | Errno::ENODEV | Errno::ENXIO => {
                DeviceError::DeviceNotFound { path, source }
            }
            _ => DeviceError::DeviceAccessFailed { path, source },
        }
    }
}

/// Enum representing invalid arguments passed to pin operations.
///
/// All of them are reported before any register is touched.
/// - InvalidPin - The number is not a GPIO line of the BCM2835 (valid numbers are `0..=53`).
/// - InvalidPullDirection - The code is not one of off (0), pull-down (1) or pull-up (2).
/// - InvalidFunction - The code does not fit the 3-bit function select field.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    #[error("unrecognized GPIO pin number: {0}")]
    InvalidPin(u8),
    #[error("invalid pull direction code: {0}, expected off (0), pull-down (1) or pull-up (2)")]
    InvalidPullDirection(u8),
    #[error("invalid function select code: {0}, expected a 3-bit value")]
    InvalidFunction(u8),
}
