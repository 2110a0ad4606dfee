//! Error types for calibrator operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for calibrator operations
pub type Result<T> = std::result::Result<T, CalError>;

/// Errors that can occur while calibrating a device
#[derive(Debug, Error)]
pub enum CalError {
    /// Bad command line (wrong arity, malformed number or MAC)
    #[error("{reason}")]
    Usage {
        /// What was wrong
        reason: String,
        /// Synopsis of the command that was being invoked
        usage: Option<String>,
    },

    /// No command in the table matches
    #[error("Unknown command: {command}")]
    UnknownCommand {
        /// The words that failed to match
        command: String,
    },

    /// Network interface or wiphy does not exist
    #[error("Device not found: {name}")]
    DeviceNotFound {
        /// Interface or phy name
        name: String,
    },

    /// Malformed or unexpected netlink traffic
    #[error("Netlink error: {reason}")]
    Netlink {
        /// Reason for failure
        reason: String,
    },

    /// sysfs attribute holds something other than expected
    #[error("Unexpected content in {path}: {reason}")]
    Sysfs {
        /// Attribute that was read
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// Kernel returned an errno (from a syscall or an `NLMSG_ERROR` frame)
    #[error("Kernel error: {}", errno_message(.errno))]
    Errno {
        /// Positive errno value
        errno: i32,
    },

    /// Firmware completed a test command with a failure status
    #[error("Firmware rejected test 0x{test_id:02x} (status {status})")]
    Firmware {
        /// Test id that was sent
        test_id: u8,
        /// Status word from the firmware header
        status: u16,
    },

    /// Driver did not answer a request that needs an answer
    #[error("No answer from driver for {request}")]
    NoAnswer {
        /// Request description
        request: String,
    },

    /// NVS file is missing, truncated or malformed
    #[error("Invalid NVS file: {reason}")]
    InvalidNvs {
        /// Reason for failure
        reason: String,
    },

    /// INI file is malformed
    #[error("Invalid INI file: {reason}")]
    InvalidIni {
        /// Reason for failure
        reason: String,
    },

    /// File could not be opened
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path that was attempted
        path: PathBuf,
    },

    /// Kernel module could not be loaded or unloaded
    #[error("Module control failed: {reason}")]
    Module {
        /// Reason for failure
        reason: String,
    },

    /// Calibration sequence aborted at a step
    #[error("Calibration step `{step}` failed: {source}")]
    Step {
        /// Step argv, space separated
        step: String,
        /// Underlying failure
        #[source]
        source: Box<CalError>,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl CalError {
    /// Create a usage error
    pub fn usage(reason: impl Into<String>) -> Self {
        Self::Usage {
            reason: reason.into(),
            usage: None,
        }
    }

    /// Create a netlink error
    pub fn netlink(reason: impl Into<String>) -> Self {
        Self::Netlink {
            reason: reason.into(),
        }
    }

    /// Create an invalid NVS error
    pub fn invalid_nvs(reason: impl Into<String>) -> Self {
        Self::InvalidNvs {
            reason: reason.into(),
        }
    }

    /// Create an invalid INI error
    pub fn invalid_ini(reason: impl Into<String>) -> Self {
        Self::InvalidIni {
            reason: reason.into(),
        }
    }

    /// Create a no-answer error
    pub fn no_answer(request: impl Into<String>) -> Self {
        Self::NoAnswer {
            request: request.into(),
        }
    }

    /// Create a module control error
    pub fn module(reason: impl Into<String>) -> Self {
        Self::Module {
            reason: reason.into(),
        }
    }

    /// Process exit code: 1 for usage errors, `-errno` for kernel errors,
    /// 2 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage { .. } | Self::UnknownCommand { .. } => 1,
            Self::Errno { errno } => -errno,
            Self::DeviceNotFound { .. } => -ENODEV,
            Self::Io { source } => source.raw_os_error().map_or(2, |e| -e),
            Self::Step { source, .. } => source.exit_code(),
            _ => 2,
        }
    }
}

const ENODEV: i32 = 19;

fn errno_message(errno: &i32) -> String {
    std::io::Error::from_raw_os_error(*errno).to_string()
}

impl From<rustix::io::Errno> for CalError {
    fn from(e: rustix::io::Errno) -> Self {
        Self::Errno {
            errno: e.raw_os_error(),
        }
    }
}
