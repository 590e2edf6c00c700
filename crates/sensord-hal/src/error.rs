use nix::errno::Errno;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("{op} failed: {source}")]
    Driver {
        op: &'static str,
        #[source]
        source: Errno,
    },

    #[error("Failed to read input events: {0}")]
    Read(#[source] std::io::Error),

    #[error("Input device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SensorError {
    pub fn driver(op: &'static str, source: Errno) -> Self {
        SensorError::Driver { op, source }
    }

    /// Positive errno describing this error
    pub fn errno(&self) -> i32 {
        match self {
            SensorError::InvalidArgument(_) => libc::EINVAL,
            SensorError::Driver { source, .. } => *source as i32,
            SensorError::Read(e) | SensorError::Open { source: e, .. } | SensorError::Io(e) => {
                e.raw_os_error().unwrap_or(libc::EIO)
            }
            SensorError::DeviceNotFound(_) => libc::ENODEV,
        }
    }

    /// Negated errno, as returned to the sensor service
    pub fn status(&self) -> i32 {
        -self.errno()
    }
}
