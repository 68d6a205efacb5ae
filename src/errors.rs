use std::path::PathBuf;

pub use nix::errno::Errno;
use thiserror::Error;

/// The errno carried by an `io::Error`, or `EIO` when it has none.
pub fn errno_of(err: &std::io::Error) -> Errno {
    err.raw_os_error().map_or(Errno::EIO, Errno::from_raw)
}

/// Errors reported by [`V4l2Device`](crate::device::V4l2Device).
///
/// Only `Open`, `AlreadyOpen` and `Enumeration` concern the device as a
/// whole; after any of them the handle is closed. Every other variant is
/// local to the call that produced it and leaves the device usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("device is not open")]
    NotOpen,

    #[error("device already open")]
    AlreadyOpen,

    #[error("failed to open V4L2 device {}: {errno}", path.display())]
    Open { path: PathBuf, errno: Errno },

    #[error("failed to enumerate controls: {0}")]
    Enumeration(Errno),

    #[error("control {0:#010x} not found")]
    UnknownControl(u32),

    #[error("{}", ioctl_message(*errno, *control))]
    Ioctl { errno: Errno, control: Option<u32> },

    #[error("invalid value for control {id:#010x}: {reason}")]
    InvalidValue { id: u32, reason: String },

    #[error("can not resolve device path for {}: {errno}", path.display())]
    DevicePath { path: PathBuf, errno: Errno },
}

fn ioctl_message(errno: Errno, control: Option<u32>) -> String {
    match control {
        Some(id) => format!("control {id:#010x} failed: {errno}"),
        None => format!("control batch failed: {errno}"),
    }
}

impl DeviceError {
    pub fn invalid_value(id: u32, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            id,
            reason: reason.into(),
        }
    }

    /// The OS error carried by this error, if any.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            DeviceError::Open { errno, .. }
            | DeviceError::Ioctl { errno, .. }
            | DeviceError::DevicePath { errno, .. } => Some(*errno),
            DeviceError::Enumeration(errno) => Some(*errno),
            _ => None,
        }
    }

    /// Negative error code in the `0 on success, -errno on failure` convention.
    pub fn to_errno(&self) -> i32 {
        let errno = match self {
            DeviceError::NotOpen => Errno::EBADF,
            DeviceError::AlreadyOpen => Errno::EBUSY,
            DeviceError::UnknownControl(_) | DeviceError::InvalidValue { .. } => Errno::EINVAL,
            other => other.errno().unwrap_or(Errno::EIO),
        };
        -(errno as i32)
    }

    /// The control the kernel reported as failing, for batch ioctl errors.
    pub fn failed_control(&self) -> Option<u32> {
        match self {
            DeviceError::Ioctl { control, .. } => *control,
            DeviceError::UnknownControl(id) | DeviceError::InvalidValue { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Errors raised while loading or saving [`CrabCtrlConfig`](crate::config::CrabCtrlConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config file: {0}")]
    Write(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
