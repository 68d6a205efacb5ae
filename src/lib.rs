//! crabctrl: V4L2 device control for Linux video devices
//!
//! This crate opens a V4L2 device node, discovers the controls the driver
//! exposes and reads or writes them in atomic batches through the extended
//! control ioctls.
//!
//! # Features
//! - Control catalogue built once per open, with ranges, defaults and menus
//! - Batched, typed control reads and writes
//! - Errors that name the failing control
//! - Pluggable ioctl backend with an in-memory driver for tests
//!
//! # Usage
//! ```rust,no_run
//! use crabctrl::{OpenFlags, V4l2Device};
//!
//! crabctrl::init_logging();
//!
//! let mut device = V4l2Device::new("/dev/video0");
//! device.open(OpenFlags::READ_WRITE)?;
//! for entry in device.controls() {
//!     println!("{:#010x} {}", entry.id.id(), entry.id.name());
//! }
//! # Ok::<(), crabctrl::DeviceError>(())
//! ```
pub mod config;
pub mod controls;
pub mod device;
pub mod errors;
pub mod invariant_ppt;
pub mod v4l2;

// Testing utilities - synthetic driver for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::CrabCtrlConfig;
pub use controls::{
    ControlEntry, ControlId, ControlInfo, ControlInfoMap, ControlList, ControlType, ControlValue,
    MenuItem,
};
pub use device::{SetOutcome, V4l2Device};
pub use errors::{ConfigError, DeviceError, Errno};
pub use v4l2::{AccessMode, IoctlBackend, KernelBackend, OpenFlags};

/// Initialize logging for crabctrl
pub fn init_logging() {
    init_logging_with("crabctrl=info");
}

/// Initialize logging with `filter` unless `RUST_LOG` is set
pub fn init_logging_with(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "crabctrl");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
    }
}
