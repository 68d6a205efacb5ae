//! The system call seam between [`V4l2Device`](crate::device::V4l2Device)
//! and the kernel.
//!
//! Everything the device does to a file descriptor goes through an
//! [`IoctlBackend`]. [`KernelBackend`] talks to the real kernel; tests use
//! [`SyntheticDriver`](crate::testing::SyntheticDriver) instead.

use std::os::unix::io::RawFd;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use serde::{Deserialize, Serialize};

use super::batch::ControlBatch;
use super::bindings::{v4l2_query_ext_ctrl, v4l2_querymenu};

#[doc(hidden)]
mod raw {
    use crate::v4l2::bindings::{v4l2_ext_controls, v4l2_query_ext_ctrl, v4l2_querymenu};

    nix::ioctl_readwrite!(vidioc_querymenu, b'V', 37, v4l2_querymenu);
    nix::ioctl_readwrite!(vidioc_g_ext_ctrls, b'V', 71, v4l2_ext_controls);
    nix::ioctl_readwrite!(vidioc_s_ext_ctrls, b'V', 72, v4l2_ext_controls);
    nix::ioctl_readwrite!(vidioc_query_ext_ctrl, b'V', 103, v4l2_query_ext_ctrl);
}

/// Access mode for [`OpenFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Flags passed to `open(2)` when opening a device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenFlags {
    pub access: AccessMode,
    pub non_blocking: bool,
}

impl OpenFlags {
    pub const READ_ONLY: OpenFlags = OpenFlags {
        access: AccessMode::ReadOnly,
        non_blocking: false,
    };

    pub const READ_WRITE: OpenFlags = OpenFlags {
        access: AccessMode::ReadWrite,
        non_blocking: false,
    };

    pub fn non_blocking(self) -> Self {
        Self {
            non_blocking: true,
            ..self
        }
    }

    /// The `open(2)` flags for these options. `O_CLOEXEC` is always set.
    pub fn oflag(&self) -> OFlag {
        let mut oflag = match self.access {
            AccessMode::ReadOnly => OFlag::O_RDONLY,
            AccessMode::ReadWrite => OFlag::O_RDWR,
        };
        oflag |= OFlag::O_CLOEXEC;
        if self.non_blocking {
            oflag |= OFlag::O_NONBLOCK;
        }
        oflag
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::READ_WRITE
    }
}

/// A single ioctl and its argument.
pub enum Request<'a> {
    QueryExtCtrl(&'a mut v4l2_query_ext_ctrl),
    QueryMenu(&'a mut v4l2_querymenu),
    GetExtCtrls(&'a mut ControlBatch),
    SetExtCtrls(&'a mut ControlBatch),
}

/// Open, close and ioctl on V4L2 device nodes.
///
/// Implementations report failures as the raw OS error, including `EINTR`;
/// retrying is the caller's business.
pub trait IoctlBackend {
    fn open(&self, path: &Path, flags: OpenFlags) -> Result<RawFd, Errno>;

    fn close(&self, fd: RawFd) -> Result<(), Errno>;

    fn ioctl(&self, fd: RawFd, request: &mut Request<'_>) -> Result<(), Errno>;
}

/// [`IoctlBackend`] issuing real system calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelBackend;

impl IoctlBackend for KernelBackend {
    fn open(&self, path: &Path, flags: OpenFlags) -> Result<RawFd, Errno> {
        nix::fcntl::open(path, flags.oflag(), Mode::empty())
    }

    fn close(&self, fd: RawFd) -> Result<(), Errno> {
        nix::unistd::close(fd)
    }

    fn ioctl(&self, fd: RawFd, request: &mut Request<'_>) -> Result<(), Errno> {
        // SAFETY: each argument is the structure its request expects. Batch
        // headers point into `batch`, which outlives the call.
        let result = unsafe {
            match request {
                Request::QueryExtCtrl(query) => raw::vidioc_query_ext_ctrl(fd, &mut **query),
                Request::QueryMenu(menu) => raw::vidioc_querymenu(fd, &mut **menu),
                Request::GetExtCtrls(batch) => {
                    let mut header = batch.as_raw();
                    let result = raw::vidioc_g_ext_ctrls(fd, &mut header);
                    batch.set_error_idx(header.error_idx);
                    result
                }
                Request::SetExtCtrls(batch) => {
                    let mut header = batch.as_raw();
                    let result = raw::vidioc_s_ext_ctrls(fd, &mut header);
                    batch.set_error_idx(header.error_idx);
                    result
                }
            }
        };

        result.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_flags() {
        let oflag = OpenFlags::READ_WRITE.non_blocking().oflag();
        assert_eq!(oflag & OFlag::O_ACCMODE, OFlag::O_RDWR);
        assert!(oflag.contains(OFlag::O_NONBLOCK | OFlag::O_CLOEXEC));

        let read_only = OpenFlags::READ_ONLY.oflag();
        assert_eq!(read_only & OFlag::O_ACCMODE, OFlag::O_RDONLY);
        assert!(!read_only.contains(OFlag::O_NONBLOCK));
    }

    #[test]
    fn test_kernel_open_missing_node() {
        let err = KernelBackend
            .open(Path::new("/nonexistent/video-node"), OpenFlags::READ_WRITE)
            .unwrap_err();
        assert_eq!(err, Errno::ENOENT);
    }

    #[test]
    fn test_kernel_ioctl_on_regular_file() {
        let file = tempfile::tempfile().unwrap();
        let fd = std::os::unix::io::AsRawFd::as_raw_fd(&file);
        let mut query = crate::v4l2::bindings::query_ext_ctrl(0);
        let err = KernelBackend
            .ioctl(fd, &mut Request::QueryExtCtrl(&mut query))
            .unwrap_err();
        assert_eq!(err, Errno::ENOTTY);
    }
}
