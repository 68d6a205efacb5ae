//! V4L2 device handle: open/close of the device node, control enumeration,
//! and batched control reads and writes.
//!
//! A [`V4l2Device`] owns at most one file descriptor. Opening it walks the
//! driver's control namespace once and builds a [`ControlInfoMap`] that stays
//! unchanged until the device is closed. Every control read or write is
//! validated against that catalogue and issued as a single extended control
//! ioctl.
//!
//! # Example
//! ```rust,no_run
//! use crabctrl::v4l2::bindings::V4L2_CID_BRIGHTNESS;
//! use crabctrl::{ControlList, ControlValue, OpenFlags, V4l2Device};
//!
//! let mut device = V4l2Device::new("/dev/video0");
//! device.open(OpenFlags::READ_WRITE.non_blocking())?;
//!
//! let current = device.get_controls(&[V4L2_CID_BRIGHTNESS])?;
//! println!("brightness: {:?}", current.get(V4L2_CID_BRIGHTNESS));
//!
//! let mut update = ControlList::new();
//! update.set(V4L2_CID_BRIGHTNESS, ControlValue::Integer32(200));
//! device.set_controls(&mut update)?;
//! # Ok::<(), crabctrl::DeviceError>(())
//! ```

use std::collections::HashSet;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use crate::assert_invariant;
use crate::controls::{ControlEntry, ControlInfoMap, ControlList, MenuItem};
use crate::errors::{errno_of, DeviceError, Errno};
use crate::invariant_ppt::{BATCH_MATCHES_REQUEST, CATALOGUE_UNIQUE_IDS, CLOSED_DEVICE_EMPTY_CATALOGUE};
use crate::v4l2::bindings::{
    query_ext_ctrl, querymenu, ControlFlags, MenuEntryValue, QueryCtrlFlags,
    V4L2_CTRL_TYPE_CTRL_CLASS, V4L2_CTRL_WHICH_CUR_VAL,
};
use crate::v4l2::translate::{self, ControlDescriptor, V4l2CtrlType};
use crate::v4l2::{ControlBatch, IoctlBackend, KernelBackend, OpenFlags, Request};

/// Menus longer than this are truncated during enumeration.
const MAX_MENU_ENTRIES: u32 = 1024;

/// Result of a successful [`V4l2Device::set_controls`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// Every control holds exactly the requested value.
    Applied,
    /// The driver changed the value of the listed controls while writing
    /// them, e.g. by clamping to the control range.
    Adjusted(Vec<u32>),
}

impl SetOutcome {
    pub fn is_adjusted(&self) -> bool {
        matches!(self, SetOutcome::Adjusted(_))
    }
}

/// A V4L2 video device or sub-device node and its controls.
pub struct V4l2Device<B: IoctlBackend = KernelBackend> {
    device_node: PathBuf,
    fd: Option<RawFd>,
    controls: ControlInfoMap,
    backend: B,
}

impl V4l2Device<KernelBackend> {
    /// Create a handle for `device_node`. The node is not opened until
    /// [`open`](Self::open) is called.
    pub fn new(device_node: impl Into<PathBuf>) -> Self {
        Self::with_backend(device_node, KernelBackend)
    }
}

impl<B: IoctlBackend> V4l2Device<B> {
    pub fn with_backend(device_node: impl Into<PathBuf>, backend: B) -> Self {
        Self {
            device_node: device_node.into(),
            fd: None,
            controls: ControlInfoMap::new(),
            backend,
        }
    }

    /// Open the device node with `flags` and enumerate its controls.
    ///
    /// If enumeration fails the node is closed again before returning.
    pub fn open(&mut self, flags: OpenFlags) -> Result<(), DeviceError> {
        if self.is_open() {
            log::error!("Device already open");
            return Err(DeviceError::AlreadyOpen);
        }

        let fd = self
            .backend
            .open(&self.device_node, flags)
            .map_err(|errno| {
                log::error!("Failed to open V4L2 device {}: {}", self.device_node.display(), errno);
                DeviceError::Open {
                    path: self.device_node.clone(),
                    errno,
                }
            })?;

        self.attach(fd)
    }

    /// Use an already open file descriptor instead of opening the node.
    ///
    /// The device takes ownership of `fd` and closes it on [`close`](Self::close).
    /// This is for callers that receive a descriptor from elsewhere, or that
    /// share one node between several handles. Mutually exclusive with
    /// [`open`](Self::open).
    pub fn set_fd(&mut self, fd: RawFd) -> Result<(), DeviceError> {
        if self.is_open() {
            return Err(DeviceError::AlreadyOpen);
        }

        self.attach(fd)
    }

    fn attach(&mut self, fd: RawFd) -> Result<(), DeviceError> {
        self.fd = Some(fd);

        match self.list_controls() {
            Ok(controls) => {
                log::info!(
                    "Opened {} with {} controls",
                    self.device_node.display(),
                    controls.len()
                );
                self.controls = controls;
                Ok(())
            }
            Err(errno) => {
                log::error!("Failed to enumerate controls: {}", errno);
                self.close();
                Err(DeviceError::Enumeration(errno))
            }
        }
    }

    /// Close the device node. Does nothing if the device is not open.
    pub fn close(&mut self) {
        let Some(fd) = self.fd.take() else {
            return;
        };

        if let Err(errno) = self.backend.close(fd) {
            log::error!("Failed to close V4L2 device: {}", errno);
        }

        self.controls = ControlInfoMap::new();
        assert_invariant!(
            self.fd.is_none() && self.controls.is_empty(),
            CLOSED_DEVICE_EMPTY_CATALOGUE,
            "V4l2Device::close"
        );
        log::debug!("Closed {}", self.device_node.display());
    }

    pub fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    pub fn fd(&self) -> Option<RawFd> {
        self.fd
    }

    pub fn device_node(&self) -> &Path {
        &self.device_node
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The controls supported by the device. Empty while the device is closed.
    pub fn controls(&self) -> &ControlInfoMap {
        &self.controls
    }

    /// Canonical sysfs path of the physical device backing the node, with
    /// every symbolic link resolved.
    pub fn device_path(&self) -> Result<PathBuf, DeviceError> {
        let metadata = std::fs::metadata(&self.device_node).map_err(|e| DeviceError::DevicePath {
            path: self.device_node.clone(),
            errno: errno_of(&e),
        })?;

        if !metadata.file_type().is_char_device() {
            return Err(DeviceError::DevicePath {
                path: self.device_node.clone(),
                errno: Errno::ENODEV,
            });
        }

        let (major, minor) = split_dev(metadata.rdev());
        let device_path = PathBuf::from(format!("/sys/dev/char/{major}:{minor}/device"));

        std::fs::canonicalize(&device_path).map_err(|e| {
            log::error!("Can not resolve device path for {}", device_path.display());
            DeviceError::DevicePath {
                errno: errno_of(&e),
                path: device_path,
            }
        })
    }

    /// Issue `request` on the open file descriptor, retrying when the call
    /// is interrupted by a signal.
    ///
    /// Errors are returned unlogged; callers report them with context.
    pub fn ioctl(&self, request: &mut Request<'_>) -> Result<(), Errno> {
        let fd = self.fd.ok_or(Errno::EBADF)?;

        loop {
            match self.backend.ioctl(fd, request) {
                Err(errno) if errno == Errno::EINTR => continue,
                result => return result,
            }
        }
    }

    /// Read the current value of every control in `ids`, in order.
    ///
    /// If any id is not in [`controls`](Self::controls), nothing is read and
    /// [`DeviceError::UnknownControl`] is returned. If the kernel fails the
    /// batch, no value is returned; the error names the failing control when
    /// the kernel reports one. A string control holding anything but UTF-8
    /// fails the read with [`DeviceError::InvalidValue`].
    pub fn get_controls(&self, ids: &[u32]) -> Result<ControlList, DeviceError> {
        if !self.is_open() {
            return Err(DeviceError::NotOpen);
        }
        if ids.is_empty() {
            return Ok(ControlList::new());
        }

        let descriptors = ids
            .iter()
            .map(|&id| self.descriptor(id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut batch = ControlBatch::with_capacity(V4L2_CTRL_WHICH_CUR_VAL, descriptors.len());
        for desc in &descriptors {
            translate::push_for_read(&mut batch, desc);
        }

        let result = self.ioctl(&mut Request::GetExtCtrls(&mut batch));
        result.map_err(|errno| batch_error("read", &batch, errno))?;

        self.decode_batch(&batch, &descriptors)
    }

    /// Write every control in `ctrls` and store the values the driver
    /// actually applied back into `ctrls`.
    ///
    /// Validation failures (unknown ids, values of the wrong type or shape)
    /// are reported before anything is sent to the kernel. On any failure
    /// `ctrls` is left untouched.
    pub fn set_controls(&self, ctrls: &mut ControlList) -> Result<SetOutcome, DeviceError> {
        if !self.is_open() {
            return Err(DeviceError::NotOpen);
        }
        if ctrls.is_empty() {
            return Ok(SetOutcome::Applied);
        }

        let mut batch = ControlBatch::with_capacity(V4L2_CTRL_WHICH_CUR_VAL, ctrls.len());
        let mut descriptors = Vec::with_capacity(ctrls.len());
        for (id, value) in ctrls.iter() {
            let desc = self.descriptor(id)?;
            translate::push_for_write(&mut batch, desc, value).map_err(|err| {
                log::error!("{}", err);
                err
            })?;
            descriptors.push(desc);
        }

        let result = self.ioctl(&mut Request::SetExtCtrls(&mut batch));
        result.map_err(|errno| batch_error("set", &batch, errno))?;

        let applied = self.decode_batch(&batch, &descriptors)?;
        let mut adjusted = Vec::new();
        for ((id, value), (_, actual)) in ctrls.iter_mut().zip(applied.iter()) {
            if *value != *actual {
                log::debug!("Control {:#010x} adjusted from {} to {}", id, value, actual);
                *value = actual.clone();
                adjusted.push(id);
            }
        }

        if adjusted.is_empty() {
            Ok(SetOutcome::Applied)
        } else {
            Ok(SetOutcome::Adjusted(adjusted))
        }
    }

    fn descriptor(&self, id: u32) -> Result<&ControlDescriptor, DeviceError> {
        self.controls
            .get(id)
            .map(|entry| &entry.descriptor)
            .ok_or_else(|| {
                log::error!("Control {:#010x} not found", id);
                DeviceError::UnknownControl(id)
            })
    }

    fn decode_batch(
        &self,
        batch: &ControlBatch,
        descriptors: &[&ControlDescriptor],
    ) -> Result<ControlList, DeviceError> {
        assert_invariant!(
            batch.len() == descriptors.len(),
            BATCH_MATCHES_REQUEST,
            "V4l2Device::decode_batch"
        );

        descriptors
            .iter()
            .enumerate()
            .map(|(i, desc)| Ok((desc.id, translate::decode(batch, i, desc)?)))
            .collect()
    }

    /// Walk the driver's control namespace and build the catalogue.
    fn list_controls(&self) -> Result<ControlInfoMap, Errno> {
        let mut controls = ControlInfoMap::new();
        let mut seen = HashSet::new();
        let mut query = query_ext_ctrl(0);

        loop {
            query.id |= (QueryCtrlFlags::NEXT | QueryCtrlFlags::COMPOUND).bits();
            match self.ioctl(&mut Request::QueryExtCtrl(&mut query)) {
                Ok(()) => {}
                // No control after the seed id: end of the namespace.
                Err(errno) if errno == Errno::EINVAL => break,
                Err(errno) => return Err(errno),
            }

            assert_invariant!(
                seen.insert(query.id),
                CATALOGUE_UNIQUE_IDS,
                "V4l2Device::list_controls"
            );

            let flags = ControlFlags::from_bits_retain(query.flags);
            if query.type_ == V4L2_CTRL_TYPE_CTRL_CLASS || flags.contains(ControlFlags::DISABLED) {
                continue;
            }

            let Some(mut desc) = ControlDescriptor::from_query(&query) else {
                log::debug!(
                    "Control {:#010x} has unsupported type {}",
                    query.id,
                    query.type_
                );
                continue;
            };

            if let Err(reason) = desc.validate_shape() {
                log::warn!("Control {:#010x} skipped: {}", desc.id, reason);
                continue;
            }

            if desc.ctrl_type.is_menu() {
                desc.menu = self.list_menu(&desc)?;
            }

            let entry = ControlEntry {
                id: desc.control_id(),
                info: desc.control_info(),
                descriptor: desc,
            };
            controls.insert(entry);
        }

        Ok(controls)
    }

    /// Query the entries of a menu control. Indices the driver rejects with
    /// `EINVAL` are holes in the menu.
    fn list_menu(&self, desc: &ControlDescriptor) -> Result<Vec<MenuItem>, Errno> {
        let mut items = Vec::new();
        if desc.maximum < desc.minimum {
            return Ok(items);
        }

        // Menu indices are 32-bit on the wire.
        let Ok(first) = u32::try_from(desc.minimum) else {
            log::warn!(
                "Control {:#010x} menu range {}..={} is not addressable",
                desc.id,
                desc.minimum,
                desc.maximum
            );
            return Ok(items);
        };
        let last = u32::try_from(desc.maximum)
            .unwrap_or(u32::MAX)
            .min(first.saturating_add(MAX_MENU_ENTRIES - 1));
        if i64::from(last) < desc.maximum {
            log::warn!(
                "Control {:#010x} menu truncated to indices {}..={}",
                desc.id,
                first,
                last
            );
        }

        for index in first..=last {
            let mut menu = querymenu(desc.id, index);
            match self.ioctl(&mut Request::QueryMenu(&mut menu)) {
                Ok(()) => {}
                Err(errno) if errno == Errno::EINVAL => continue,
                Err(errno) => return Err(errno),
            }

            let item = match desc.ctrl_type {
                V4l2CtrlType::IntegerMenu => MenuItem::Value {
                    index,
                    value: menu.value(),
                },
                _ => MenuItem::Name {
                    index,
                    name: menu.name(),
                },
            };
            items.push(item);
        }

        Ok(items)
    }
}

impl<B: IoctlBackend> Drop for V4l2Device<B> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Map a failed batch ioctl to an error, naming the failing control when
/// the kernel pointed at one. An `error_idx` equal to the batch size means
/// the batch was rejected before any control was touched.
fn batch_error(op: &str, batch: &ControlBatch, errno: Errno) -> DeviceError {
    let index = batch.error_idx() as usize;
    if index < batch.len() {
        let id = batch.entry(index).id;
        log::error!("Unable to {} control {:#010x}: {}", op, id, errno);
        DeviceError::Ioctl {
            errno,
            control: Some(id),
        }
    } else {
        log::error!("Unable to {} controls: {}", op, errno);
        DeviceError::Ioctl {
            errno,
            control: None,
        }
    }
}

/// Split a `dev_t` into major and minor numbers, glibc encoding.
fn split_dev(dev: u64) -> (u64, u64) {
    let major = ((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0x0000_0fff);
    let minor = ((dev >> 12) & 0xffff_ff00) | (dev & 0x0000_00ff);
    (major, minor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_dev() {
        // /dev/video0 is 81:0, /dev/video300 would be 81:300.
        assert_eq!(split_dev(81 << 8), (81, 0));
        assert_eq!(split_dev((81 << 8) | (300 & 0xff) | ((300 & !0xff) << 12)), (81, 300));
    }

    #[test]
    fn test_new_device_is_closed() {
        let device = V4l2Device::new("/dev/video-none");
        assert!(!device.is_open());
        assert_eq!(device.fd(), None);
        assert!(device.controls().is_empty());
        assert_eq!(device.device_node(), Path::new("/dev/video-none"));
    }

    #[test]
    fn test_ioctl_requires_open_device() {
        let device = V4l2Device::new("/dev/video-none");
        let mut query = query_ext_ctrl(0);
        assert_eq!(
            device.ioctl(&mut Request::QueryExtCtrl(&mut query)),
            Err(Errno::EBADF)
        );
    }

    #[test]
    fn test_open_missing_node_leaves_device_closed() {
        let mut device = V4l2Device::new("/nonexistent/video-node");
        let err = device.open(OpenFlags::READ_WRITE).unwrap_err();
        assert_eq!(
            err,
            DeviceError::Open {
                path: PathBuf::from("/nonexistent/video-node"),
                errno: Errno::ENOENT,
            }
        );
        assert!(!device.is_open());
    }

    #[test]
    fn test_device_path_of_regular_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let device = V4l2Device::new(file.path());
        let err = device.device_path().unwrap_err();
        assert_eq!(err.errno(), Some(Errno::ENODEV));
    }
}
