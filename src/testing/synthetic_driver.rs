//! An in-memory V4L2 driver
//!
//! [`SyntheticDriver`] implements [`IoctlBackend`] over a table of controls,
//! following the kernel's extended control rules: ascending `NEXT_CTRL`
//! walks, `EINVAL` at the end of the namespace, range clamping on write,
//! and `error_idx` reporting. Faults can be injected to exercise the error
//! paths of [`V4l2Device`](crate::device::V4l2Device).

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::Bound;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::Errno;
use crate::v4l2::bindings::*;
use crate::v4l2::{ControlBatch, IoctlBackend, OpenFlags, Request};

/// Node path the synthetic webcam answers to.
pub const SYNTHETIC_NODE: &str = "/dev/video-test";

/// Number of controls of [`SyntheticDriver::uvc_webcam`] that end up in a
/// device catalogue. Class markers, the disabled control and the control of
/// unsupported type are not counted.
pub const UVC_WEBCAM_CONTROLS: usize = 14;

pub const CID_EXPOSURE_AUTO: u32 = 0x009a_0901;
pub const CID_BLACK_LEVEL: u32 = V4L2_CID_BASE + 11;
pub const CID_LINK_FREQ: u32 = 0x009f_0901;
pub const CID_PIXEL_RATE: u32 = 0x009f_0902;
pub const CID_USER_CLASS: u32 = 0x0098_0001;
pub const CID_REGION_OF_INTEREST: u32 = 0x0098_1901;
pub const CID_LED_PATTERN: u32 = 0x0098_1902;
pub const CID_LENS_SHADING: u32 = 0x0098_1903;
pub const CID_DEVICE_LABEL: u32 = 0x0098_1904;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticMenuEntry {
    Name(String),
    Value(i64),
}

/// One control exposed by the synthetic driver.
#[derive(Clone)]
pub struct SyntheticControl {
    pub query: v4l2_query_ext_ctrl,
    pub value: i64,
    pub payload: Option<Vec<u8>>,
    pub menu: BTreeMap<u32, SyntheticMenuEntry>,
}

impl SyntheticControl {
    fn base(id: u32, name: &str, type_: u32, elem_size: u32, elems: u32) -> Self {
        Self {
            query: v4l2_query_ext_ctrl {
                type_,
                name: to_name_field(name),
                elem_size,
                elems,
                ..query_ext_ctrl(id)
            },
            value: 0,
            payload: None,
            menu: BTreeMap::new(),
        }
    }

    fn with_range(mut self, minimum: i64, maximum: i64, step: u64, default_value: i64) -> Self {
        self.query.minimum = minimum;
        self.query.maximum = maximum;
        self.query.step = step;
        self.query.default_value = default_value;
        self.value = default_value;
        self
    }

    pub fn integer(id: u32, name: &str, minimum: i64, maximum: i64, step: u64, default_value: i64) -> Self {
        Self::base(id, name, V4L2_CTRL_TYPE_INTEGER, 4, 1).with_range(minimum, maximum, step, default_value)
    }

    pub fn integer64(id: u32, name: &str, minimum: i64, maximum: i64, default_value: i64) -> Self {
        Self::base(id, name, V4L2_CTRL_TYPE_INTEGER64, 8, 1).with_range(minimum, maximum, 1, default_value)
    }

    pub fn boolean(id: u32, name: &str, default_value: bool) -> Self {
        Self::base(id, name, V4L2_CTRL_TYPE_BOOLEAN, 4, 1).with_range(0, 1, 1, i64::from(default_value))
    }

    /// A menu control. Indices missing from `items` are holes.
    pub fn menu(id: u32, name: &str, items: &[(u32, &str)], default_index: u32) -> Self {
        let maximum = items.iter().map(|(i, _)| *i).max().unwrap_or(0);
        let minimum = items.iter().map(|(i, _)| *i).min().unwrap_or(0);
        let mut ctrl = Self::base(id, name, V4L2_CTRL_TYPE_MENU, 4, 1).with_range(
            i64::from(minimum),
            i64::from(maximum),
            1,
            i64::from(default_index),
        );
        ctrl.menu = items
            .iter()
            .map(|(i, n)| (*i, SyntheticMenuEntry::Name(n.to_string())))
            .collect();
        ctrl
    }

    pub fn integer_menu(id: u32, name: &str, values: &[i64], default_index: u32) -> Self {
        let maximum = values.len().saturating_sub(1) as i64;
        let mut ctrl = Self::base(id, name, V4L2_CTRL_TYPE_INTEGER_MENU, 4, 1).with_range(
            0,
            maximum,
            1,
            i64::from(default_index),
        );
        ctrl.menu = values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as u32, SyntheticMenuEntry::Value(*v)))
            .collect();
        ctrl
    }

    /// A string control holding at most `max_len` bytes.
    pub fn string(id: u32, name: &str, max_len: u32, initial: &str) -> Self {
        let mut ctrl = Self::base(id, name, V4L2_CTRL_TYPE_STRING, max_len + 1, 1)
            .with_range(0, i64::from(max_len), 1, 0)
            .with_flags(ControlFlags::HAS_PAYLOAD);
        let mut payload = vec![0u8; max_len as usize + 1];
        let len = initial.len().min(max_len as usize);
        payload[..len].copy_from_slice(&initial.as_bytes()[..len]);
        ctrl.payload = Some(payload);
        ctrl
    }

    fn array(id: u32, name: &str, type_: u32, elem_size: u32, initial: Vec<u8>) -> Self {
        let elems = initial.len() as u32 / elem_size;
        let mut ctrl = Self::base(id, name, type_, elem_size, elems)
            .with_range(0, (1i64 << (8 * elem_size)) - 1, 1, 0)
            .with_flags(ControlFlags::HAS_PAYLOAD);
        ctrl.query.nr_of_dims = 1;
        ctrl.query.dims[0] = elems;
        ctrl.payload = Some(initial);
        ctrl
    }

    pub fn u8_array(id: u32, name: &str, initial: &[u8]) -> Self {
        Self::array(id, name, V4L2_CTRL_TYPE_U8, 1, initial.to_vec())
    }

    pub fn u16_array(id: u32, name: &str, initial: &[u16]) -> Self {
        let bytes = initial.iter().flat_map(|v| v.to_ne_bytes()).collect();
        Self::array(id, name, V4L2_CTRL_TYPE_U16, 2, bytes)
    }

    pub fn u32_array(id: u32, name: &str, initial: &[u32]) -> Self {
        let bytes = initial.iter().flat_map(|v| v.to_ne_bytes()).collect();
        Self::array(id, name, V4L2_CTRL_TYPE_U32, 4, bytes)
    }

    /// A control class marker, as drivers report ahead of each class.
    pub fn class(id: u32, name: &str) -> Self {
        Self::base(id, name, V4L2_CTRL_TYPE_CTRL_CLASS, 0, 0)
            .with_flags(ControlFlags::READ_ONLY | ControlFlags::WRITE_ONLY)
    }

    /// A control of an arbitrary raw type.
    pub fn raw(id: u32, name: &str, type_: u32, elem_size: u32, elems: u32) -> Self {
        Self::base(id, name, type_, elem_size, elems)
    }

    pub fn with_flags(mut self, flags: ControlFlags) -> Self {
        self.query.flags |= flags.bits();
        self
    }

    /// Override the range the driver reports, keeping the current value.
    pub fn with_reported_range(mut self, minimum: i64, maximum: i64) -> Self {
        self.query.minimum = minimum;
        self.query.maximum = maximum;
        self
    }

    fn is_read_only(&self) -> bool {
        ControlFlags::from_bits_retain(self.query.flags).contains(ControlFlags::READ_ONLY)
    }

    fn is_menu(&self) -> bool {
        matches!(
            self.query.type_,
            V4L2_CTRL_TYPE_MENU | V4L2_CTRL_TYPE_INTEGER_MENU
        )
    }

    fn payload_size(&self) -> usize {
        self.query.elems as usize * self.query.elem_size as usize
    }

    /// Clamp and round `value` to the control range the way the kernel does
    /// for integer controls.
    fn clamp(&self, value: i64) -> i64 {
        let q = &self.query;
        match q.type_ {
            V4L2_CTRL_TYPE_BOOLEAN => i64::from(value != 0),
            V4L2_CTRL_TYPE_INTEGER | V4L2_CTRL_TYPE_INTEGER64 => {
                let value = value.clamp(q.minimum, q.maximum);
                let step = q.step.max(1) as i64;
                let offset = value - q.minimum;
                let rounded = q.minimum + step * ((offset + step / 2) / step);
                if rounded > q.maximum {
                    rounded - step
                } else {
                    rounded
                }
            }
            _ => value,
        }
    }
}

impl fmt::Debug for SyntheticControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticControl")
            .field("id", &format_args!("{:#010x}", self.query.id))
            .field("name", &name_field(&self.query.name))
            .field("type", &self.query.type_)
            .field("value", &self.value)
            .field("payload", &self.payload)
            .field("menu", &self.menu)
            .finish()
    }
}

/// Number of calls the driver has served, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub open: usize,
    pub close: usize,
    pub query_ext_ctrl: usize,
    pub query_menu: usize,
    pub get_ext_ctrls: usize,
    pub set_ext_ctrls: usize,
    /// Entries carried by all control batches so far.
    pub control_entries: usize,
    pub interrupted: usize,
}

impl CallCounts {
    /// Extended control reads and writes.
    pub fn control_io(&self) -> usize {
        self.get_ext_ctrls + self.set_ext_ctrls
    }
}

#[derive(Debug)]
struct DriverState {
    node: PathBuf,
    controls: BTreeMap<u32, SyntheticControl>,
    next_fd: RawFd,
    open_fds: HashSet<RawFd>,
    calls: CallCounts,
    open_error: Option<Errno>,
    query_error: Option<(usize, Errno)>,
    pending_interrupts: usize,
    control_error: Option<(u32, Errno)>,
    batch_error: Option<Errno>,
    repeat_first: bool,
}

/// In-memory [`IoctlBackend`]. Clones share state, so a test can keep a
/// handle for inspection after moving one into a device.
#[derive(Debug, Clone)]
pub struct SyntheticDriver {
    state: Arc<Mutex<DriverState>>,
}

impl SyntheticDriver {
    /// A driver with no controls answering to `node`.
    pub fn new(node: impl Into<PathBuf>) -> Self {
        Self {
            state: Arc::new(Mutex::new(DriverState {
                node: node.into(),
                controls: BTreeMap::new(),
                next_fd: 100,
                open_fds: HashSet::new(),
                calls: CallCounts::default(),
                open_error: None,
                query_error: None,
                pending_interrupts: 0,
                control_error: None,
                batch_error: None,
                repeat_first: false,
            })),
        }
    }

    /// A driver at [`SYNTHETIC_NODE`] with the control set of a typical UVC
    /// webcam, plus a few array and string controls.
    pub fn uvc_webcam() -> Self {
        Self::new(SYNTHETIC_NODE)
            .with_control(SyntheticControl::class(CID_USER_CLASS, "User Controls"))
            .with_control(SyntheticControl::integer(V4L2_CID_BRIGHTNESS, "Brightness", 0, 255, 1, 128))
            .with_control(SyntheticControl::integer(V4L2_CID_CONTRAST, "Contrast", 0, 100, 1, 32))
            .with_control(SyntheticControl::integer(V4L2_CID_SATURATION, "Saturation", 0, 100, 1, 64))
            .with_control(SyntheticControl::integer(V4L2_CID_HUE, "Hue", -40, 40, 1, 0))
            .with_control(
                SyntheticControl::integer(CID_BLACK_LEVEL, "Black Level", 0, 10, 1, 0)
                    .with_flags(ControlFlags::DISABLED),
            )
            .with_control(SyntheticControl::boolean(
                V4L2_CID_AUTO_WHITE_BALANCE,
                "White Balance, Automatic",
                true,
            ))
            .with_control(SyntheticControl::integer(V4L2_CID_GAIN, "Gain", 0, 100, 2, 0))
            .with_control(SyntheticControl::menu(
                V4L2_CID_POWER_LINE_FREQUENCY,
                "Power Line Frequency",
                &[(0, "Disabled"), (1, "50 Hz"), (2, "60 Hz")],
                1,
            ))
            .with_control(SyntheticControl::raw(
                CID_REGION_OF_INTEREST,
                "Region of Interest",
                V4L2_CTRL_TYPE_AREA,
                8,
                1,
            ))
            .with_control(SyntheticControl::u8_array(CID_LED_PATTERN, "LED Pattern", &[0, 0, 0, 0]))
            .with_control(SyntheticControl::u16_array(CID_LENS_SHADING, "Lens Shading", &[100, 200, 300]))
            .with_control(SyntheticControl::string(CID_DEVICE_LABEL, "Device Label", 15, "webcam"))
            .with_control(SyntheticControl::class(V4L2_CID_CAMERA_CLASS, "Camera Controls"))
            .with_control(SyntheticControl::menu(
                CID_EXPOSURE_AUTO,
                "Auto Exposure",
                &[(1, "Manual Mode"), (3, "Aperture Priority Mode")],
                3,
            ))
            .with_control(SyntheticControl::integer(
                V4L2_CID_EXPOSURE_ABSOLUTE,
                "Exposure Time, Absolute",
                3,
                2047,
                1,
                250,
            ))
            .with_control(
                SyntheticControl::integer_menu(CID_LINK_FREQ, "Link Frequency", &[400_000_000, 800_000_000], 0)
                    .with_flags(ControlFlags::READ_ONLY),
            )
            .with_control(
                SyntheticControl::integer64(CID_PIXEL_RATE, "Pixel Rate", 1, 1 << 40, 96_000_000)
                    .with_flags(ControlFlags::READ_ONLY),
            )
    }

    fn lock(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_control(self, control: SyntheticControl) -> Self {
        self.lock().controls.insert(control.query.id, control);
        self
    }

    /// Fail every `open` with `errno`.
    pub fn fail_open(&self, errno: Errno) {
        self.lock().open_error = Some(errno);
    }

    /// Fail the control query number `nth` (0-based) with `errno`.
    pub fn fail_query(&self, nth: usize, errno: Errno) {
        self.lock().query_error = Some((nth, errno));
    }

    /// Interrupt the next `count` ioctls with `EINTR`.
    pub fn interrupt_next(&self, count: usize) {
        self.lock().pending_interrupts = count;
    }

    /// Fail any control batch containing `id`, reporting its index.
    pub fn fail_control(&self, id: u32, errno: Errno) {
        self.lock().control_error = Some((id, errno));
    }

    /// Reject every control batch as a whole (`error_idx == count`).
    pub fn reject_batches(&self, errno: Errno) {
        self.lock().batch_error = Some(errno);
    }

    /// Make every `NEXT_CTRL` query return the first control again.
    pub fn repeat_first_control(&self) {
        self.lock().repeat_first = true;
    }

    pub fn clear_faults(&self) {
        let mut state = self.lock();
        state.open_error = None;
        state.query_error = None;
        state.pending_interrupts = 0;
        state.control_error = None;
        state.batch_error = None;
        state.repeat_first = false;
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn open_fd_count(&self) -> usize {
        self.lock().open_fds.len()
    }

    /// Current inline value of control `id`.
    pub fn value(&self, id: u32) -> Option<i64> {
        self.lock().controls.get(&id).map(|c| c.value)
    }

    /// Current payload of control `id`.
    pub fn payload(&self, id: u32) -> Option<Vec<u8>> {
        self.lock().controls.get(&id).and_then(|c| c.payload.clone())
    }

    /// Overwrite the payload of control `id`, padded with zeroes to its size.
    pub fn set_payload(&self, id: u32, mut bytes: Vec<u8>) {
        if let Some(ctrl) = self.lock().controls.get_mut(&id) {
            if ctrl.payload.is_some() {
                bytes.resize(ctrl.payload_size(), 0);
                ctrl.payload = Some(bytes);
            }
        }
    }

    /// Overwrite the stored value of control `id`, as hardware might.
    pub fn set_value(&self, id: u32, value: i64) {
        if let Some(ctrl) = self.lock().controls.get_mut(&id) {
            ctrl.value = value;
        }
    }
}

impl DriverState {
    fn query_ext_ctrl(&mut self, query: &mut v4l2_query_ext_ctrl) -> Result<(), Errno> {
        let nth = self.calls.query_ext_ctrl;
        self.calls.query_ext_ctrl += 1;
        if let Some((n, errno)) = self.query_error {
            if n == nth {
                return Err(errno);
            }
        }

        let (id, flags) = parse_ctrl_id_and_flags(query.id);
        let next = !flags.is_empty();

        let found = if next && self.repeat_first {
            self.controls.values().next()
        } else if next {
            self.controls
                .range((Bound::Excluded(id), Bound::Unbounded))
                .map(|(_, c)| c)
                .next()
        } else {
            self.controls.get(&id)
        };

        match found {
            Some(ctrl) => {
                *query = ctrl.query;
                Ok(())
            }
            None => Err(Errno::EINVAL),
        }
    }

    fn query_menu(&mut self, menu: &mut v4l2_querymenu) -> Result<(), Errno> {
        self.calls.query_menu += 1;

        let (id, index) = (menu.id, menu.index);
        let ctrl = self.controls.get(&id).ok_or(Errno::EINVAL)?;
        if !ctrl.is_menu() {
            return Err(Errno::EINVAL);
        }

        match ctrl.menu.get(&index) {
            Some(SyntheticMenuEntry::Name(name)) => menu.set_name(name),
            Some(SyntheticMenuEntry::Value(value)) => menu.set_value(*value),
            None => return Err(Errno::EINVAL),
        }

        Ok(())
    }

    /// Checks shared by reads and writes. On failure the batch's error index
    /// is set.
    fn validate_batch(&self, batch: &mut ControlBatch, write: bool) -> Result<(), Errno> {
        if let Some(errno) = self.batch_error {
            batch.set_error_idx(batch.len() as u32);
            return Err(errno);
        }

        for i in 0..batch.len() {
            let id = batch.entry(i).id;
            let result = match self.controls.get(&id) {
                None => Err(Errno::EINVAL),
                Some(ctrl) => self.validate_entry(ctrl, batch, i, write),
            };
            if let Err(errno) = result {
                batch.set_error_idx(i as u32);
                return Err(errno);
            }
        }

        Ok(())
    }

    fn validate_entry(
        &self,
        ctrl: &SyntheticControl,
        batch: &ControlBatch,
        index: usize,
        write: bool,
    ) -> Result<(), Errno> {
        if let Some((id, errno)) = self.control_error {
            if id == ctrl.query.id {
                return Err(errno);
            }
        }

        match (&ctrl.payload, batch.payload(index)) {
            (Some(_), Some(buf)) if buf.len() < ctrl.payload_size() => return Err(Errno::ENOSPC),
            (Some(_), None) | (None, Some(_)) => return Err(Errno::EINVAL),
            _ => {}
        }

        if !write {
            return Ok(());
        }

        if ctrl.is_read_only() {
            return Err(Errno::EACCES);
        }

        if ctrl.is_menu() {
            let index = batch.entry(index).value();
            if index < 0 || !ctrl.menu.contains_key(&(index as u32)) {
                return Err(Errno::EINVAL);
            }
        }

        if ctrl.query.type_ == V4L2_CTRL_TYPE_STRING {
            let buf = batch.payload(index).unwrap_or_default();
            let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len()) as i64;
            if len < ctrl.query.minimum || len > ctrl.query.maximum {
                return Err(Errno::ERANGE);
            }
        }

        Ok(())
    }

    fn get_ext_ctrls(&mut self, batch: &mut ControlBatch) -> Result<(), Errno> {
        self.calls.get_ext_ctrls += 1;
        self.calls.control_entries += batch.len();
        self.validate_batch(batch, false)?;

        for i in 0..batch.len() {
            let id = batch.entry(i).id;
            let Some(ctrl) = self.controls.get(&id) else {
                continue;
            };

            match &ctrl.payload {
                Some(stored) => {
                    if let Some(buf) = batch.payload_mut(i) {
                        buf[..stored.len()].copy_from_slice(stored);
                    }
                }
                None if ctrl.query.type_ == V4L2_CTRL_TYPE_INTEGER64 => {
                    batch.entry_mut(i).set_value64(ctrl.value)
                }
                None => batch.entry_mut(i).set_value(ctrl.value as i32),
            }
        }

        Ok(())
    }

    fn set_ext_ctrls(&mut self, batch: &mut ControlBatch) -> Result<(), Errno> {
        self.calls.set_ext_ctrls += 1;
        self.calls.control_entries += batch.len();
        self.validate_batch(batch, true)?;

        for i in 0..batch.len() {
            let id = batch.entry(i).id;
            let Some(ctrl) = self.controls.get_mut(&id) else {
                continue;
            };

            if ctrl.payload.is_some() {
                let size = ctrl.payload_size();
                if let Some(buf) = batch.payload(i) {
                    ctrl.payload = Some(buf[..size].to_vec());
                }
                continue;
            }

            if ctrl.query.type_ == V4L2_CTRL_TYPE_INTEGER64 {
                let value = ctrl.clamp(batch.entry(i).value64());
                ctrl.value = value;
                batch.entry_mut(i).set_value64(value);
            } else {
                let value = ctrl.clamp(i64::from(batch.entry(i).value()));
                ctrl.value = value;
                batch.entry_mut(i).set_value(value as i32);
            }
        }

        Ok(())
    }
}

impl IoctlBackend for SyntheticDriver {
    fn open(&self, path: &Path, _flags: OpenFlags) -> Result<RawFd, Errno> {
        let mut state = self.lock();
        state.calls.open += 1;

        if let Some(errno) = state.open_error {
            return Err(errno);
        }
        if path != state.node {
            return Err(Errno::ENOENT);
        }

        let fd = state.next_fd;
        state.next_fd += 1;
        state.open_fds.insert(fd);
        Ok(fd)
    }

    fn close(&self, fd: RawFd) -> Result<(), Errno> {
        let mut state = self.lock();
        state.calls.close += 1;

        if state.open_fds.remove(&fd) {
            Ok(())
        } else {
            Err(Errno::EBADF)
        }
    }

    fn ioctl(&self, fd: RawFd, request: &mut Request<'_>) -> Result<(), Errno> {
        let mut state = self.lock();

        if !state.open_fds.contains(&fd) {
            return Err(Errno::EBADF);
        }

        if state.pending_interrupts > 0 {
            state.pending_interrupts -= 1;
            state.calls.interrupted += 1;
            return Err(Errno::EINTR);
        }

        match request {
            Request::QueryExtCtrl(query) => state.query_ext_ctrl(query),
            Request::QueryMenu(menu) => state.query_menu(menu),
            Request::GetExtCtrls(batch) => state.get_ext_ctrls(batch),
            Request::SetExtCtrls(batch) => state.set_ext_ctrls(batch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_ctrl_walk_is_ascending() {
        let driver = SyntheticDriver::uvc_webcam();
        let fd = driver.open(Path::new(SYNTHETIC_NODE), OpenFlags::READ_WRITE).unwrap();

        let mut query = query_ext_ctrl(0);
        let mut ids = Vec::new();
        loop {
            query.id |= QueryCtrlFlags::NEXT.bits();
            if driver.ioctl(fd, &mut Request::QueryExtCtrl(&mut query)).is_err() {
                break;
            }
            ids.push(query.id);
        }

        assert_eq!(ids.len(), 18);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_clamp_rounds_to_step() {
        let gain = SyntheticControl::integer(V4L2_CID_GAIN, "Gain", 0, 100, 2, 0);
        assert_eq!(gain.clamp(7), 8);
        assert_eq!(gain.clamp(-5), 0);
        assert_eq!(gain.clamp(101), 100);

        let odd = SyntheticControl::integer(1, "Odd", 0, 9, 2, 0);
        assert_eq!(odd.clamp(9), 8);
    }

    #[test]
    fn test_unknown_node_and_fd() {
        let driver = SyntheticDriver::uvc_webcam();
        assert_eq!(
            driver.open(Path::new("/dev/video9"), OpenFlags::READ_WRITE),
            Err(Errno::ENOENT)
        );
        assert_eq!(driver.close(3), Err(Errno::EBADF));
    }
}
