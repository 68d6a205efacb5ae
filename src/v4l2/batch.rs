//! Per-call scratch storage for `VIDIOC_[GS]_EXT_CTRLS`.

use super::bindings::{ext_control, ext_controls, v4l2_ext_control, v4l2_ext_controls, ExtControlValue};

/// The entries of one extended control ioctl, plus the payload buffers that
/// array and string controls point to.
///
/// A batch is built for a single ioctl and dropped once its values have been
/// decoded. Raw pointers into it are only produced by [`ControlBatch::as_raw`],
/// immediately before the kernel call.
pub struct ControlBatch {
    which: u32,
    entries: Vec<v4l2_ext_control>,
    payloads: Vec<Option<Vec<u8>>>,
    error_idx: u32,
}

impl ControlBatch {
    pub fn new(which: u32) -> Self {
        Self::with_capacity(which, 0)
    }

    pub fn with_capacity(which: u32, capacity: usize) -> Self {
        Self {
            which,
            entries: Vec::with_capacity(capacity),
            payloads: Vec::with_capacity(capacity),
            error_idx: 0,
        }
    }

    pub fn which(&self) -> u32 {
        self.which
    }

    pub fn push_value(&mut self, id: u32, value: i32) {
        let mut entry = ext_control(id);
        entry.set_value(value);
        self.push_entry(entry, None);
    }

    pub fn push_value64(&mut self, id: u32, value: i64) {
        let mut entry = ext_control(id);
        entry.set_value64(value);
        self.push_entry(entry, None);
    }

    /// Add an entry backed by `payload`. Its size field is set from the
    /// buffer length.
    pub fn push_payload(&mut self, id: u32, payload: Vec<u8>) {
        let mut entry = ext_control(id);
        entry.size = payload.len() as u32;
        self.push_entry(entry, Some(payload));
    }

    /// Until a failure says otherwise, `error_idx` stays at the entry count.
    fn push_entry(&mut self, entry: v4l2_ext_control, payload: Option<Vec<u8>>) {
        self.entries.push(entry);
        self.payloads.push(payload);
        self.error_idx = self.entries.len() as u32;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> &v4l2_ext_control {
        &self.entries[index]
    }

    pub fn entry_mut(&mut self, index: usize) -> &mut v4l2_ext_control {
        &mut self.entries[index]
    }

    pub fn payload(&self, index: usize) -> Option<&[u8]> {
        self.payloads[index].as_deref()
    }

    pub fn payload_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.payloads[index].as_deref_mut()
    }

    pub fn error_idx(&self) -> u32 {
        self.error_idx
    }

    pub fn set_error_idx(&mut self, index: u32) {
        self.error_idx = index;
    }

    /// Build the kernel header for this batch, pointing every payload entry
    /// at its buffer. `error_idx` starts at `count`, which the kernel leaves
    /// alone unless a specific control fails.
    ///
    /// The returned structure holds raw pointers into `self` and must not be
    /// used after `self` is moved or modified.
    pub(crate) fn as_raw(&mut self) -> v4l2_ext_controls {
        for (entry, payload) in self.entries.iter_mut().zip(self.payloads.iter_mut()) {
            if let Some(buf) = payload {
                entry.size = buf.len() as u32;
                entry.set_ptr(buf.as_mut_ptr().cast());
            }
        }

        let mut raw = ext_controls(self.which);
        raw.count = self.entries.len() as u32;
        raw.error_idx = raw.count;
        raw.controls = self.entries.as_mut_ptr();
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_entries_point_at_buffers() {
        let mut batch = ControlBatch::new(0);
        batch.push_value(1, 5);
        batch.push_payload(2, vec![0; 6]);

        let raw = batch.as_raw();
        assert_eq!(raw.count, 2);
        assert_eq!(raw.error_idx, 2);

        let size = batch.entry(1).size;
        assert_eq!(size, 6);
        let ptr = batch.entry(1).ptr();
        let expected = batch.payload(1).map(|p| p.as_ptr() as *mut std::ffi::c_void);
        assert_eq!(Some(ptr), expected);
        assert_eq!(batch.entry(0).value(), 5);
    }
}
