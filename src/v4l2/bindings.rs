//! The V4L2 extended control ABI from `<linux/videodev2.h>`, as generated
//! into `v4l::v4l_sys`, plus typed flags and accessors for its unions.

use std::ffi::{c_char, c_void};
use std::mem;

use bitflags::bitflags;
use serde::Serialize;
use v4l::v4l_sys as sys;

pub use sys::{
    v4l2_ext_control, v4l2_ext_control__bindgen_ty_1, v4l2_ext_controls, v4l2_query_ext_ctrl,
    v4l2_querymenu, v4l2_querymenu__bindgen_ty_1,
};
pub use sys::{
    V4L2_CID_AUTO_WHITE_BALANCE, V4L2_CID_BASE, V4L2_CID_BRIGHTNESS, V4L2_CID_CAMERA_CLASS,
    V4L2_CID_CONTRAST, V4L2_CID_EXPOSURE_ABSOLUTE, V4L2_CID_GAIN, V4L2_CID_HUE,
    V4L2_CID_POWER_LINE_FREQUENCY, V4L2_CID_SATURATION, V4L2_CTRL_FLAG_DISABLED,
    V4L2_CTRL_FLAG_EXECUTE_ON_WRITE, V4L2_CTRL_FLAG_GRABBED, V4L2_CTRL_FLAG_HAS_PAYLOAD,
    V4L2_CTRL_FLAG_INACTIVE, V4L2_CTRL_FLAG_NEXT_COMPOUND, V4L2_CTRL_FLAG_NEXT_CTRL,
    V4L2_CTRL_FLAG_READ_ONLY, V4L2_CTRL_FLAG_SLIDER, V4L2_CTRL_FLAG_UPDATE,
    V4L2_CTRL_FLAG_VOLATILE, V4L2_CTRL_FLAG_WRITE_ONLY, V4L2_CTRL_ID_MASK,
    V4L2_CTRL_WHICH_CUR_VAL, V4L2_CTRL_WHICH_DEF_VAL,
};

pub const V4L2_CTRL_TYPE_INTEGER: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_INTEGER;
pub const V4L2_CTRL_TYPE_BOOLEAN: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_BOOLEAN;
pub const V4L2_CTRL_TYPE_MENU: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_MENU;
pub const V4L2_CTRL_TYPE_BUTTON: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_BUTTON;
pub const V4L2_CTRL_TYPE_INTEGER64: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_INTEGER64;
pub const V4L2_CTRL_TYPE_CTRL_CLASS: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_CTRL_CLASS;
pub const V4L2_CTRL_TYPE_STRING: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_STRING;
pub const V4L2_CTRL_TYPE_BITMASK: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_BITMASK;
pub const V4L2_CTRL_TYPE_INTEGER_MENU: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_INTEGER_MENU;
pub const V4L2_CTRL_TYPE_U8: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_U8;
pub const V4L2_CTRL_TYPE_U16: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_U16;
pub const V4L2_CTRL_TYPE_U32: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_U32;
pub const V4L2_CTRL_TYPE_AREA: u32 = sys::v4l2_ctrl_type_V4L2_CTRL_TYPE_AREA;

bitflags! {
    /// `V4L2_CTRL_FLAG_*` bits of a control description.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
    pub struct ControlFlags: u32 {
        const DISABLED = V4L2_CTRL_FLAG_DISABLED;
        const GRABBED = V4L2_CTRL_FLAG_GRABBED;
        const READ_ONLY = V4L2_CTRL_FLAG_READ_ONLY;
        const UPDATE = V4L2_CTRL_FLAG_UPDATE;
        const INACTIVE = V4L2_CTRL_FLAG_INACTIVE;
        const SLIDER = V4L2_CTRL_FLAG_SLIDER;
        const WRITE_ONLY = V4L2_CTRL_FLAG_WRITE_ONLY;
        const VOLATILE = V4L2_CTRL_FLAG_VOLATILE;
        const HAS_PAYLOAD = V4L2_CTRL_FLAG_HAS_PAYLOAD;
        const EXECUTE_ON_WRITE = V4L2_CTRL_FLAG_EXECUTE_ON_WRITE;
    }
}

bitflags! {
    /// Walk flags or-ed into the id of a `VIDIOC_QUERY_EXT_CTRL` request.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct QueryCtrlFlags: u32 {
        const NEXT = V4L2_CTRL_FLAG_NEXT_CTRL;
        const COMPOUND = V4L2_CTRL_FLAG_NEXT_COMPOUND;
    }
}

/// Split a query id into the control id and the walk flags.
pub fn parse_ctrl_id_and_flags(raw: u32) -> (u32, QueryCtrlFlags) {
    (raw & V4L2_CTRL_ID_MASK, QueryCtrlFlags::from_bits_truncate(raw))
}

pub fn query_ext_ctrl(id: u32) -> v4l2_query_ext_ctrl {
    v4l2_query_ext_ctrl {
        id,
        // SAFETY: plain C structure for which all-zero is a valid value.
        ..unsafe { mem::zeroed() }
    }
}

pub fn querymenu(id: u32, index: u32) -> v4l2_querymenu {
    v4l2_querymenu {
        id,
        index,
        // SAFETY: plain C structure for which all-zero is a valid value.
        ..unsafe { mem::zeroed() }
    }
}

pub fn ext_control(id: u32) -> v4l2_ext_control {
    v4l2_ext_control {
        id,
        // SAFETY: plain C structure for which all-zero is a valid value.
        ..unsafe { mem::zeroed() }
    }
}

pub fn ext_controls(which: u32) -> v4l2_ext_controls {
    // SAFETY: plain C structure for which all-zero is a valid value; the
    // control array pointer starts out null.
    let mut raw: v4l2_ext_controls = unsafe { mem::zeroed() };
    raw.__bindgen_anon_1.which = which;
    raw
}

/// Views of the value union of a `v4l2_ext_control`.
pub trait ExtControlValue {
    fn value(&self) -> i32;
    fn value64(&self) -> i64;
    fn ptr(&self) -> *mut c_void;
    fn set_value(&mut self, value: i32);
    fn set_value64(&mut self, value: i64);
    fn set_ptr(&mut self, ptr: *mut c_void);
}

impl ExtControlValue for v4l2_ext_control {
    fn value(&self) -> i32 {
        let u = self.__bindgen_anon_1;
        // SAFETY: every bit pattern is a valid i32.
        unsafe { u.value }
    }

    fn value64(&self) -> i64 {
        let u = self.__bindgen_anon_1;
        // SAFETY: every bit pattern is a valid i64.
        unsafe { u.value64 }
    }

    fn ptr(&self) -> *mut c_void {
        let u = self.__bindgen_anon_1;
        // SAFETY: only read back after set_ptr().
        unsafe { u.ptr }
    }

    fn set_value(&mut self, value: i32) {
        let mut u = v4l2_ext_control__bindgen_ty_1 { value64: 0 };
        u.value = value;
        self.__bindgen_anon_1 = u;
    }

    fn set_value64(&mut self, value: i64) {
        self.__bindgen_anon_1 = v4l2_ext_control__bindgen_ty_1 { value64: value };
    }

    fn set_ptr(&mut self, ptr: *mut c_void) {
        self.__bindgen_anon_1 = v4l2_ext_control__bindgen_ty_1 { ptr };
    }
}

/// Views of the name/value union of a `v4l2_querymenu`.
pub trait MenuEntryValue {
    fn name(&self) -> String;
    fn value(&self) -> i64;
    fn set_name(&mut self, name: &str);
    fn set_value(&mut self, value: i64);
}

impl MenuEntryValue for v4l2_querymenu {
    fn name(&self) -> String {
        let u = self.__bindgen_anon_1;
        // SAFETY: every bit pattern is a valid byte array.
        cstr_field(&unsafe { u.name })
    }

    fn value(&self) -> i64 {
        let u = self.__bindgen_anon_1;
        // SAFETY: every bit pattern is a valid i64.
        unsafe { u.value }
    }

    fn set_name(&mut self, name: &str) {
        let mut field = [0u8; 32];
        let len = name.len().min(field.len() - 1);
        field[..len].copy_from_slice(&name.as_bytes()[..len]);
        self.__bindgen_anon_1 = v4l2_querymenu__bindgen_ty_1 { name: field };
    }

    fn set_value(&mut self, value: i64) {
        self.__bindgen_anon_1 = v4l2_querymenu__bindgen_ty_1 { value };
    }
}

/// Decode a nul-padded C string field. Names are for display, so invalid
/// UTF-8 is replaced rather than rejected.
pub fn cstr_field(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).into_owned()
}

/// Decode the `char` name field of a control description.
pub fn name_field(chars: &[c_char]) -> String {
    let bytes: Vec<u8> = chars.iter().map(|&c| c as u8).collect();
    cstr_field(&bytes)
}

/// Encode `name` into a control description name field, truncated so that
/// the field stays nul-terminated.
pub fn to_name_field(name: &str) -> [c_char; 32] {
    let mut out = [0 as c_char; 32];
    for (slot, &b) in out.iter_mut().zip(name.as_bytes().iter().take(31)) {
        *slot = b as c_char;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_values() {
        let mut ctrl = ext_control(V4L2_CID_BRIGHTNESS);
        ctrl.set_value(-3);
        assert_eq!(ctrl.value(), -3);
        ctrl.set_value64(1 << 40);
        assert_eq!(ctrl.value64(), 1 << 40);
    }

    #[test]
    fn test_menu_entry_union() {
        let mut menu = querymenu(V4L2_CID_POWER_LINE_FREQUENCY, 1);
        menu.set_name("50 Hz");
        assert_eq!(menu.name(), "50 Hz");
        menu.set_value(800_000_000);
        assert_eq!(menu.value(), 800_000_000);
    }

    #[test]
    fn test_name_fields() {
        let field = to_name_field("Brightness");
        assert_eq!(name_field(&field), "Brightness");
        let long = "x".repeat(40);
        assert_eq!(name_field(&to_name_field(&long)).len(), 31);
    }

    #[test]
    fn test_query_id_flags() {
        let (id, flags) = parse_ctrl_id_and_flags(V4L2_CID_BRIGHTNESS | V4L2_CTRL_FLAG_NEXT_CTRL);
        assert_eq!(id, V4L2_CID_BRIGHTNESS);
        assert_eq!(flags, QueryCtrlFlags::NEXT);
    }

    #[test]
    fn test_control_flags_keep_unknown_bits() {
        let flags = ControlFlags::from_bits_retain(V4L2_CTRL_FLAG_READ_ONLY | 0x0001_0000);
        assert!(flags.contains(ControlFlags::READ_ONLY));
        assert_eq!(flags.bits() & 0x0001_0000, 0x0001_0000);
    }
}
