//! Translation between kernel control descriptions and values and the types
//! in [`crate::controls`].

use serde::Serialize;

use super::batch::ControlBatch;
use super::bindings::*;
use crate::controls::{ControlId, ControlInfo, ControlType, ControlValue, MenuItem};
use crate::errors::DeviceError;

/// Kernel control types this crate knows how to move values for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum V4l2CtrlType {
    Integer,
    Boolean,
    Menu,
    Button,
    Integer64,
    String,
    Bitmask,
    IntegerMenu,
    U8,
    U16,
    U32,
}

impl V4l2CtrlType {
    /// Map a raw `V4L2_CTRL_TYPE_*` value. Returns `None` for types that are
    /// not supported, including control class markers.
    pub fn from_raw(raw: u32) -> Option<Self> {
        let ty = match raw {
            V4L2_CTRL_TYPE_INTEGER => V4l2CtrlType::Integer,
            V4L2_CTRL_TYPE_BOOLEAN => V4l2CtrlType::Boolean,
            V4L2_CTRL_TYPE_MENU => V4l2CtrlType::Menu,
            V4L2_CTRL_TYPE_BUTTON => V4l2CtrlType::Button,
            V4L2_CTRL_TYPE_INTEGER64 => V4l2CtrlType::Integer64,
            V4L2_CTRL_TYPE_STRING => V4l2CtrlType::String,
            V4L2_CTRL_TYPE_BITMASK => V4l2CtrlType::Bitmask,
            V4L2_CTRL_TYPE_INTEGER_MENU => V4l2CtrlType::IntegerMenu,
            V4L2_CTRL_TYPE_U8 => V4l2CtrlType::U8,
            V4L2_CTRL_TYPE_U16 => V4l2CtrlType::U16,
            V4L2_CTRL_TYPE_U32 => V4l2CtrlType::U32,
            _ => return None,
        };
        Some(ty)
    }

    pub fn raw(self) -> u32 {
        match self {
            V4l2CtrlType::Integer => V4L2_CTRL_TYPE_INTEGER,
            V4l2CtrlType::Boolean => V4L2_CTRL_TYPE_BOOLEAN,
            V4l2CtrlType::Menu => V4L2_CTRL_TYPE_MENU,
            V4l2CtrlType::Button => V4L2_CTRL_TYPE_BUTTON,
            V4l2CtrlType::Integer64 => V4L2_CTRL_TYPE_INTEGER64,
            V4l2CtrlType::String => V4L2_CTRL_TYPE_STRING,
            V4l2CtrlType::Bitmask => V4L2_CTRL_TYPE_BITMASK,
            V4l2CtrlType::IntegerMenu => V4L2_CTRL_TYPE_INTEGER_MENU,
            V4l2CtrlType::U8 => V4L2_CTRL_TYPE_U8,
            V4l2CtrlType::U16 => V4L2_CTRL_TYPE_U16,
            V4l2CtrlType::U32 => V4L2_CTRL_TYPE_U32,
        }
    }

    pub fn control_type(self) -> ControlType {
        match self {
            V4l2CtrlType::U8 => ControlType::Byte,
            V4l2CtrlType::Boolean => ControlType::Bool,
            V4l2CtrlType::Integer64 => ControlType::Integer64,
            V4l2CtrlType::String => ControlType::String,
            V4l2CtrlType::U16 => ControlType::U16,
            V4l2CtrlType::U32 => ControlType::U32,
            // More precise types may be needed, for now use a 32-bit integer.
            V4l2CtrlType::Integer
            | V4l2CtrlType::Menu
            | V4l2CtrlType::Button
            | V4l2CtrlType::Bitmask
            | V4l2CtrlType::IntegerMenu => ControlType::Integer32,
        }
    }

    pub fn is_menu(self) -> bool {
        matches!(self, V4l2CtrlType::Menu | V4l2CtrlType::IntegerMenu)
    }

    /// Element size the kernel uses for this type when it has a fixed one.
    fn fixed_elem_size(self) -> Option<u32> {
        match self {
            V4l2CtrlType::String => None,
            V4l2CtrlType::U8 => Some(1),
            V4l2CtrlType::U16 => Some(2),
            V4l2CtrlType::Integer64 => Some(8),
            _ => Some(4),
        }
    }
}

/// Everything the kernel told us about one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlDescriptor {
    pub id: u32,
    pub name: String,
    pub ctrl_type: V4l2CtrlType,
    pub flags: ControlFlags,
    pub minimum: i64,
    pub maximum: i64,
    pub step: u64,
    pub default_value: i64,
    pub elem_size: u32,
    pub elems: u32,
    pub dims: Vec<u32>,
    pub menu: Vec<MenuItem>,
}

impl ControlDescriptor {
    /// Build a descriptor from a `VIDIOC_QUERY_EXT_CTRL` result. Returns
    /// `None` when the control type is not supported.
    pub fn from_query(query: &v4l2_query_ext_ctrl) -> Option<Self> {
        let ctrl_type = V4l2CtrlType::from_raw(query.type_)?;
        let nr_of_dims = (query.nr_of_dims as usize).min(query.dims.len());

        Some(Self {
            id: query.id,
            name: name_field(&query.name),
            ctrl_type,
            flags: ControlFlags::from_bits_retain(query.flags),
            minimum: query.minimum,
            maximum: query.maximum,
            step: query.step,
            default_value: query.default_value,
            elem_size: query.elem_size,
            elems: query.elems,
            dims: query.dims[..nr_of_dims].to_vec(),
            menu: Vec::new(),
        })
    }

    pub fn has_flag(&self, flag: ControlFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_read_only(&self) -> bool {
        self.has_flag(ControlFlags::READ_ONLY)
    }

    /// Whether the value travels in an external buffer rather than inline
    /// in the `v4l2_ext_control` entry.
    pub fn has_payload(&self) -> bool {
        self.has_flag(ControlFlags::HAS_PAYLOAD)
            || self.elems > 1
            || matches!(
                self.ctrl_type,
                V4l2CtrlType::String | V4l2CtrlType::U8 | V4l2CtrlType::U16 | V4l2CtrlType::U32
            )
    }

    /// Size in bytes of the payload buffer the kernel expects.
    pub fn payload_size(&self) -> usize {
        self.elems as usize * self.elem_size as usize
    }

    pub fn control_id(&self) -> ControlId {
        ControlId::new(self.id, self.name.clone(), self.ctrl_type.control_type())
    }

    /// Range metadata, with the kernel's 64-bit bounds narrowed to the
    /// control's value type. Bounds outside that type saturate at its limits.
    pub fn control_info(&self) -> ControlInfo {
        let (min, max, def) = match self.ctrl_type {
            V4l2CtrlType::U8 => (
                ControlValue::Bytes(vec![saturate(self.minimum, u8::MIN, u8::MAX)]),
                ControlValue::Bytes(vec![saturate(self.maximum, u8::MIN, u8::MAX)]),
                ControlValue::Bytes(vec![saturate(self.default_value, u8::MIN, u8::MAX)]),
            ),
            V4l2CtrlType::U16 => (
                ControlValue::U16Array(vec![saturate(self.minimum, u16::MIN, u16::MAX)]),
                ControlValue::U16Array(vec![saturate(self.maximum, u16::MIN, u16::MAX)]),
                ControlValue::U16Array(vec![saturate(self.default_value, u16::MIN, u16::MAX)]),
            ),
            V4l2CtrlType::U32 => (
                ControlValue::U32Array(vec![saturate(self.minimum, u32::MIN, u32::MAX)]),
                ControlValue::U32Array(vec![saturate(self.maximum, u32::MIN, u32::MAX)]),
                ControlValue::U32Array(vec![saturate(self.default_value, u32::MIN, u32::MAX)]),
            ),
            V4l2CtrlType::Boolean => (
                ControlValue::Bool(self.minimum != 0),
                ControlValue::Bool(self.maximum != 0),
                ControlValue::Bool(self.default_value != 0),
            ),
            V4l2CtrlType::Integer64 => (
                ControlValue::Integer64(self.minimum),
                ControlValue::Integer64(self.maximum),
                ControlValue::Integer64(self.default_value),
            ),
            // For strings the bounds are lengths.
            _ => (
                ControlValue::Integer32(saturate(self.minimum, i32::MIN, i32::MAX)),
                ControlValue::Integer32(saturate(self.maximum, i32::MIN, i32::MAX)),
                ControlValue::Integer32(saturate(self.default_value, i32::MIN, i32::MAX)),
            ),
        };

        ControlInfo::new(min, max, def)
            .with_step(self.step)
            .with_menu(self.menu.clone())
    }

    /// Check the shape the kernel reported against what the type implies.
    pub fn validate_shape(&self) -> Result<(), String> {
        if self.elems == 0 {
            return Err("control has zero elements".to_string());
        }
        if self.elem_size == 0 {
            return Err("control has zero element size".to_string());
        }
        if let Some(size) = self.ctrl_type.fixed_elem_size() {
            if self.elem_size != size {
                return Err(format!(
                    "element size {} does not match type {:?}",
                    self.elem_size, self.ctrl_type
                ));
            }
        }
        if self.ctrl_type == V4l2CtrlType::String && self.elems != 1 {
            return Err("string arrays are not supported".to_string());
        }
        Ok(())
    }
}

fn saturate<T: TryFrom<i64>>(value: i64, lo: T, hi: T) -> T {
    T::try_from(value).unwrap_or(if value < 0 { lo } else { hi })
}

/// Append a zero-initialised entry for reading `desc` to `batch`.
pub fn push_for_read(batch: &mut ControlBatch, desc: &ControlDescriptor) {
    if desc.has_payload() {
        batch.push_payload(desc.id, vec![0; desc.payload_size()]);
    } else if desc.ctrl_type == V4l2CtrlType::Integer64 {
        batch.push_value64(desc.id, 0);
    } else {
        batch.push_value(desc.id, 0);
    }
}

fn expect_len(desc: &ControlDescriptor, len: usize) -> Result<(), DeviceError> {
    if len != desc.elems as usize {
        return Err(DeviceError::invalid_value(
            desc.id,
            format!("expected {} elements, got {}", desc.elems, len),
        ));
    }
    Ok(())
}

fn mismatch(desc: &ControlDescriptor, value: &ControlValue) -> DeviceError {
    DeviceError::invalid_value(
        desc.id,
        format!(
            "{:?} value does not fit a {:?} control",
            value, desc.ctrl_type
        ),
    )
}

/// Encode `value` for `desc` and append it to `batch`.
///
/// Values must have the control's exact type and element count. Nothing is
/// truncated: a 64-bit value for a 32-bit control is rejected.
pub fn push_for_write(
    batch: &mut ControlBatch,
    desc: &ControlDescriptor,
    value: &ControlValue,
) -> Result<(), DeviceError> {
    use V4l2CtrlType as T;

    if desc.has_payload() {
        let payload = encode_payload(desc, value)?;
        batch.push_payload(desc.id, payload);
        return Ok(());
    }

    match (desc.ctrl_type, value) {
        (T::Integer64, ControlValue::Integer64(v)) => batch.push_value64(desc.id, *v),
        (T::Boolean, ControlValue::Bool(v)) => batch.push_value(desc.id, i32::from(*v)),
        (T::Integer | T::Menu | T::Button | T::Bitmask | T::IntegerMenu, ControlValue::Integer32(v)) => {
            batch.push_value(desc.id, *v)
        }
        _ => return Err(mismatch(desc, value)),
    }

    Ok(())
}

fn encode_payload(desc: &ControlDescriptor, value: &ControlValue) -> Result<Vec<u8>, DeviceError> {
    use V4l2CtrlType as T;

    let mut payload = Vec::with_capacity(desc.payload_size());

    match (desc.ctrl_type, value) {
        (T::String, ControlValue::String(s)) => {
            let max = desc.payload_size().saturating_sub(1);
            if s.len() > max {
                return Err(DeviceError::invalid_value(
                    desc.id,
                    format!("string of {} bytes exceeds maximum of {}", s.len(), max),
                ));
            }
            if s.as_bytes().contains(&0) {
                return Err(DeviceError::invalid_value(desc.id, "string contains a nul byte"));
            }
            payload.extend_from_slice(s.as_bytes());
            payload.resize(desc.payload_size(), 0);
        }
        (T::U8, ControlValue::Bytes(v)) => {
            expect_len(desc, v.len())?;
            payload.extend_from_slice(v);
        }
        (T::U16, ControlValue::U16Array(v)) => {
            expect_len(desc, v.len())?;
            v.iter().for_each(|x| payload.extend_from_slice(&x.to_ne_bytes()));
        }
        (T::U32, ControlValue::U32Array(v)) => {
            expect_len(desc, v.len())?;
            v.iter().for_each(|x| payload.extend_from_slice(&x.to_ne_bytes()));
        }
        (T::Integer64, ControlValue::Integer64Array(v)) => {
            expect_len(desc, v.len())?;
            v.iter().for_each(|x| payload.extend_from_slice(&x.to_ne_bytes()));
        }
        (
            T::Integer | T::Boolean | T::Menu | T::Button | T::Bitmask | T::IntegerMenu,
            ControlValue::Integer32Array(v),
        ) => {
            expect_len(desc, v.len())?;
            v.iter().for_each(|x| payload.extend_from_slice(&x.to_ne_bytes()));
        }
        _ => return Err(mismatch(desc, value)),
    }

    Ok(payload)
}

/// Decode entry `index` of `batch` according to `desc`.
///
/// String controls must hold UTF-8. Anything else is reported as
/// [`DeviceError::InvalidValue`] rather than decoded lossily, so a value
/// read here can always be written back unchanged.
pub fn decode(
    batch: &ControlBatch,
    index: usize,
    desc: &ControlDescriptor,
) -> Result<ControlValue, DeviceError> {
    use V4l2CtrlType as T;

    let entry = batch.entry(index);
    let payload = match batch.payload(index) {
        Some(payload) => payload,
        None => {
            let value = match desc.ctrl_type {
                T::Integer64 => ControlValue::Integer64(entry.value64()),
                T::Boolean => ControlValue::Bool(entry.value() != 0),
                _ => ControlValue::Integer32(entry.value()),
            };
            return Ok(value);
        }
    };

    fn elements<const N: usize, E>(payload: &[u8], f: fn([u8; N]) -> E) -> Vec<E> {
        payload
            .chunks_exact(N)
            .map(|chunk| {
                let mut bytes = [0u8; N];
                bytes.copy_from_slice(chunk);
                f(bytes)
            })
            .collect()
    }

    let value = match desc.ctrl_type {
        T::String => {
            let len = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
            let text = std::str::from_utf8(&payload[..len]).map_err(|e| {
                DeviceError::invalid_value(desc.id, format!("string is not UTF-8: {}", e))
            })?;
            ControlValue::String(text.to_string())
        }
        T::U8 => ControlValue::Bytes(payload.to_vec()),
        T::U16 => ControlValue::U16Array(elements(payload, u16::from_ne_bytes)),
        T::U32 => ControlValue::U32Array(elements(payload, u32::from_ne_bytes)),
        T::Integer64 => ControlValue::Integer64Array(elements(payload, i64::from_ne_bytes)),
        T::Integer | T::Boolean | T::Menu | T::Button | T::Bitmask | T::IntegerMenu => {
            ControlValue::Integer32Array(elements(payload, i32::from_ne_bytes))
        }
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(id: u32, type_: u32, elem_size: u32, elems: u32) -> v4l2_query_ext_ctrl {
        v4l2_query_ext_ctrl {
            type_,
            name: to_name_field("Test Control"),
            minimum: 0,
            maximum: 255,
            step: 1,
            default_value: 128,
            elem_size,
            elems,
            ..query_ext_ctrl(id)
        }
    }

    #[test]
    fn test_unsupported_type_is_rejected() {
        let q = query(1, V4L2_CTRL_TYPE_AREA, 8, 1);
        assert!(ControlDescriptor::from_query(&q).is_none());
        let q = query(1, V4L2_CTRL_TYPE_CTRL_CLASS, 0, 0);
        assert!(ControlDescriptor::from_query(&q).is_none());
    }

    #[test]
    fn test_integer_descriptor() {
        let desc = ControlDescriptor::from_query(&query(V4L2_CID_BRIGHTNESS, V4L2_CTRL_TYPE_INTEGER, 4, 1))
            .unwrap();
        assert_eq!(desc.name, "Test Control");
        assert!(!desc.has_payload());
        assert_eq!(desc.control_id().control_type(), ControlType::Integer32);

        let info = desc.control_info();
        assert_eq!(info.min, ControlValue::Integer32(0));
        assert_eq!(info.max, ControlValue::Integer32(255));
        assert_eq!(info.def, ControlValue::Integer32(128));
        assert_eq!(info.step, 1);
    }

    #[test]
    fn test_shape_validation() {
        let desc = ControlDescriptor::from_query(&query(1, V4L2_CTRL_TYPE_U16, 2, 0)).unwrap();
        assert!(desc.validate_shape().is_err());
        let desc = ControlDescriptor::from_query(&query(1, V4L2_CTRL_TYPE_U16, 4, 2)).unwrap();
        assert!(desc.validate_shape().is_err());
        let desc = ControlDescriptor::from_query(&query(1, V4L2_CTRL_TYPE_U16, 2, 2)).unwrap();
        assert!(desc.validate_shape().is_ok());
    }

    #[test]
    fn test_wider_value_is_rejected() {
        let desc = ControlDescriptor::from_query(&query(1, V4L2_CTRL_TYPE_INTEGER, 4, 1)).unwrap();
        let mut batch = ControlBatch::new(V4L2_CTRL_WHICH_CUR_VAL);
        let err = push_for_write(&mut batch, &desc, &ControlValue::Integer64(1)).unwrap_err();
        assert!(matches!(err, DeviceError::InvalidValue { id: 1, .. }));
        assert!(batch.is_empty());
    }

    #[test]
    fn test_u16_array_write_then_decode() {
        let desc = ControlDescriptor::from_query(&query(9, V4L2_CTRL_TYPE_U16, 2, 3)).unwrap();
        let mut batch = ControlBatch::new(V4L2_CTRL_WHICH_CUR_VAL);
        let value = ControlValue::U16Array(vec![1, 300, 65535]);
        push_for_write(&mut batch, &desc, &value).unwrap();
        assert_eq!(batch.payload(0).map(<[u8]>::len), Some(6));
        assert_eq!(decode(&batch, 0, &desc), Ok(value));

        let short = ControlValue::U16Array(vec![1]);
        assert!(push_for_write(&mut batch, &desc, &short).is_err());
    }

    #[test]
    fn test_string_bounds() {
        let mut q = query(5, V4L2_CTRL_TYPE_STRING, 5, 1);
        q.maximum = 4;
        let desc = ControlDescriptor::from_query(&q).unwrap();
        let mut batch = ControlBatch::new(V4L2_CTRL_WHICH_CUR_VAL);

        push_for_write(&mut batch, &desc, &ControlValue::String("abcd".into())).unwrap();
        assert_eq!(decode(&batch, 0, &desc), Ok(ControlValue::String("abcd".into())));
        assert!(push_for_write(&mut batch, &desc, &ControlValue::String("abcde".into())).is_err());
    }

    #[test]
    fn test_non_utf8_string_is_rejected() {
        let desc = ControlDescriptor::from_query(&query(5, V4L2_CTRL_TYPE_STRING, 5, 1)).unwrap();
        let mut batch = ControlBatch::new(V4L2_CTRL_WHICH_CUR_VAL);
        batch.push_payload(5, vec![b'a', 0xff, 0xfe, 0, 0]);

        match decode(&batch, 0, &desc) {
            Err(DeviceError::InvalidValue { id: 5, reason }) => assert!(reason.contains("UTF-8")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_bounds_saturate() {
        let mut q = query(7, V4L2_CTRL_TYPE_U8, 1, 4);
        q.minimum = -5;
        q.maximum = 1 << 20;
        q.default_value = 300;
        let info = ControlDescriptor::from_query(&q).unwrap().control_info();
        assert_eq!(info.min, ControlValue::Bytes(vec![0]));
        assert_eq!(info.max, ControlValue::Bytes(vec![u8::MAX]));
        assert_eq!(info.def, ControlValue::Bytes(vec![u8::MAX]));

        let mut q = query(8, V4L2_CTRL_TYPE_INTEGER, 4, 1);
        q.minimum = i64::MIN;
        q.maximum = i64::MAX;
        q.default_value = -1;
        let info = ControlDescriptor::from_query(&q).unwrap().control_info();
        assert_eq!(info.min, ControlValue::Integer32(i32::MIN));
        assert_eq!(info.max, ControlValue::Integer32(i32::MAX));
        assert_eq!(info.def, ControlValue::Integer32(-1));

        let mut q = query(9, V4L2_CTRL_TYPE_U32, 4, 2);
        q.maximum = i64::from(u32::MAX) + 1;
        let info = ControlDescriptor::from_query(&q).unwrap().control_info();
        assert_eq!(info.max, ControlValue::U32Array(vec![u32::MAX]));
    }
}
