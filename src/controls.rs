//! Control identities, metadata and value containers
//!
//! These are the types callers see: a [`ControlInfoMap`] describing every
//! control a device exposes, and [`ControlList`]s carrying values in and out
//! of [`V4l2Device`](crate::device::V4l2Device).

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::v4l2::translate::ControlDescriptor;

/// Value type of a control, independent of the kernel type it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ControlType {
    None,
    Bool,
    Byte,
    Integer32,
    Integer64,
    String,
    U16,
    U32,
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlType::None => "none",
            ControlType::Bool => "bool",
            ControlType::Byte => "byte",
            ControlType::Integer32 => "int32",
            ControlType::Integer64 => "int64",
            ControlType::String => "string",
            ControlType::U16 => "u16",
            ControlType::U32 => "u32",
        };
        f.write_str(name)
    }
}

/// Static identity of a control: numeric id, driver name and value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ControlId {
    id: u32,
    name: String,
    control_type: ControlType,
}

impl ControlId {
    pub fn new(id: u32, name: impl Into<String>, control_type: ControlType) -> Self {
        Self {
            id,
            name: name.into(),
            control_type,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn control_type(&self) -> ControlType {
        self.control_type
    }
}

/// A control value.
///
/// Scalars use the `Bool`, `Integer32`, `Integer64` and `String` variants.
/// Controls that carry a payload of several elements use the array variants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum ControlValue {
    #[default]
    None,
    Bool(bool),
    Integer32(i32),
    Integer64(i64),
    String(String),
    Bytes(Vec<u8>),
    U16Array(Vec<u16>),
    U32Array(Vec<u32>),
    Integer32Array(Vec<i32>),
    Integer64Array(Vec<i64>),
}

impl ControlValue {
    pub fn is_none(&self) -> bool {
        matches!(self, ControlValue::None)
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            ControlValue::Bytes(_)
                | ControlValue::U16Array(_)
                | ControlValue::U32Array(_)
                | ControlValue::Integer32Array(_)
                | ControlValue::Integer64Array(_)
        )
    }

    /// Number of elements held by an array value, 1 for scalars, 0 for `None`.
    pub fn num_elements(&self) -> usize {
        match self {
            ControlValue::None => 0,
            ControlValue::Bytes(v) => v.len(),
            ControlValue::U16Array(v) => v.len(),
            ControlValue::U32Array(v) => v.len(),
            ControlValue::Integer32Array(v) => v.len(),
            ControlValue::Integer64Array(v) => v.len(),
            _ => 1,
        }
    }

    /// Scalar integer view, widening booleans and 32-bit values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ControlValue::Bool(v) => Some(i64::from(*v)),
            ControlValue::Integer32(v) => Some(i64::from(*v)),
            ControlValue::Integer64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ControlValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str("]")
        }

        match self {
            ControlValue::None => f.write_str("<none>"),
            ControlValue::Bool(v) => write!(f, "{v}"),
            ControlValue::Integer32(v) => write!(f, "{v}"),
            ControlValue::Integer64(v) => write!(f, "{v}"),
            ControlValue::String(v) => write!(f, "{v:?}"),
            ControlValue::Bytes(v) => list(f, v),
            ControlValue::U16Array(v) => list(f, v),
            ControlValue::U32Array(v) => list(f, v),
            ControlValue::Integer32Array(v) => list(f, v),
            ControlValue::Integer64Array(v) => list(f, v),
        }
    }
}

/// One entry of a menu control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MenuItem {
    Name { index: u32, name: String },
    Value { index: u32, value: i64 },
}

impl MenuItem {
    pub fn index(&self) -> u32 {
        match self {
            MenuItem::Name { index, .. } | MenuItem::Value { index, .. } => *index,
        }
    }
}

/// Range metadata for a control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlInfo {
    pub min: ControlValue,
    pub max: ControlValue,
    pub def: ControlValue,
    pub step: u64,
    pub menu: Vec<MenuItem>,
}

impl ControlInfo {
    pub fn new(min: ControlValue, max: ControlValue, def: ControlValue) -> Self {
        Self {
            min,
            max,
            def,
            step: 0,
            menu: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: u64) -> Self {
        self.step = step;
        self
    }

    pub fn with_menu(mut self, menu: Vec<MenuItem>) -> Self {
        self.menu = menu;
        self
    }
}

/// Ordered list of control values keyed by numeric id.
///
/// Insertion order is preserved and duplicate ids are allowed, matching the
/// layout of a kernel control batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlList {
    entries: Vec<(u32, ControlValue)>,
}

impl ControlList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append an entry, even if `id` is already present.
    pub fn push(&mut self, id: u32, value: ControlValue) {
        self.entries.push((id, value));
    }

    /// Replace the value of the first entry for `id`, or append one.
    pub fn set(&mut self, id: u32, value: ControlValue) {
        match self.entries.iter_mut().find(|(i, _)| *i == id) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((id, value)),
        }
    }

    pub fn get(&self, id: u32) -> Option<&ControlValue> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, v)| v)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &ControlValue)> {
        self.entries.iter().map(|(id, v)| (*id, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut ControlValue)> {
        self.entries.iter_mut().map(|(id, v)| (*id, v))
    }
}

impl FromIterator<(u32, ControlValue)> for ControlList {
    fn from_iter<I: IntoIterator<Item = (u32, ControlValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A catalogue entry: identity, range metadata and the kernel descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlEntry {
    pub id: ControlId,
    pub info: ControlInfo,
    #[serde(skip)]
    pub descriptor: ControlDescriptor,
}

/// The controls supported by a device, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlInfoMap {
    entries: Vec<ControlEntry>,
    index: HashMap<u32, usize>,
}

impl ControlInfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Returns `false`, leaving the map untouched, if the id is
    /// already present.
    pub(crate) fn insert(&mut self, entry: ControlEntry) -> bool {
        let id = entry.id.id();
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id, self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn get(&self, id: u32) -> Option<&ControlEntry> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    /// Look a control up by its driver name, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Option<&ControlEntry> {
        self.entries
            .iter()
            .find(|e| e.id.name().eq_ignore_ascii_case(name))
    }

    /// Look a control up by hex id (`0x00980900`), decimal id or driver
    /// name. Dashes and underscores in names match spaces.
    pub fn resolve(&self, name: &str) -> Option<&ControlEntry> {
        let id = match name.strip_prefix("0x").or_else(|| name.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => name.parse::<u32>().ok(),
        };

        match id {
            Some(id) => self.get(id),
            None => self
                .find_by_name(name)
                .or_else(|| self.find_by_name(&name.replace(['-', '_'], " "))),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControlEntry> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|e| e.id.id())
    }
}

impl<'a> IntoIterator for &'a ControlInfoMap {
    type Item = &'a ControlEntry;
    type IntoIter = std::slice::Iter<'a, ControlEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_list_keeps_duplicates_in_order() {
        let mut list = ControlList::new();
        list.push(2, ControlValue::Integer32(1));
        list.push(1, ControlValue::Bool(true));
        list.push(2, ControlValue::Integer32(3));

        let ids: Vec<u32> = list.ids().collect();
        assert_eq!(ids, vec![2, 1, 2]);
        assert_eq!(list.get(2), Some(&ControlValue::Integer32(1)));
    }

    #[test]
    fn test_control_list_set_replaces_first() {
        let mut list = ControlList::new();
        list.set(7, ControlValue::Integer32(1));
        list.set(7, ControlValue::Integer32(2));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(7), Some(&ControlValue::Integer32(2)));
    }

    #[test]
    fn test_value_widening() {
        assert_eq!(ControlValue::Bool(true).as_i64(), Some(1));
        assert_eq!(ControlValue::Integer32(-5).as_i64(), Some(-5));
        assert_eq!(ControlValue::Bytes(vec![1]).as_i64(), None);
        assert_eq!(ControlValue::U16Array(vec![1, 2, 3]).num_elements(), 3);
        assert!(ControlValue::Integer32Array(vec![]).is_array());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(ControlValue::Bytes(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(ControlValue::String("ab".into()).to_string(), "\"ab\"");
        assert_eq!(ControlValue::None.to_string(), "<none>");
    }
}
