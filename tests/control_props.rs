//! Property-Based Tests for control I/O
//!
//! These tests verify invariants of the control catalogue and of batched
//! reads and writes using proptest for input generation and shrinking.
//!
//! Run with: cargo test --test control_props

use crabctrl::testing::{SyntheticDriver, SYNTHETIC_NODE};
use crabctrl::v4l2::bindings::*;
use crabctrl::{ControlList, ControlValue, OpenFlags, SetOutcome, V4l2Device};
use proptest::prelude::*;

fn open_webcam() -> (V4l2Device<SyntheticDriver>, SyntheticDriver) {
    let driver = SyntheticDriver::uvc_webcam();
    let mut device = V4l2Device::with_backend(SYNTHETIC_NODE, driver.clone());
    device.open(OpenFlags::READ_WRITE).expect("synthetic device opens");
    (device, driver)
}

const SCALAR_IDS: [u32; 5] = [
    V4L2_CID_BRIGHTNESS,
    V4L2_CID_CONTRAST,
    V4L2_CID_SATURATION,
    V4L2_CID_HUE,
    V4L2_CID_GAIN,
];

#[derive(Debug, Clone)]
enum Op {
    Get(Vec<u32>),
    Set(Vec<(u32, i32)>),
    GetUnknown(u32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let id = prop::sample::select(SCALAR_IDS.to_vec());
    prop_oneof![
        prop::collection::vec(id.clone(), 1..5).prop_map(Op::Get),
        prop::collection::vec((id, any::<i32>()), 1..5).prop_map(Op::Set),
        (0x00de_0000u32..0x00de_ffff).prop_map(Op::GetUnknown),
    ]
}

proptest! {
    /// INVARIANT: the catalogue never changes while the device stays open
    #[test]
    fn catalogue_is_immutable_while_open(ops in prop::collection::vec(op_strategy(), 0..20)) {
        let (device, _driver) = open_webcam();
        let initial = device.controls().clone();

        for op in ops {
            match op {
                Op::Get(ids) => {
                    let _ = device.get_controls(&ids);
                }
                Op::Set(values) => {
                    let mut list: ControlList = values
                        .into_iter()
                        .map(|(id, v)| (id, ControlValue::Integer32(v)))
                        .collect();
                    let _ = device.set_controls(&mut list);
                }
                Op::GetUnknown(id) => {
                    prop_assert!(device.get_controls(&[id]).is_err());
                }
            }
            prop_assert_eq!(device.controls(), &initial);
        }
    }

    /// INVARIANT: an in-range write reads back unchanged
    #[test]
    fn in_range_write_reads_back(value in 0i32..=255) {
        let (device, _driver) = open_webcam();

        let mut list = ControlList::new();
        list.set(V4L2_CID_BRIGHTNESS, ControlValue::Integer32(value));
        prop_assert_eq!(device.set_controls(&mut list).unwrap(), SetOutcome::Applied);

        let read = device.get_controls(&[V4L2_CID_BRIGHTNESS]).unwrap();
        prop_assert_eq!(read.get(V4L2_CID_BRIGHTNESS), Some(&ControlValue::Integer32(value)));
    }

    /// INVARIANT: the value a write reports is the value a read returns,
    /// even when the driver clamped it
    #[test]
    fn written_value_matches_next_read(id in prop::sample::select(SCALAR_IDS.to_vec()), value in any::<i32>()) {
        let (device, _driver) = open_webcam();

        let mut list = ControlList::new();
        list.set(id, ControlValue::Integer32(value));
        let outcome = device.set_controls(&mut list).unwrap();

        let read = device.get_controls(&[id]).unwrap();
        prop_assert_eq!(read.get(id), list.get(id));
        if outcome == SetOutcome::Applied {
            prop_assert_eq!(list.get(id), Some(&ControlValue::Integer32(value)));
        }
    }

    /// INVARIANT: unknown ids never reach the driver
    #[test]
    fn unknown_ids_never_reach_driver(id in any::<u32>()) {
        let (device, driver) = open_webcam();
        prop_assume!(!device.controls().contains(id));

        let before = driver.calls();
        prop_assert!(device.get_controls(&[V4L2_CID_BRIGHTNESS, id]).is_err());
        prop_assert_eq!(driver.calls(), before);
    }
}
