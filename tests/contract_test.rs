//! Contract tests: prove the device actually checks its invariants.

use crabctrl::invariant_ppt::*;
use crabctrl::testing::{SyntheticDriver, SYNTHETIC_NODE};
use crabctrl::v4l2::bindings::V4L2_CID_BRIGHTNESS;
use crabctrl::{OpenFlags, V4l2Device};

#[test]
fn contract_enumeration() {
    clear_invariant_log();

    let mut device = V4l2Device::with_backend(SYNTHETIC_NODE, SyntheticDriver::uvc_webcam());
    device.open(OpenFlags::READ_WRITE).unwrap();

    contract_test("enumeration", &[CATALOGUE_UNIQUE_IDS]);
}

#[test]
fn contract_control_io() {
    clear_invariant_log();

    let mut device = V4l2Device::with_backend(SYNTHETIC_NODE, SyntheticDriver::uvc_webcam());
    device.open(OpenFlags::READ_WRITE).unwrap();
    device.get_controls(&[V4L2_CID_BRIGHTNESS]).unwrap();

    contract_test("control io", &[BATCH_MATCHES_REQUEST]);
}

#[test]
fn contract_close() {
    clear_invariant_log();

    let mut device = V4l2Device::with_backend(SYNTHETIC_NODE, SyntheticDriver::uvc_webcam());
    device.open(OpenFlags::READ_WRITE).unwrap();
    device.close();

    contract_test("close", &[CLOSED_DEVICE_EMPTY_CATALOGUE]);
}
