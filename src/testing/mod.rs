//! Testing utilities for crabctrl
//!
//! Provides a synthetic V4L2 driver modelled on a typical UVC webcam, so
//! device code can be exercised without hardware.

pub mod synthetic_driver;

pub use synthetic_driver::{
    CallCounts, SyntheticControl, SyntheticDriver, SyntheticMenuEntry, SYNTHETIC_NODE,
    UVC_WEBCAM_CONTROLS,
};
