//! Kernel-facing half of the crate: V4L2 structure layouts, the ioctl
//! backend seam, per-call control batches and value translation.

pub mod batch;
pub mod bindings;
pub mod ioctl;
pub mod translate;

pub use batch::ControlBatch;
pub use ioctl::{AccessMode, IoctlBackend, KernelBackend, OpenFlags, Request};
pub use translate::{ControlDescriptor, V4l2CtrlType};
