//! Invariant checks for the control catalogue and batches
//!
//! Production code asserts invariants through [`assert_invariant!`]; every
//! checked invariant is recorded per thread so contract tests can prove the
//! check actually ran.
//!
//! ```rust,ignore
//! use crabctrl::invariant_ppt::*;
//!
//! #[test]
//! fn contract_enumeration() {
//!     // ... open a device ...
//!     contract_test("enumeration", &[CATALOGUE_UNIQUE_IDS]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashSet;
use std::thread_local;

/// A driver never reports the same control id twice during one walk.
pub const CATALOGUE_UNIQUE_IDS: &str = "Control ids are unique within a catalogue";

/// A closed device exposes an empty catalogue.
pub const CLOSED_DEVICE_EMPTY_CATALOGUE: &str = "Closed device holds no catalogue";

/// Decoding covers exactly the entries the batch was built with.
pub const BATCH_MATCHES_REQUEST: &str = "Batch entry count matches request count";

thread_local! {
    static INVARIANT_LOG: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Assert an invariant and record it for contract testing.
///
/// # Panics
/// Panics if the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &str, context: Option<&str>) {
    INVARIANT_LOG.with(|log| {
        log.borrow_mut().insert(message.to_string());
    });

    if !condition {
        let ctx = context.unwrap_or("unknown");
        log::error!("Invariant violated [{}]: {}", ctx, message);
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// Check that the given invariants were asserted on this thread.
///
/// # Panics
/// Panics listing every invariant that was never checked.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let log = INVARIANT_LOG.with(|log| log.borrow().clone());

    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|invariant| !log.contains(*invariant))
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

pub fn clear_invariant_log() {
    INVARIANT_LOG.with(|log| {
        log.borrow_mut().clear();
    });
}
