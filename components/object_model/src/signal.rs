//! The control-transfer signal threaded through every frame's return
//! path.
//!
//! Execution results are `Result<Value, Interrupt>`: the error side is
//! not (only) failure but the unwinding channel. A non-local return
//! carries its target frame and propagates outward until the frame whose
//! identity matches consumes it; runtime errors and `System exit:`
//! propagate all the way to the driver.

use crate::{Frame, Value};
use core_types::{RuntimeError, RuntimeErrorKind};
use std::rc::Rc;

/// Why an activation is being unwound.
#[derive(Debug)]
pub enum Interrupt {
    /// A `^expr` executed inside a block; unwind to the frame whose
    /// identity equals `target`
    NonLocalReturn {
        /// The value the home activation returns
        value: Value,
        /// Marker identity of the home activation
        target: Rc<Frame>,
    },
    /// A runtime failure propagating to the driver
    Error(RuntimeError),
    /// `System exit:` with the given process exit code
    Exit(i32),
}

impl Interrupt {
    /// Shorthand for a runtime error interrupt.
    pub fn error(kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        Interrupt::Error(RuntimeError::new(kind, message))
    }

    /// Shorthand for a fatal (broken-image) interrupt.
    pub fn fatal(message: impl Into<String>) -> Self {
        Interrupt::Error(RuntimeError::fatal(message))
    }
}

impl From<RuntimeError> for Interrupt {
    fn from(err: RuntimeError) -> Self {
        Interrupt::Error(err)
    }
}
