//! Block closures.

use crate::{Frame, Method, Value};
use std::fmt;
use std::rc::Rc;

/// A block closure: a compiled body plus the frame it was created in.
///
/// The block shares, not owns, the captured frame; the frame's on-stack
/// marker tells the block whether its defining activation is still live
/// when a non-local return fires.
pub struct Block {
    /// The block body, compiled like a method
    pub method: Rc<Method>,
    /// The defining (outer) activation
    pub frame: Rc<Frame>,
}

impl Block {
    /// Close `method` over `frame`.
    pub fn new(method: Rc<Method>, frame: Rc<Frame>) -> Self {
        Self { method, frame }
    }

    /// Number of block parameters.
    pub fn num_args(&self) -> usize {
        self.method.body.num_args
    }

    /// The receiver of the home method activation; `self` inside the
    /// block body, and the receiver `escapedBlock:` goes to.
    pub fn outer_receiver(&self) -> Value {
        Frame::home(&self.frame).receiver()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("num_args", &self.num_args())
            .finish()
    }
}
