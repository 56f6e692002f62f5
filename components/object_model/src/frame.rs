//! Activation frames.
//!
//! A frame is created at invocation entry and holds the receiver,
//! argument slots, local slots, the operand stack and the program
//! counter. Frames are `Rc`-shared because block closures capture their
//! defining frame; the `Rc` identity of a frame is also the target marker
//! for non-local returns. The `on_stack` flag is true from creation until
//! the invocation returns, normally or via unwind; a block that still
//! holds the frame afterwards sees the flag down and treats a non-local
//! return as escaped.

use crate::{Block, Method, Value};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// One activation of a method or block body.
pub struct Frame {
    method: Rc<Method>,
    receiver: Value,
    args: RefCell<Vec<Value>>,
    locals: RefCell<Vec<Value>>,
    stack: RefCell<Vec<Value>>,
    pc: Cell<usize>,
    on_stack: Cell<bool>,
    block: Option<Rc<Block>>,
}

impl Frame {
    /// Allocate a frame for invoking `method` on `receiver`.
    ///
    /// `block` is the closure being activated when this is a block
    /// invocation; its captured frame chain is what context-level
    /// operands walk.
    pub fn allocate(
        method: Rc<Method>,
        receiver: Value,
        args: Vec<Value>,
        block: Option<Rc<Block>>,
    ) -> Rc<Frame> {
        let locals = vec![Value::Nil; method.body.num_locals];
        let stack = Vec::with_capacity(method.body.max_stack);
        Rc::new(Frame {
            method,
            receiver,
            args: RefCell::new(args),
            locals: RefCell::new(locals),
            stack: RefCell::new(stack),
            pc: Cell::new(0),
            on_stack: Cell::new(true),
            block,
        })
    }

    /// The method this frame is executing.
    pub fn method(&self) -> &Rc<Method> {
        &self.method
    }

    /// This activation's receiver.
    pub fn receiver(&self) -> Value {
        self.receiver.clone()
    }

    /// The block being activated, if this is a block frame.
    pub fn block(&self) -> Option<&Rc<Block>> {
        self.block.as_ref()
    }

    /// Read argument slot `index`.
    pub fn argument(&self, index: usize) -> Value {
        self.args.borrow()[index].clone()
    }

    /// Write argument slot `index`.
    pub fn set_argument(&self, index: usize, value: Value) {
        self.args.borrow_mut()[index] = value;
    }

    /// Read local slot `index`.
    pub fn local(&self, index: usize) -> Value {
        self.locals.borrow()[index].clone()
    }

    /// Write local slot `index`.
    pub fn set_local(&self, index: usize, value: Value) {
        self.locals.borrow_mut()[index] = value;
    }

    /// Push onto the operand stack.
    pub fn push(&self, value: Value) {
        self.stack.borrow_mut().push(value);
    }

    /// Pop the operand stack; `None` means the stack was corrupted.
    pub fn pop(&self) -> Option<Value> {
        self.stack.borrow_mut().pop()
    }

    /// Copy of the top of the operand stack.
    pub fn top(&self) -> Option<Value> {
        self.stack.borrow().last().cloned()
    }

    /// Pop `count` values, returned in push order.
    pub fn pop_n(&self, count: usize) -> Option<Vec<Value>> {
        let mut stack = self.stack.borrow_mut();
        if stack.len() < count {
            return None;
        }
        let at = stack.len() - count;
        Some(stack.split_off(at))
    }

    /// Current program counter.
    pub fn pc(&self) -> usize {
        self.pc.get()
    }

    /// Jump to `pc`.
    pub fn set_pc(&self, pc: usize) {
        self.pc.set(pc);
    }

    /// Whether this activation is still live on the call stack.
    pub fn is_on_stack(&self) -> bool {
        self.on_stack.get()
    }

    /// Flip the marker; called on every exit path, normal or unwind.
    pub fn mark_returned(&self) {
        self.on_stack.set(false);
    }

    /// The frame `level` lexical hops outward from `frame`.
    ///
    /// Level zero is `frame` itself; each hop follows the activated
    /// block's captured defining frame. `None` indicates a context level
    /// the compiler should never have emitted.
    pub fn context_at(frame: &Rc<Frame>, level: u8) -> Option<Rc<Frame>> {
        let mut current = frame.clone();
        for _ in 0..level {
            let outer = current.block.as_ref()?.frame.clone();
            current = outer;
        }
        Some(current)
    }

    /// The home method activation of `frame`: the frame reached by
    /// following the captured chain until it leaves block territory.
    pub fn home(frame: &Rc<Frame>) -> Rc<Frame> {
        let mut current = frame.clone();
        while let Some(block) = current.block.clone() {
            current = block.frame.clone();
        }
        current
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("method", &self.method.signature.0)
            .field("pc", &self.pc.get())
            .field("on_stack", &self.on_stack.get())
            .field("is_block", &self.block.is_some())
            .finish()
    }
}
