//! The RSOM object model.
//!
//! Everything the two halves of the runtime (compiler and interpreter)
//! agree on lives here: the tagged [`Value`] representation, classes and
//! metaclasses, compiled methods and native primitives behind one
//! [`Invokable`] contract, adaptive per-class field layouts, strategy-
//! switching array storage, activation frames with the non-local-return
//! marker, per-call-site inline caches, and the [`VmContext`] seam that
//! primitives use to call back into the executing VM.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

mod array;
mod block;
mod cache;
mod class;
mod context;
mod frame;
mod instance;
mod layout;
mod method;
mod signal;
mod value;

pub use array::{ArrayObj, ArrayStorage, ElemKindTag};
pub use block::Block;
pub use cache::{CallCache, MAX_CACHE_ENTRIES};
pub use class::Class;
pub use context::{CoreClasses, VmContext};
pub use frame::Frame;
pub use instance::Instance;
pub use layout::{
    FieldLocation, ObjectLayout, StorageKind, PRIM_INLINE_SLOTS, PTR_INLINE_SLOTS,
};
pub use method::{Invokable, Method, MethodBody, Primitive, PrimitiveFn};
pub use signal::Interrupt;
pub use value::Value;

/// A strong, shared, interior-mutable reference to a runtime object.
pub type SomRef<T> = Rc<RefCell<T>>;

/// Wrap a value in a fresh [`SomRef`].
pub fn som_ref<T>(value: T) -> SomRef<T> {
    Rc::new(RefCell::new(value))
}
