//! The native primitive library.
//!
//! One module per core class, mirroring how the method dictionaries are
//! organized in the image: a primitive is installed into a class exactly
//! like a compiled method and is indistinguishable to dispatch. The
//! functions talk back to the executing VM only through the
//! [`VmContext`] seam, so this crate never depends on the interpreter.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod array;
mod block;
mod boolean;
mod number;
mod object;
mod string;
mod system;

use core_types::{Interner, RuntimeErrorKind};
use object_model::{
    Class, CoreClasses, Interrupt, Invokable, Primitive, PrimitiveFn, SomRef, Value, VmContext,
};
use std::rc::Rc;

/// Install the whole primitive library into the core classes.
///
/// Called once, right after the universe synthesized the class skeletons
/// and before any user code runs.
pub fn install_core(core: &CoreClasses, interner: &mut Interner) {
    object::install(core, interner);
    boolean::install(core, interner);
    number::install(core, interner);
    string::install(core, interner);
    array::install(core, interner);
    block::install(core, interner);
    system::install(core, interner);
}

// Shared installer: intern the selector, wrap the function, record the
// holder.
pub(crate) fn install(
    class: &SomRef<Class>,
    interner: &mut Interner,
    selector: &str,
    func: PrimitiveFn,
) {
    let sym = interner.intern(selector);
    Class::install(
        class,
        sym,
        Rc::new(Invokable::Primitive(Rc::new(Primitive::new(sym, func)))),
    );
}

pub(crate) fn invalid(message: impl Into<String>) -> Interrupt {
    Interrupt::error(RuntimeErrorKind::InvalidArgument, message)
}

// A block argument is evaluated; anything else is its own value.
pub(crate) fn eval_arg(ctx: &mut dyn VmContext, value: Value) -> Result<Value, Interrupt> {
    match value {
        Value::Block(block) => ctx.invoke_block(&block, vec![]),
        other => Ok(other),
    }
}

pub(crate) fn expect_boolean(value: &Value, what: &str) -> Result<bool, Interrupt> {
    match value {
        Value::Boolean(b) => Ok(*b),
        _ => Err(invalid(format!("{} must be a boolean", what))),
    }
}

// The text behind a string or symbol receiver; symbols inherit the
// string primitives.
pub(crate) fn text_of(ctx: &dyn VmContext, value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some((**s).clone()),
        Value::Symbol(sym) => Some(ctx.symbol_text(*sym).to_string()),
        _ => None,
    }
}
