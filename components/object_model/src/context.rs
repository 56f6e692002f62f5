//! The seam between native primitives and the executing VM.
//!
//! Primitives live in their own crate and must not depend on the
//! interpreter, yet many of them call back into it: block-evaluation
//! primitives re-enter `invoke`, `perform:` re-enters dispatch, `System
//! load:` reaches the class loader. [`VmContext`] is that seam; the
//! interpreter implements it, primitives consume it.

use crate::{Block, Class, Interrupt, Invokable, SomRef, Value};
use core_types::{RuntimeError, SymbolId};
use std::rc::Rc;

/// Handles to the bootstrap classes every dispatch needs.
///
/// Synthesized before any code runs; a missing entry afterwards means the
/// image is corrupt.
#[derive(Debug, Clone)]
pub struct CoreClasses {
    /// Root of the hierarchy
    pub object_class: SomRef<Class>,
    /// Class of class objects
    pub class_class: SomRef<Class>,
    /// Class of metaclass objects
    pub metaclass_class: SomRef<Class>,
    /// Class of nil
    pub nil_class: SomRef<Class>,
    /// Abstract superclass of True and False
    pub boolean_class: SomRef<Class>,
    /// Class of true
    pub true_class: SomRef<Class>,
    /// Class of false
    pub false_class: SomRef<Class>,
    /// Class of machine and big integers
    pub integer_class: SomRef<Class>,
    /// Class of doubles
    pub double_class: SomRef<Class>,
    /// Class of strings
    pub string_class: SomRef<Class>,
    /// Class of symbols
    pub symbol_class: SomRef<Class>,
    /// Class of arrays
    pub array_class: SomRef<Class>,
    /// Class of block closures
    pub block_class: SomRef<Class>,
    /// Class of compiled methods
    pub method_class: SomRef<Class>,
    /// Class of native primitives
    pub primitive_class: SomRef<Class>,
    /// Class of the `system` object
    pub system_class: SomRef<Class>,
}

impl CoreClasses {
    /// The class of `value`, following the metaclass link for classes.
    pub fn class_of(&self, value: &Value) -> SomRef<Class> {
        match value {
            Value::Nil => self.nil_class.clone(),
            Value::Boolean(true) => self.true_class.clone(),
            Value::Boolean(false) => self.false_class.clone(),
            Value::Integer(_) | Value::BigInteger(_) => self.integer_class.clone(),
            Value::Double(_) => self.double_class.clone(),
            Value::Str(_) => self.string_class.clone(),
            Value::Symbol(_) => self.symbol_class.clone(),
            Value::Array(_) => self.array_class.clone(),
            Value::Block(_) => self.block_class.clone(),
            Value::Instance(obj) => obj.class(),
            Value::Class(class) => class
                .borrow()
                .metaclass()
                .unwrap_or_else(|| self.metaclass_class.clone()),
            Value::Invokable(inv) => {
                if inv.is_primitive() {
                    self.primitive_class.clone()
                } else {
                    self.method_class.clone()
                }
            }
        }
    }
}

/// What the executing VM exposes to primitives.
pub trait VmContext {
    /// Intern `text` in the runtime's symbol table.
    fn intern(&mut self, text: &str) -> SymbolId;

    /// The text of an interned symbol.
    fn symbol_text(&self, id: SymbolId) -> Rc<str>;

    /// The bootstrap class handles.
    fn core(&self) -> &CoreClasses;

    /// Read a global.
    fn global(&self, name: SymbolId) -> Option<Value>;

    /// Install or replace a global.
    fn set_global(&mut self, name: SymbolId, value: Value);

    /// Whether a global exists.
    fn has_global(&self, name: SymbolId) -> bool {
        self.global(name).is_some()
    }

    /// Load (or return the already loaded) class `name` from the
    /// classpath.
    fn load_class(&mut self, name: SymbolId) -> Result<SomRef<Class>, RuntimeError>;

    /// Invoke a resolved method or primitive.
    fn invoke(
        &mut self,
        invokable: &Rc<Invokable>,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt>;

    /// Activate a block closure with `args`.
    fn invoke_block(&mut self, block: &Rc<Block>, args: Vec<Value>) -> Result<Value, Interrupt>;

    /// Full message dispatch: resolve `selector` against the receiver's
    /// class chain, falling back to `doesNotUnderstand:arguments:`.
    fn dispatch(
        &mut self,
        selector: SymbolId,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt>;

    /// The class of `value`.
    fn class_of(&self, value: &Value) -> SomRef<Class> {
        self.core().class_of(value)
    }

    /// Microseconds since the runtime started.
    fn ticks(&self) -> u64;
}
