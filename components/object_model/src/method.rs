//! Compiled methods and native primitives behind one invokable contract.
//!
//! The dispatch engine never distinguishes the two: both resolve from a
//! method dictionary, both take `(receiver, args)` and produce a value or
//! an unwind signal.

use crate::cache::CallCache;
use crate::{Class, Interrupt, SomRef, Value, VmContext};
use bytecode_system::Opcode;
use core_types::SymbolId;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// The compiled body of a bytecode method.
#[derive(Debug, Clone)]
pub struct MethodBody {
    /// Instruction vector
    pub code: Vec<Opcode>,
    /// Literal table: constants, selector symbols, nested block bodies
    pub literals: Vec<Value>,
    /// Declared argument count, not counting the receiver
    pub num_args: usize,
    /// Local-variable slot count
    pub num_locals: usize,
    /// Number of send-site cache slots in `code`
    pub num_caches: usize,
    /// Conservative operand-stack high-water mark
    pub max_stack: usize,
}

/// A compiled method.
///
/// The holder back-reference is weak: classes own their methods, not the
/// other way around. Inline caches are per call site and interior-mutable
/// because they are written lazily during execution.
pub struct Method {
    /// Selector this method implements
    pub signature: SymbolId,
    /// Compiled body
    pub body: MethodBody,
    holder: RefCell<Weak<RefCell<Class>>>,
    caches: RefCell<Vec<CallCache>>,
}

impl Method {
    /// Create a method with all call-site caches uninitialized.
    pub fn new(signature: SymbolId, body: MethodBody) -> Self {
        let caches = vec![CallCache::Uninitialized; body.num_caches];
        Self {
            signature,
            body,
            holder: RefCell::new(Weak::new()),
            caches: RefCell::new(caches),
        }
    }

    /// Snapshot of the cache at `slot`.
    pub fn cache(&self, slot: usize) -> CallCache {
        self.caches.borrow()[slot].clone()
    }

    /// Replace the cache at `slot`.
    pub fn set_cache(&self, slot: usize, cache: CallCache) {
        self.caches.borrow_mut()[slot] = cache;
    }

    /// The class this method is installed on, if any. Block bodies are
    /// never installed; super resolution uses the home method's holder.
    pub fn holder(&self) -> Option<SomRef<Class>> {
        self.holder.borrow().upgrade()
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("signature", &self.signature.0)
            .field("code_len", &self.body.code.len())
            .finish()
    }
}

/// Signature of a native primitive function.
///
/// The first parameter is the primitive itself (for diagnostics), then
/// the executing VM, the receiver, and the arguments in send order.
pub type PrimitiveFn =
    fn(&Primitive, &mut dyn VmContext, Value, Vec<Value>) -> Result<Value, Interrupt>;

/// A native method.
pub struct Primitive {
    /// Selector this primitive implements
    pub signature: SymbolId,
    /// Native implementation
    pub func: PrimitiveFn,
    holder: RefCell<Weak<RefCell<Class>>>,
}

impl Primitive {
    /// Create a primitive for `signature`.
    pub fn new(signature: SymbolId, func: PrimitiveFn) -> Self {
        Self {
            signature,
            func,
            holder: RefCell::new(Weak::new()),
        }
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("signature", &self.signature.0)
            .finish()
    }
}

/// Anything a method dictionary can hold.
///
/// Both variants carry shared handles: frames keep the executing method
/// alive independently of its holder class, and blocks share their
/// compiled body with the literal table it came from.
#[derive(Debug)]
pub enum Invokable {
    /// A compiled bytecode method
    Method(Rc<Method>),
    /// A native primitive
    Primitive(Rc<Primitive>),
}

impl Invokable {
    /// The selector this invokable implements.
    pub fn signature(&self) -> SymbolId {
        match self {
            Invokable::Method(m) => m.signature,
            Invokable::Primitive(p) => p.signature,
        }
    }

    /// The class this invokable is installed on, if any.
    pub fn holder(&self) -> Option<SomRef<Class>> {
        match self {
            Invokable::Method(m) => m.holder(),
            Invokable::Primitive(p) => p.holder.borrow().upgrade(),
        }
    }

    /// Record the holder link. Called on installation into a class.
    pub fn set_holder(&self, class: &SomRef<Class>) {
        let weak = Rc::downgrade(class);
        match self {
            Invokable::Method(m) => *m.holder.borrow_mut() = weak,
            Invokable::Primitive(p) => *p.holder.borrow_mut() = weak,
        }
    }

    /// This invokable as a compiled method, if it is one.
    pub fn as_method(&self) -> Option<&Rc<Method>> {
        match self {
            Invokable::Method(m) => Some(m),
            Invokable::Primitive(_) => None,
        }
    }

    /// Whether this is a native primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Invokable::Primitive(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_body(num_caches: usize) -> MethodBody {
        MethodBody {
            code: vec![Opcode::Halt],
            literals: vec![],
            num_args: 0,
            num_locals: 0,
            num_caches,
            max_stack: 0,
        }
    }

    #[test]
    fn test_method_caches_start_uninitialized() {
        let method = Method::new(SymbolId(0), empty_body(3));
        for slot in 0..3 {
            assert!(matches!(method.cache(slot), CallCache::Uninitialized));
        }
    }

    #[test]
    fn test_method_cache_update() {
        let method = Method::new(SymbolId(0), empty_body(1));
        method.set_cache(0, CallCache::Megamorphic);
        assert!(matches!(method.cache(0), CallCache::Megamorphic));
    }

    #[test]
    fn test_invokable_signature() {
        let method = Invokable::Method(Rc::new(Method::new(SymbolId(9), empty_body(0))));
        assert_eq!(method.signature(), SymbolId(9));
        assert!(!method.is_primitive());
        assert!(method.as_method().is_some());
    }

    #[test]
    fn test_unset_holder_is_none() {
        let method = Invokable::Method(Rc::new(Method::new(SymbolId(9), empty_body(0))));
        assert!(method.holder().is_none());
    }
}
