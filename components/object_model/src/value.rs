//! Tagged runtime value representation.
//!
//! This module provides the core `Value` enum that represents every value
//! the language can manipulate. Primitive values are stored inline, heap
//! objects are shared through `Rc` so identity comparison is pointer
//! comparison.

use crate::{ArrayObj, Block, Class, Instance, Invokable, SomRef, StorageKind};
use core_types::SymbolId;
use num_bigint::BigInt;
use std::fmt;
use std::rc::Rc;

/// Any value the runtime can hold.
///
/// The variant set is closed: every object the language manipulates is
/// one of these. Value kinds (nil, booleans, numbers, strings, symbols)
/// compare by content; reference kinds compare by identity.
///
/// # Examples
///
/// ```
/// use object_model::Value;
///
/// let n = Value::Integer(42);
/// assert!(!n.is_nil());
/// assert_eq!(n, Value::Integer(42));
/// ```
#[derive(Clone)]
pub enum Value {
    /// The single nil object
    Nil,
    /// true or false
    Boolean(bool),
    /// Machine-word integer; promoted to [`Value::BigInteger`] on overflow
    Integer(i64),
    /// Arbitrary-precision integer
    BigInteger(Rc<BigInt>),
    /// IEEE 754 double-precision float
    Double(f64),
    /// Immutable text
    Str(Rc<String>),
    /// Interned symbol
    Symbol(SymbolId),
    /// Indexable sequence with strategy storage
    Array(Rc<ArrayObj>),
    /// Block closure capturing its defining frame
    Block(Rc<Block>),
    /// A class object
    Class(SomRef<Class>),
    /// A first-class method or primitive
    Invokable(Rc<Invokable>),
    /// Instance of a user-defined class with adaptive field storage
    Instance(Rc<Instance>),
}

impl Value {
    /// Whether this is the nil object.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The storage kind a field receives when this value is written to it.
    ///
    /// Only machine integers and doubles get specialized primitive slots;
    /// everything else (including big integers) is stored as a pointer.
    pub fn storage_kind(&self) -> StorageKind {
        match self {
            Value::Integer(_) => StorageKind::Integer,
            Value::Double(_) => StorageKind::Double,
            _ => StorageKind::Object,
        }
    }

    /// Identity comparison: pointer equality for reference kinds, content
    /// equality for value kinds.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::BigInteger(a), Value::BigInteger(b)) => Rc::ptr_eq(a, b),
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Block(a), Value::Block(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Invokable(a), Value::Invokable(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Value kinds compare by content
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::BigInteger(a), Value::BigInteger(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            // Reference kinds compare by identity
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Block(a), Value::Block(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Invokable(a), Value::Invokable(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Integer(n) => f.debug_tuple("Integer").field(n).finish(),
            Value::BigInteger(n) => f.debug_tuple("BigInteger").field(n).finish(),
            Value::Double(n) => f.debug_tuple("Double").field(n).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Symbol(s) => f.debug_tuple("Symbol").field(&s.0).finish(),
            Value::Array(_) => write!(f, "Array(..)"),
            Value::Block(_) => write!(f, "Block(..)"),
            Value::Class(c) => f.debug_tuple("Class").field(&c.borrow().name.0).finish(),
            Value::Invokable(_) => write!(f, "Invokable(..)"),
            Value::Instance(_) => write!(f, "Instance(..)"),
        }
    }
}
