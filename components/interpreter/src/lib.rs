//! The bytecode execution engine.
//!
//! Two pieces live here. The [`Universe`] owns everything that outlasts a
//! single invocation: the symbol table, the globals dictionary, the
//! bootstrap class handles, and the classpath class loader. The
//! [`Interpreter`] drives execution: the fetch/decode loop over method
//! bytecode, the dispatch engine with its per-call-site inline caches and
//! `doesNotUnderstand:` fallback, and the non-local-return unwinding
//! protocol.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod dispatch;
mod machine;
mod universe;

pub use machine::Interpreter;
pub use universe::{LoadError, Selectors, Universe};
