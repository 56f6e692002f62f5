//! Core types shared by every RSOM component.
//!
//! This crate provides the foundational types for the runtime: the symbol
//! interner, source location tracking, and the typed error values that
//! parsing and execution produce.
//!
//! # Overview
//!
//! - [`Interner`] / [`SymbolId`] - process-lifetime symbol table
//! - [`ParseError`] - typed compiler diagnostics with positions
//! - [`RuntimeError`] / [`RuntimeErrorKind`] - execution failures
//! - [`SourcePosition`] - source code location

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod interner;
mod source;

pub use error::{ParseError, RuntimeError, RuntimeErrorKind};
pub use interner::{selector_arity, Interner, SymbolId};
pub use source::SourcePosition;
