//! Bytecode definitions for the RSOM virtual machine.
//!
//! This crate defines the instruction set executed by the interpreter.
//! Compiled method bodies (instruction vectors plus literal tables) live
//! in the object model; this crate only knows about opcodes and their
//! operands so that both the compiler and the interpreter can share them
//! without depending on runtime value types.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod opcode;

pub use opcode::Opcode;
