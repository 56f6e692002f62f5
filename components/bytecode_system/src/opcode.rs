//! Bytecode opcodes for the stack-based VM.
//!
//! Operands are resolved at compile time into flat slot numbers plus a
//! context level (lexical nesting depth), so the interpreter only ever
//! indexes arrays at run time. Send instructions additionally carry the
//! index of their inline-cache slot in the enclosing method.

/// Bytecode instructions.
///
/// `index`/`context` pairs address argument and local slots; a context
/// level of zero targets the current frame, higher levels walk the chain
/// of enclosing block activations. `literal` indexes the method's literal
/// table; `cache` indexes its inline-cache table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    /// Stop the interpreter loop for this frame
    Halt,
    /// Duplicate the top of the operand stack
    Dup,
    /// Push a local variable slot
    PushLocal {
        /// Flat slot number
        index: u8,
        /// Lexical nesting depth of the owning frame
        context: u8,
    },
    /// Push an argument slot (slot 0 is the receiver)
    PushArgument {
        /// Flat slot number
        index: u8,
        /// Lexical nesting depth of the owning frame
        context: u8,
    },
    /// Push an instance field of the home receiver
    PushField {
        /// Declared field index
        index: u8,
        /// Lexical nesting depth of the owning frame
        context: u8,
    },
    /// Instantiate a block closure from a literal method, capturing the
    /// current frame
    PushBlock {
        /// Literal-table index of the block's compiled body
        literal: u8,
    },
    /// Push a literal constant
    PushConstant {
        /// Literal-table index
        literal: u8,
    },
    /// Push the value of a global, loading a class file if necessary
    PushGlobal {
        /// Literal-table index of the global's symbol
        literal: u8,
    },
    /// Discard the top of the operand stack
    Pop,
    /// Store the top of stack into a local slot, popping it
    PopLocal {
        /// Flat slot number
        index: u8,
        /// Lexical nesting depth of the owning frame
        context: u8,
    },
    /// Store the top of stack into an argument slot, popping it
    PopArgument {
        /// Flat slot number
        index: u8,
        /// Lexical nesting depth of the owning frame
        context: u8,
    },
    /// Store the top of stack into an instance field, popping it
    PopField {
        /// Declared field index
        index: u8,
        /// Lexical nesting depth of the owning frame
        context: u8,
    },
    /// Send a message; receiver and arguments are on the stack
    Send {
        /// Literal-table index of the selector symbol
        literal: u8,
        /// Inline-cache slot for this call site
        cache: u16,
    },
    /// Send to the holder's superclass; statically bound
    SuperSend {
        /// Literal-table index of the selector symbol
        literal: u8,
        /// Cache slot pinning the resolved target
        cache: u16,
    },
    /// Return the top of stack from the current activation
    ReturnLocal,
    /// Return the top of stack from the home method activation
    ReturnNonLocal,
    /// Quickened integer `+`; falls back to a `+` send on other kinds
    Add,
    /// Quickened integer `*`; falls back to a `*` send on other kinds
    Multiply,
    /// Quickened integer `-`; falls back to a `-` send on other kinds
    Subtract,
}

impl Opcode {
    /// Check if this opcode ends the activation it executes in.
    pub fn is_return(&self) -> bool {
        matches!(self, Opcode::ReturnLocal | Opcode::ReturnNonLocal | Opcode::Halt)
    }

    /// Check if this opcode is a message send.
    pub fn is_send(&self) -> bool {
        matches!(self, Opcode::Send { .. } | Opcode::SuperSend { .. })
    }

    /// Short mnemonic for diagnostics.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Halt => "halt",
            Opcode::Dup => "dup",
            Opcode::PushLocal { .. } => "push_local",
            Opcode::PushArgument { .. } => "push_argument",
            Opcode::PushField { .. } => "push_field",
            Opcode::PushBlock { .. } => "push_block",
            Opcode::PushConstant { .. } => "push_constant",
            Opcode::PushGlobal { .. } => "push_global",
            Opcode::Pop => "pop",
            Opcode::PopLocal { .. } => "pop_local",
            Opcode::PopArgument { .. } => "pop_argument",
            Opcode::PopField { .. } => "pop_field",
            Opcode::Send { .. } => "send",
            Opcode::SuperSend { .. } => "super_send",
            Opcode::ReturnLocal => "return_local",
            Opcode::ReturnNonLocal => "return_non_local",
            Opcode::Add => "add",
            Opcode::Multiply => "multiply",
            Opcode::Subtract => "subtract",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_is_return() {
        assert!(Opcode::ReturnLocal.is_return());
        assert!(Opcode::ReturnNonLocal.is_return());
        assert!(Opcode::Halt.is_return());
        assert!(!Opcode::Pop.is_return());
    }

    #[test]
    fn test_opcode_is_send() {
        assert!(Opcode::Send { literal: 0, cache: 0 }.is_send());
        assert!(Opcode::SuperSend { literal: 0, cache: 0 }.is_send());
        assert!(!Opcode::Dup.is_send());
    }

    #[test]
    fn test_opcode_mnemonics() {
        assert_eq!(Opcode::Halt.mnemonic(), "halt");
        assert_eq!(
            Opcode::Send { literal: 1, cache: 0 }.mnemonic(),
            "send"
        );
        assert_eq!(
            Opcode::PushLocal { index: 0, context: 1 }.mnemonic(),
            "push_local"
        );
    }
}
