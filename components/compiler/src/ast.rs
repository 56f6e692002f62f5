//! Abstract syntax for class definitions.

use core_types::SourcePosition;
use num_bigint::BigInt;

/// A parsed class definition: instance side and class side.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    /// Class name
    pub name: String,
    /// Superclass name; `None` defaults to `Object`
    pub superclass: Option<String>,
    /// Instance-field names declared by this class
    pub instance_fields: Vec<String>,
    /// Instance-side methods
    pub instance_methods: Vec<MethodDef>,
    /// Class-side field names
    pub class_fields: Vec<String>,
    /// Class-side methods
    pub class_methods: Vec<MethodDef>,
    /// Position of the class name
    pub position: SourcePosition,
}

/// One method definition.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// Full selector, e.g. `at:put:` or `+`
    pub selector: String,
    /// Parameter names, one per keyword part or binary operand
    pub parameters: Vec<String>,
    /// The body, or a primitive marker
    pub body: MethodBodyDef,
    /// Position of the selector
    pub position: SourcePosition,
}

/// Body of a method definition.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodBodyDef {
    /// Declared `primitive`; linked to a native implementation at
    /// bootstrap or left as a trap
    Primitive,
    /// Ordinary compiled body
    Body(Body),
}

/// A method or block body: local declarations plus statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    /// Declared local variables
    pub locals: Vec<String>,
    /// Statements in order
    pub statements: Vec<Statement>,
}

/// One statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// An expression evaluated for effect
    Expression(Expression),
    /// `^expr`: return from the method (non-local when inside a block)
    Return(Expression),
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Identifier reference; resolution happens at compile time
    Variable(String),
    /// Machine-word integer literal
    Integer(i64),
    /// Arbitrary-precision integer literal
    BigInteger(BigInt),
    /// Double literal
    Double(f64),
    /// String literal
    Str(String),
    /// Symbol literal
    Symbol(String),
    /// Literal array; elements are themselves literals
    Array(Vec<Expression>),
    /// Block with parameters and body
    Block {
        /// Parameter names
        parameters: Vec<String>,
        /// Block body
        body: Body,
    },
    /// Message send
    Message {
        /// Receiver expression; `Variable("super")` marks a super send
        receiver: Box<Expression>,
        /// Full selector
        selector: String,
        /// Arguments in send order
        arguments: Vec<Expression>,
    },
    /// `variable := value`
    Assignment {
        /// Target name; resolved like any identifier
        variable: String,
        /// Assigned expression
        value: Box<Expression>,
    },
}

impl Expression {
    /// Whether this is the `super` pseudo-variable.
    pub fn is_super(&self) -> bool {
        matches!(self, Expression::Variable(name) if name == "super")
    }
}
