//! Shared helpers for the end-to-end test suites.
//!
//! Tests drive the whole pipeline: source text through the compiler into
//! installed classes, executed by the interpreter over the bootstrapped
//! primitive library.

use object_model::Value;
use som_cli::Runtime;

/// A fresh runtime with an empty classpath.
pub fn new_runtime() -> Runtime {
    Runtime::new(vec![])
}

/// Compile and register a class definition.
pub fn define(runtime: &mut Runtime, source: &str) {
    runtime
        .interpreter_mut()
        .universe_mut()
        .load_class_from_source(source)
        .unwrap_or_else(|e| panic!("class failed to compile: {}\n{}", e, source));
}

/// Evaluate a single expression and return its value.
pub fn eval(runtime: &mut Runtime, expression: &str) -> Value {
    runtime
        .eval_line(expression, Value::Nil)
        .unwrap_or_else(|e| panic!("expression failed: {}\n{}", e, expression))
}

/// Evaluate an expression that is expected to fail, returning the error.
pub fn eval_err(runtime: &mut Runtime, expression: &str) -> som_cli::CliError {
    match runtime.eval_line(expression, Value::Nil) {
        Ok(value) => panic!("expected an error, got {:?}", value),
        Err(err) => err,
    }
}
