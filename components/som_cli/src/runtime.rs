//! Runtime orchestration.
//!
//! The Runtime wires the components together: it bootstraps a Universe,
//! installs the primitive library, and drives program execution for the
//! CLI and the shell. Program exit codes come from `System exit:`;
//! normal completion is 0, uncaught errors are 1.

use crate::error::{CliError, CliResult};
use interpreter::{Interpreter, Universe};
use object_model::{Interrupt, SomRef, Value, VmContext};
use std::path::PathBuf;

/// Exit code for uncaught runtime and parse errors.
pub const ERROR_EXIT_CODE: i32 = 1;

/// Main driver coordinating universe, primitives, and interpreter.
pub struct Runtime {
    interp: Interpreter,
    shell_serial: usize,
}

impl Runtime {
    /// Bootstrap a runtime over the given classpath.
    pub fn new(classpath: Vec<PathBuf>) -> Self {
        let mut universe = Universe::new(classpath);
        let core = universe.core().clone();
        primitives::install_core(&core, universe.interner_mut());
        Self {
            interp: Interpreter::new(universe),
            shell_serial: 0,
        }
    }

    /// Direct access to the interpreter, mainly for tests.
    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interp
    }

    /// Load a class by name from the classpath and run it.
    ///
    /// Returns the program's exit code.
    pub fn run_class(&mut self, name: &str, args: Vec<String>) -> CliResult<i32> {
        let sym = self.interp.universe_mut().intern(name);
        let class = self.interp.universe_mut().load_class(sym)?;
        self.run(class, args)
    }

    /// Load a class from a source file and run it.
    pub fn run_file(&mut self, path: &str, args: Vec<String>) -> CliResult<i32> {
        let source = std::fs::read_to_string(path)?;
        let class = self.interp.universe_mut().load_class_from_source(&source)?;
        self.run(class, args)
    }

    fn run(&mut self, class: SomRef<object_model::Class>, args: Vec<String>) -> CliResult<i32> {
        match self.interp.run_program(class, args) {
            Ok(_) => Ok(0),
            Err(Interrupt::Exit(code)) => Ok(code),
            Err(Interrupt::Error(err)) => Err(err.into()),
            Err(Interrupt::NonLocalReturn { .. }) => Err(CliError::Repl(
                "a non-local return escaped the program".to_string(),
            )),
        }
    }

    /// Evaluate one shell line and return its printable result.
    ///
    /// The line is compiled as the body of a fresh class's `run:` method;
    /// the previous result is available as `it`.
    pub fn eval_line(&mut self, line: &str, previous: Value) -> CliResult<Value> {
        self.shell_serial += 1;
        // The wrapper method lives on the class side, where the driver
        // protocol looks for it.
        let source = format!(
            "Shell{} = ( ---- run: it = ( ^( {} ) ) )",
            self.shell_serial, line
        );
        let class = self.interp.universe_mut().load_class_from_source(&source)?;
        let receiver = Value::Class(class);
        let run_with = self.interp.universe().selectors().run_with;
        match self
            .interp
            .dispatch(run_with, receiver, vec![previous])
        {
            Ok(value) => Ok(value),
            Err(Interrupt::Exit(code)) => std::process::exit(code),
            Err(Interrupt::Error(err)) => Err(err.into()),
            Err(Interrupt::NonLocalReturn { .. }) => Err(CliError::Repl(
                "a non-local return escaped the shell line".to_string(),
            )),
        }
    }

    /// Start the interactive shell.
    pub fn repl(&mut self) -> CliResult<()> {
        crate::repl::run_repl(self)
    }

    /// Human-readable rendering of a value, via its `asString` method.
    pub fn describe(&mut self, value: &Value) -> String {
        let as_string = self.interp.universe_mut().intern("asString");
        match self
            .interp
            .dispatch(as_string, value.clone(), vec![])
        {
            Ok(Value::Str(text)) => (*text).clone(),
            Ok(Value::Symbol(sym)) => self.interp.universe().symbol_text(sym).to_string(),
            _ => "<unprintable value>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_bootstrap_installs_primitives() {
        let mut runtime = Runtime::new(vec![]);
        let result = runtime
            .eval_line("3 + 4", Value::Nil)
            .expect("evaluates");
        assert_eq!(result, Value::Integer(7));
    }

    #[test]
    fn test_describe_integer() {
        let mut runtime = Runtime::new(vec![]);
        assert_eq!(runtime.describe(&Value::Integer(42)), "42");
    }

    #[test]
    fn test_shell_it_binding() {
        let mut runtime = Runtime::new(vec![]);
        let first = runtime.eval_line("6 * 7", Value::Nil).expect("evaluates");
        let second = runtime.eval_line("it - 2", first).expect("evaluates");
        assert_eq!(second, Value::Integer(40));
    }

    #[test]
    fn test_missing_class_is_an_error() {
        let mut runtime = Runtime::new(vec![]);
        let err = runtime.run_class("Absent", vec![]).unwrap_err();
        assert!(matches!(err, CliError::Runtime(_)));
    }
}
