//! Interactive shell.
//!
//! Each line is compiled as an expression and evaluated against a fresh
//! shell class; the previous line's result is available as `it`.

use crate::error::{CliError, CliResult};
use crate::runtime::Runtime;
use object_model::Value;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Run the interactive shell until end-of-input or an exit command.
pub fn run_repl(runtime: &mut Runtime) -> CliResult<()> {
    let mut editor = DefaultEditor::new()
        .map_err(|e| CliError::Repl(format!("failed to initialize line input: {}", e)))?;

    println!("RSOM shell");
    println!("Type an expression, or 'exit' to quit. The last result is 'it'.");
    println!();

    let mut it = Value::Nil;
    loop {
        match editor.readline("---> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "exit" || trimmed == "quit" {
                    break;
                }
                let _ = editor.add_history_entry(trimmed);
                match runtime.eval_line(trimmed, it.clone()) {
                    Ok(value) => {
                        println!("{}", runtime.describe(&value));
                        it = value;
                    }
                    Err(err) => eprintln!("{}", err),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(CliError::Repl(format!("line input failed: {}", e))),
        }
    }
    Ok(())
}
