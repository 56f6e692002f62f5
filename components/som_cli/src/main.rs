//! RSOM runtime CLI.
//!
//! Entry point for the runtime. Parses CLI arguments and delegates to
//! the Runtime for execution; without a target it starts the shell.

use clap::Parser;
use som_cli::{Cli, CliError, Runtime};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let classpath = cli.classpath_dirs();
    log::debug!("classpath: {:?}", classpath);
    let mut runtime = Runtime::new(classpath);

    let Some(target) = cli.target else {
        if let Err(e) = runtime.repl() {
            eprintln!("{}", e);
            std::process::exit(som_cli::runtime::ERROR_EXIT_CODE);
        }
        return;
    };

    let result = if target.ends_with(".som") {
        runtime.run_file(&target, cli.args)
    } else {
        runtime.run_class(&target, cli.args)
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(CliError::Parse(e)) => {
            eprintln!("Syntax error: {}", e);
            std::process::exit(som_cli::runtime::ERROR_EXIT_CODE);
        }
        Err(CliError::Io(e)) => {
            eprintln!("Error: could not read '{}': {}", target, e);
            std::process::exit(som_cli::runtime::ERROR_EXIT_CODE);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(som_cli::runtime::ERROR_EXIT_CODE);
        }
    }
}
