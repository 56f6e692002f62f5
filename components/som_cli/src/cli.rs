//! Command-line argument definitions.

use clap::Parser;
use std::path::PathBuf;

/// The RSOM runtime: run a class from the classpath, run a source file,
/// or start the interactive shell.
#[derive(Parser, Debug)]
#[command(name = "rsom", version, about = "A runtime for the SOM object language")]
pub struct Cli {
    /// Classpath: colon-separated directories searched for .som files
    #[arg(short = 'c', long = "classpath", alias = "cp", value_name = "PATH[:PATH...]")]
    pub classpath: Option<String>,

    /// Entry point: a class name resolved on the classpath, or a .som
    /// file to load and run
    pub target: Option<String>,

    /// Arguments handed to the program's `run:` method
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// The classpath split into directories, current directory when
    /// nothing was given.
    pub fn classpath_dirs(&self) -> Vec<PathBuf> {
        match &self.classpath {
            Some(joined) => joined
                .split(':')
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect(),
            None => vec![PathBuf::from(".")],
        }
    }
}
