//! End-to-end CLI driver tests: classpath loading, file execution, exit
//! codes.

use som_cli::{CliError, Runtime};
use std::fs;

fn write_class(dir: &std::path::Path, name: &str, source: &str) {
    fs::write(dir.join(format!("{}.som", name)), source).expect("writes class file");
}

#[test]
fn test_run_class_from_classpath() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_class(
        dir.path(),
        "Quiet",
        "Quiet = ( ---- run = ( ^0 ) )",
    );
    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()]);
    let code = runtime.run_class("Quiet", vec![]).expect("runs");
    assert_eq!(code, 0);
}

#[test]
fn test_exit_code_propagates() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_class(
        dir.path(),
        "Exiter",
        "Exiter = ( ---- run = ( system exit: 3 ) )",
    );
    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()]);
    let code = runtime.run_class("Exiter", vec![]).expect("runs");
    assert_eq!(code, 3);
}

#[test]
fn test_run_with_arguments() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_class(
        dir.path(),
        "Echo",
        "Echo = ( ---- run: args = ( system exit: args length ) )",
    );
    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()]);
    let code = runtime
        .run_class("Echo", vec!["a".to_string(), "b".to_string()])
        .expect("runs");
    assert_eq!(code, 2);
}

#[test]
fn test_run_file_directly() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("Direct.som");
    fs::write(&path, "Direct = ( ---- run = ( system exit: 5 ) )").expect("writes");
    let mut runtime = Runtime::new(vec![]);
    let code = runtime
        .run_file(path.to_str().expect("utf-8 path"), vec![])
        .expect("runs");
    assert_eq!(code, 5);
}

#[test]
fn test_superclass_loaded_from_classpath() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_class(dir.path(), "Animal", "Animal = ( noise = ( ^1 ) )");
    write_class(
        dir.path(),
        "Dog",
        "Dog = Animal ( noise = ( ^super noise + 1 ) ---- run = ( system exit: self new noise ) )",
    );
    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()]);
    let code = runtime.run_class("Dog", vec![]).expect("runs");
    assert_eq!(code, 2);
}

#[test]
fn test_missing_class_errors() {
    let mut runtime = Runtime::new(vec![]);
    let err = runtime.run_class("Nowhere", vec![]).unwrap_err();
    assert!(matches!(err, CliError::Runtime(_)));
}

#[test]
fn test_parse_error_is_typed() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("Broken.som");
    fs::write(&path, "Broken = ( m = ( ^ ) )").expect("writes");
    let mut runtime = Runtime::new(vec![]);
    let err = runtime
        .run_file(path.to_str().expect("utf-8 path"), vec![])
        .unwrap_err();
    match err {
        CliError::Parse(parse) => {
            assert!(!parse.expected.is_empty());
            assert!(!parse.found.is_empty());
        }
        other => panic!("expected a parse error, got {}", other),
    }
}

#[test]
fn test_uncaught_program_error_reports() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_class(
        dir.path(),
        "Crash",
        "Crash = ( ---- run = ( ^3 thisDoesNotExist ) )",
    );
    let mut runtime = Runtime::new(vec![dir.path().to_path_buf()]);
    let err = runtime.run_class("Crash", vec![]).unwrap_err();
    assert!(matches!(err, CliError::Runtime(_)));
}
