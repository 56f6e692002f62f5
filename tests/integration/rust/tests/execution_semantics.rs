//! Control-flow and dispatch semantics: non-local returns, escaped
//! blocks, doesNotUnderstand:, and call-site cache degradation.

use core_types::RuntimeErrorKind;
use integration_tests::{define, eval, eval_err, new_runtime};
use object_model::Value;
use som_cli::CliError;

#[test]
fn test_non_local_return_unwinds_to_home_method() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "M = (
            foo: aBlock = ( aBlock value. ^99 )
            bar = ( self foo: [ ^42 ]. ^0 )
            ----
            go = ( ^self new bar ) )",
    );
    // The block's `^42` returns from `bar`, not from `foo:`.
    assert_eq!(eval(&mut rt, "M go"), Value::Integer(42));
}

#[test]
fn test_non_local_return_skips_intermediate_frames() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "Deep = (
            run: aBlock = ( ^self step: aBlock )
            step: aBlock = ( aBlock value. ^1 )
            find = ( self run: [ ^7 ]. ^2 )
            ----
            go = ( ^self new find ) )",
    );
    assert_eq!(eval(&mut rt, "Deep go"), Value::Integer(7));
}

#[test]
fn test_escaped_block_default_raises() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "Escaper = ( | saved |
            stash = ( saved := [ ^42 ] )
            poke = ( ^saved value )
            ----
            go = ( | e | e := Escaper new. e stash. ^e poke ) )",
    );
    let err = eval_err(&mut rt, "Escaper go");
    let CliError::Runtime(err) = err else {
        panic!("expected a runtime error, got {}", err);
    };
    assert_eq!(err.kind, RuntimeErrorKind::EscapedBlock);
}

#[test]
fn test_escaped_block_is_recoverable() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "Recoverer = ( | saved |
            stash = ( saved := [ ^42 ] )
            poke = ( ^saved value )
            escapedBlock: b = ( ^777 )
            ----
            go = ( | e | e := Recoverer new. e stash. ^e poke ) )",
    );
    // The override's answer becomes the value of the `^` expression.
    assert_eq!(eval(&mut rt, "Recoverer go"), Value::Integer(777));
}

#[test]
fn test_dnu_receives_selector_and_argument_order() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "Catcher = (
            doesNotUnderstand: sel arguments: args = ( ^args copyWith: sel )
            ----
            go = ( ^self new bar: 10 baz: 20 ) )",
    );
    let result = eval(&mut rt, "Catcher go");
    let Value::Array(arr) = result else {
        panic!("expected the handler's array");
    };
    assert_eq!(arr.size(), 3);
    assert_eq!(arr.get_indexable(0), Some(Value::Integer(10)));
    assert_eq!(arr.get_indexable(1), Some(Value::Integer(20)));
    let mut rt2 = rt;
    let expected = rt2
        .interpreter_mut()
        .universe_mut()
        .intern("bar:baz:");
    assert_eq!(arr.get_indexable(2), Some(Value::Symbol(expected)));
}

#[test]
fn test_dnu_default_is_an_error() {
    let mut rt = new_runtime();
    let err = eval_err(&mut rt, "5 definitelyNotAMethod");
    let CliError::Runtime(err) = err else {
        panic!("expected a runtime error, got {}", err);
    };
    assert_eq!(err.kind, RuntimeErrorKind::DoesNotUnderstand);
}

#[test]
fn test_one_call_site_through_megamorphic_degradation() {
    let mut rt = new_runtime();
    // Eight classes answering distinct tags through one send site.
    for i in 1..=8 {
        define(&mut rt, &format!("Poly{i} = ( tag = ( ^{i} ) )"));
    }
    define(
        &mut rt,
        "Mega = ( ----
            probe: obj = ( ^obj tag )
            go = ( | sum |
                sum := 0.
                sum := sum + (self probe: Poly1 new).
                sum := sum + (self probe: Poly2 new).
                sum := sum + (self probe: Poly3 new).
                sum := sum + (self probe: Poly4 new).
                sum := sum + (self probe: Poly5 new).
                sum := sum + (self probe: Poly6 new).
                sum := sum + (self probe: Poly7 new).
                sum := sum + (self probe: Poly8 new).
                sum := sum + (self probe: Poly1 new).
                ^sum ) )",
    );
    // 1..8 sum to 36; the repeat of Poly1 after the site went
    // megamorphic still dispatches correctly.
    assert_eq!(eval(&mut rt, "Mega go"), Value::Integer(37));
}

#[test]
fn test_unknown_global_default_is_an_error() {
    let mut rt = new_runtime();
    let err = eval_err(&mut rt, "CompletelyUnknownThing");
    let CliError::Runtime(err) = err else {
        panic!("expected a runtime error, got {}", err);
    };
    assert_eq!(err.kind, RuntimeErrorKind::UnknownGlobal);
}

#[test]
fn test_unknown_global_is_interceptable() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "Resolver = (
            fetch = ( ^SomeMissingGlobal )
            unknownGlobal: name = ( ^123 )
            ----
            go = ( ^self new fetch ) )",
    );
    assert_eq!(eval(&mut rt, "Resolver go"), Value::Integer(123));
}

#[test]
fn test_runaway_recursion_is_caught() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "Loop = (
            spin = ( ^self spin )
            ----
            go = ( ^self new spin ) )",
    );
    let err = eval_err(&mut rt, "Loop go");
    let CliError::Runtime(err) = err else {
        panic!("expected a runtime error, got {}", err);
    };
    assert_eq!(err.kind, RuntimeErrorKind::StackExhausted);
}

#[test]
fn test_blocks_close_over_locals_read_write() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "Closure = ( ----
            go = ( | total |
                total := 0.
                #(1 2 3) length to: 4 do: [ :i | total := total + i ].
                ^total ) )",
    );
    // 3 to: 4 covers 3 and 4.
    assert_eq!(eval(&mut rt, "Closure go"), Value::Integer(7));
}

#[test]
fn test_nested_blocks_reach_outer_scopes() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "Nest = (
            run: a = ( ^[ [ a ] value ] value )
            ----
            go = ( ^self new run: 5 ) )",
    );
    assert_eq!(eval(&mut rt, "Nest go"), Value::Integer(5));
}
