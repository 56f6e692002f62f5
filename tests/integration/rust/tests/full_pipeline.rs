//! Full pipeline integration tests.
//!
//! Source -> compiler -> installed classes -> dispatch -> interpreter,
//! over the bootstrapped primitive library.

use integration_tests::{define, eval, new_runtime};
use num_check::assert_integer;
use object_model::Value;
use std::rc::Rc;

mod num_check {
    use object_model::Value;

    pub fn assert_integer(value: &Value, expected: i64) {
        match value {
            Value::Integer(n) => assert_eq!(*n, expected),
            other => panic!("expected {}, got {:?}", expected, other),
        }
    }
}

#[test]
fn test_integer_arithmetic() {
    let mut rt = new_runtime();
    assert_integer(&eval(&mut rt, "1 + 2"), 3);
    assert_integer(&eval(&mut rt, "10 - 3"), 7);
    assert_integer(&eval(&mut rt, "6 * 7"), 42);
    assert_integer(&eval(&mut rt, "100 / 5"), 20);
    assert_integer(&eval(&mut rt, "(10 + 20) * 2 - 18"), 42);
    assert_integer(&eval(&mut rt, "7 % 3"), 1);
    assert_integer(&eval(&mut rt, "0 - 7 % 3"), 2);
}

#[test]
fn test_comparison_and_booleans() {
    let mut rt = new_runtime();
    assert_eq!(eval(&mut rt, "1 < 2"), Value::Boolean(true));
    assert_eq!(eval(&mut rt, "2 <= 1"), Value::Boolean(false));
    assert_eq!(eval(&mut rt, "3 = 3"), Value::Boolean(true));
    assert_eq!(eval(&mut rt, "3 = 3.0"), Value::Boolean(true));
    assert_eq!(eval(&mut rt, "true not"), Value::Boolean(false));
    assert_integer(&eval(&mut rt, "1 < 2 ifTrue: [ 10 ] ifFalse: [ 20 ]"), 10);
    assert_integer(&eval(&mut rt, "false ifTrue: [ 10 ] ifFalse: [ 20 ]"), 20);
}

#[test]
fn test_double_arithmetic() {
    let mut rt = new_runtime();
    assert_eq!(eval(&mut rt, "1.5 + 2.25"), Value::Double(3.75));
    assert_eq!(eval(&mut rt, "1 + 0.5"), Value::Double(1.5));
    assert_eq!(eval(&mut rt, "9 sqrt"), Value::Double(3.0));
    assert_integer(&eval(&mut rt, "2.6 round"), 3);
    assert_integer(&eval(&mut rt, "2.6 asInteger"), 2);
}

#[test]
fn test_overflow_promotes_and_demotes() {
    let mut rt = new_runtime();
    // i64::MAX + 1 no longer fits a machine word.
    let promoted = eval(&mut rt, "9223372036854775807 + 1");
    assert!(matches!(promoted, Value::BigInteger(_)));
    // Subtracting brings it back into machine-word range.
    let demoted = eval(&mut rt, "(9223372036854775807 + 1) - 1");
    assert_eq!(demoted, Value::Integer(i64::MAX));
}

#[test]
fn test_counter_dispatch_end_to_end() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "Counter = ( | n |
            init = ( n := 0 )
            inc = ( n := n + 1. ^n )
            current = ( ^n ) )",
    );
    define(
        &mut rt,
        "CounterDriver = ( ----
            go = ( | c a |
                c := Counter new.
                c init.
                a := Array new: 3.
                a at: 1 put: c inc.
                a at: 2 put: c inc.
                a at: 3 put: c inc.
                ^a ) )",
    );
    let result = eval(&mut rt, "CounterDriver go");
    let Value::Array(arr) = result else {
        panic!("expected an array of results");
    };
    assert_eq!(arr.get_indexable(0), Some(Value::Integer(1)));
    assert_eq!(arr.get_indexable(1), Some(Value::Integer(2)));
    assert_eq!(arr.get_indexable(2), Some(Value::Integer(3)));
}

#[test]
fn test_counter_field_stays_integer_typed() {
    use object_model::FieldLocation;

    let mut rt = new_runtime();
    define(
        &mut rt,
        "Tally = ( | n |
            init = ( n := 0 )
            inc = ( n := n + 1. ^n ) )",
    );
    define(
        &mut rt,
        "TallyDriver = ( ----
            make = ( | t | t := Tally new. t init. t inc. t inc. t inc. ^t ) )",
    );
    let result = eval(&mut rt, "TallyDriver make");
    let Value::Instance(obj) = result else {
        panic!("expected the counter instance back");
    };
    // Monomorphic numeric use keeps the field in its integer slot.
    assert!(matches!(obj.location_of(0), FieldLocation::IntSlot(0)));
    assert_eq!(obj.read_field(0), Value::Integer(3));
}

#[test]
fn test_layout_shared_between_instances() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "Pair = ( | a b |
            fill: x with: y = ( a := x. b := y ) )",
    );
    define(
        &mut rt,
        "PairDriver = ( ----
            make: x with: y = ( | p | p := Pair new. p fill: x with: y. ^p ) )",
    );
    let first = eval(&mut rt, "PairDriver make: 1 with: 2.5");
    let second = eval(&mut rt, "PairDriver make: 9 with: 0.25");
    let (Value::Instance(a), Value::Instance(b)) = (first, second) else {
        panic!("expected two instances");
    };
    assert!(Rc::ptr_eq(&a.layout(), &b.layout()));

    // A diverging third instance gets its own layout.
    let third = eval(&mut rt, "PairDriver make: 'str' with: 2.5");
    let Value::Instance(c) = third else {
        panic!("expected an instance");
    };
    assert!(!Rc::ptr_eq(&a.layout(), &c.layout()));
}

#[test]
fn test_array_strategies_through_the_language() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "ArrDriver = ( ----
            mixed = ( | a |
                a := Array new: 3.
                a at: 1 put: 1.
                a at: 2 put: 2.5.
                ^a ) )",
    );
    let result = eval(&mut rt, "ArrDriver mixed");
    let Value::Array(arr) = result else {
        panic!("expected an array");
    };
    assert_eq!(arr.size(), 3);
    assert_eq!(arr.get_indexable(0), Some(Value::Integer(1)));
    assert_eq!(arr.get_indexable(1), Some(Value::Double(2.5)));
    assert_eq!(arr.get_indexable(2), Some(Value::Nil));
}

#[test]
fn test_array_out_of_bounds_answers_error_string() {
    let mut rt = new_runtime();
    let result = eval(&mut rt, "(Array new: 2) at: 5");
    assert_eq!(
        result,
        Value::Str(Rc::new("Error - index out of bounds".to_string()))
    );
    let result = eval(&mut rt, "(Array new: 2) at: 0 put: 9");
    assert_eq!(
        result,
        Value::Str(Rc::new("Error - index out of bounds".to_string()))
    );
}

#[test]
fn test_string_primitives() {
    let mut rt = new_runtime();
    assert_integer(&eval(&mut rt, "'hello' length"), 5);
    assert_eq!(
        eval(&mut rt, "'foo' concatenate: 'bar'"),
        Value::Str(Rc::new("foobar".to_string()))
    );
    assert_eq!(
        eval(&mut rt, "'hello' primSubstringFrom: 2 to: 4"),
        Value::Str(Rc::new("ell".to_string()))
    );
    assert_eq!(
        eval(&mut rt, "'hello' primSubstringFrom: 2 to: 99"),
        Value::Str(Rc::new("Error - index out of bounds".to_string()))
    );
    assert_eq!(eval(&mut rt, "'abc' = 'abc'"), Value::Boolean(true));
    assert_eq!(eval(&mut rt, "'abc' = 'abd'"), Value::Boolean(false));
    assert_eq!(
        eval(&mut rt, "'abc' asSymbol = #abc"),
        Value::Boolean(true)
    );
}

#[test]
fn test_loops() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "LoopDriver = ( ----
            countTo: limit = ( | i |
                i := 0.
                [ i < limit ] whileTrue: [ i := i + 1 ].
                ^i )
            sumTo: limit = ( | sum |
                sum := 0.
                1 to: limit do: [ :k | sum := sum + k ].
                ^sum ) )",
    );
    assert_integer(&eval(&mut rt, "LoopDriver countTo: 5"), 5);
    assert_integer(&eval(&mut rt, "LoopDriver sumTo: 4"), 10);
}

#[test]
fn test_super_send() {
    let mut rt = new_runtime();
    define(&mut rt, "Base = ( greet = ( ^1 ) )");
    define(
        &mut rt,
        "Derived = Base (
            greet = ( ^super greet + 10 )
            ----
            go = ( ^self new greet ) )",
    );
    assert_integer(&eval(&mut rt, "Derived go"), 11);
}

#[test]
fn test_class_side_fields() {
    let mut rt = new_runtime();
    define(
        &mut rt,
        "Registry = ( ----
            | count |
            bump = ( count := count isNil ifTrue: [ 1 ] ifFalse: [ count + 1 ]. ^count ) )",
    );
    assert_integer(&eval(&mut rt, "Registry bump"), 1);
    assert_integer(&eval(&mut rt, "Registry bump"), 2);
    assert_integer(&eval(&mut rt, "Registry bump"), 3);
}

#[test]
fn test_literal_arrays_and_symbols() {
    let mut rt = new_runtime();
    let result = eval(&mut rt, "#(1 2 3) length");
    assert_integer(&result, 3);
    assert_eq!(eval(&mut rt, "#(1 2 3) at: 2"), Value::Integer(2));
    assert_eq!(eval(&mut rt, "#foo = #foo"), Value::Boolean(true));
    assert_eq!(
        eval(&mut rt, "#at:put: asString"),
        Value::Str(Rc::new("at:put:".to_string()))
    );
}

#[test]
fn test_object_protocol() {
    let mut rt = new_runtime();
    assert_eq!(eval(&mut rt, "nil isNil"), Value::Boolean(true));
    assert_eq!(eval(&mut rt, "1 isNil"), Value::Boolean(false));
    assert_eq!(
        eval(&mut rt, "5 class name asString"),
        Value::Str(Rc::new("Integer".to_string()))
    );
    assert_eq!(
        eval(&mut rt, "3 perform: #+ withArguments: (#(4) copy)"),
        Value::Integer(7)
    );
    assert_eq!(
        eval(&mut rt, "Integer superclass name asString"),
        Value::Str(Rc::new("Object".to_string()))
    );
}

#[test]
fn test_inst_var_access_primitives() {
    let mut rt = new_runtime();
    define(&mut rt, "Box = ( | v | )");
    define(
        &mut rt,
        "BoxDriver = ( ----
            probe = ( | b | b := Box new. b instVarAt: 1 put: 42. ^b instVarAt: 1 ) )",
    );
    assert_integer(&eval(&mut rt, "BoxDriver probe"), 42);
}
