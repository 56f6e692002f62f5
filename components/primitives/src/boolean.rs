//! Primitives on True and False.
//!
//! Conditionals are methods here, not syntax: the receiver's class picks
//! the branch, and branch arguments that are blocks get evaluated while
//! plain values pass through unchanged.

use crate::eval_arg;
use core_types::Interner;
use object_model::{CoreClasses, Interrupt, Primitive, Value, VmContext};
use std::rc::Rc;

pub(crate) fn install(core: &CoreClasses, interner: &mut Interner) {
    let t = &core.true_class;
    crate::install(t, interner, "ifTrue:", true_if_true);
    crate::install(t, interner, "ifFalse:", true_if_false);
    crate::install(t, interner, "ifTrue:ifFalse:", true_if_true_if_false);
    crate::install(t, interner, "not", true_not);
    crate::install(t, interner, "and:", true_and);
    crate::install(t, interner, "&&", true_and);
    crate::install(t, interner, "or:", true_or);
    crate::install(t, interner, "||", true_or);
    crate::install(t, interner, "asString", true_as_string);

    let f = &core.false_class;
    crate::install(f, interner, "ifTrue:", false_if_true);
    crate::install(f, interner, "ifFalse:", false_if_false);
    crate::install(f, interner, "ifTrue:ifFalse:", false_if_true_if_false);
    crate::install(f, interner, "not", false_not);
    crate::install(f, interner, "and:", false_and);
    crate::install(f, interner, "&&", false_and);
    crate::install(f, interner, "or:", false_or);
    crate::install(f, interner, "||", false_or);
    crate::install(f, interner, "asString", false_as_string);
}

fn true_if_true(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    mut args: Vec<Value>,
) -> Result<Value, Interrupt> {
    eval_arg(ctx, args.remove(0))
}

fn true_if_false(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Nil)
}

fn true_if_true_if_false(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    mut args: Vec<Value>,
) -> Result<Value, Interrupt> {
    eval_arg(ctx, args.remove(0))
}

fn true_not(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Boolean(false))
}

fn true_and(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    mut args: Vec<Value>,
) -> Result<Value, Interrupt> {
    eval_arg(ctx, args.remove(0))
}

fn true_or(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Boolean(true))
}

fn true_as_string(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Str(Rc::new("true".to_string())))
}

fn false_if_true(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Nil)
}

fn false_if_false(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    mut args: Vec<Value>,
) -> Result<Value, Interrupt> {
    eval_arg(ctx, args.remove(0))
}

fn false_if_true_if_false(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    mut args: Vec<Value>,
) -> Result<Value, Interrupt> {
    eval_arg(ctx, args.remove(1))
}

fn false_not(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Boolean(true))
}

fn false_and(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Boolean(false))
}

fn false_or(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    mut args: Vec<Value>,
) -> Result<Value, Interrupt> {
    eval_arg(ctx, args.remove(0))
}

fn false_as_string(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Str(Rc::new("false".to_string())))
}
