//! Primitives on Array.
//!
//! Indexing is 1-based at the language level and follows the same legacy
//! out-of-bounds policy as strings: a descriptive error string comes
//! back as a normal value.

use crate::invalid;
use core_types::Interner;
use object_model::{ArrayObj, CoreClasses, Interrupt, Primitive, Value, VmContext};
use std::rc::Rc;

pub(crate) fn install(core: &CoreClasses, interner: &mut Interner) {
    let array = &core.array_class;
    crate::install(array, interner, "at:", array_at);
    crate::install(array, interner, "at:put:", array_at_put);
    crate::install(array, interner, "length", array_length);
    crate::install(array, interner, "copy", array_copy);
    crate::install(array, interner, "copyWith:", array_copy_with);

    let array_meta = core
        .array_class
        .borrow()
        .metaclass()
        .expect("Array has a metaclass");
    crate::install(&array_meta, interner, "new:", array_new);
}

fn out_of_bounds() -> Value {
    Value::Str(Rc::new("Error - index out of bounds".to_string()))
}

fn receiver_array(receiver: &Value, selector: &str) -> Result<Rc<ArrayObj>, Interrupt> {
    match receiver {
        Value::Array(arr) => Ok(arr.clone()),
        _ => Err(invalid(format!("'{}' expects an array receiver", selector))),
    }
}

fn array_at(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let arr = receiver_array(&receiver, "at:")?;
    let Value::Integer(index) = args[0] else {
        return Err(invalid("'at:' expects an integer index"));
    };
    if index < 1 {
        return Ok(out_of_bounds());
    }
    Ok(arr
        .get_indexable(index as usize - 1)
        .unwrap_or_else(out_of_bounds))
}

fn array_at_put(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    mut args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let arr = receiver_array(&receiver, "at:put:")?;
    let value = args.pop().expect("arity checked by dispatch");
    let Value::Integer(index) = args[0] else {
        return Err(invalid("'at:put:' expects an integer index"));
    };
    if index < 1 || !arr.set_indexable(index as usize - 1, value.clone()) {
        return Ok(out_of_bounds());
    }
    Ok(value)
}

fn array_length(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let arr = receiver_array(&receiver, "length")?;
    Ok(Value::Integer(arr.size() as i64))
}

fn array_copy(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let arr = receiver_array(&receiver, "copy")?;
    Ok(Value::Array(Rc::new(arr.copy())))
}

fn array_copy_with(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    mut args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let arr = receiver_array(&receiver, "copyWith:")?;
    let value = args.pop().expect("arity checked by dispatch");
    Ok(Value::Array(Rc::new(arr.copy_extended_with(value))))
}

fn array_new(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Integer(length) = args[0] else {
        return Err(invalid("'new:' expects an integer length"));
    };
    if length < 0 {
        return Err(invalid("'new:' expects a non-negative length"));
    }
    Ok(Value::Array(Rc::new(ArrayObj::with_length(length as usize))))
}
