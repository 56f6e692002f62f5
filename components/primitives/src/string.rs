//! Primitives on String and Symbol.
//!
//! Index-taking primitives follow the legacy policy: an out-of-range
//! index answers a descriptive error string as a normal value rather
//! than raising, so sloppy indexing never kills the program.

use crate::{invalid, text_of};
use core_types::Interner;
use object_model::{CoreClasses, Interrupt, Primitive, Value, VmContext};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

pub(crate) fn install(core: &CoreClasses, interner: &mut Interner) {
    let string = &core.string_class;
    crate::install(string, interner, "length", string_length);
    crate::install(string, interner, "concatenate:", string_concatenate);
    crate::install(string, interner, "at:", string_at);
    crate::install(string, interner, "primSubstringFrom:to:", string_substring);
    crate::install(string, interner, "asString", string_as_string);
    crate::install(string, interner, "asSymbol", string_as_symbol);
    crate::install(string, interner, "=", string_equal);
    crate::install(string, interner, "hashcode", string_hashcode);
    crate::install(string, interner, "isWhiteSpace", string_is_whitespace);

    let symbol = &core.symbol_class;
    crate::install(symbol, interner, "asString", symbol_as_string);
}

fn receiver_text(ctx: &dyn VmContext, receiver: &Value, selector: &str) -> Result<String, Interrupt> {
    text_of(ctx, receiver).ok_or_else(|| invalid(format!("'{}' expects a string receiver", selector)))
}

fn out_of_bounds() -> Value {
    Value::Str(Rc::new("Error - index out of bounds".to_string()))
}

fn string_length(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let text = receiver_text(ctx, &receiver, "length")?;
    Ok(Value::Integer(text.chars().count() as i64))
}

fn string_concatenate(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let mut text = receiver_text(ctx, &receiver, "concatenate:")?;
    let Some(other) = text_of(ctx, &args[0]) else {
        return Err(invalid("'concatenate:' expects a string argument"));
    };
    text.push_str(&other);
    Ok(Value::Str(Rc::new(text)))
}

fn string_at(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let text = receiver_text(ctx, &receiver, "at:")?;
    let Value::Integer(index) = args[0] else {
        return Err(invalid("'at:' expects an integer index"));
    };
    if index < 1 {
        return Ok(out_of_bounds());
    }
    match text.chars().nth(index as usize - 1) {
        Some(c) => Ok(Value::Str(Rc::new(c.to_string()))),
        None => Ok(out_of_bounds()),
    }
}

fn string_substring(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let text = receiver_text(ctx, &receiver, "primSubstringFrom:to:")?;
    let (Value::Integer(from), Value::Integer(to)) = (&args[0], &args[1]) else {
        return Err(invalid("'primSubstringFrom:to:' expects integer indices"));
    };
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len() as i64;
    if *from < 1 || *to > len || from > to {
        return Ok(out_of_bounds());
    }
    let slice: String = chars[(*from - 1) as usize..*to as usize].iter().collect();
    Ok(Value::Str(Rc::new(slice)))
}

fn string_as_string(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    match receiver {
        Value::Str(_) => Ok(receiver),
        _ => Err(invalid("'asString' expects a string receiver")),
    }
}

fn string_as_symbol(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let text = receiver_text(ctx, &receiver, "asSymbol")?;
    let sym = ctx.intern(&text);
    Ok(Value::Symbol(sym))
}

fn string_equal(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let text = receiver_text(ctx, &receiver, "=")?;
    Ok(match text_of(ctx, &args[0]) {
        Some(other) => Value::Boolean(text == other),
        None => Value::Boolean(false),
    })
}

fn string_hashcode(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let text = receiver_text(ctx, &receiver, "hashcode")?;
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    Ok(Value::Integer((hasher.finish() as i64).abs()))
}

fn string_is_whitespace(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let text = receiver_text(ctx, &receiver, "isWhiteSpace")?;
    Ok(Value::Boolean(
        !text.is_empty() && text.chars().all(char::is_whitespace),
    ))
}

fn symbol_as_string(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Symbol(sym) = receiver else {
        return Err(invalid("'asString' expects a symbol receiver"));
    };
    Ok(Value::Str(Rc::new(ctx.symbol_text(sym).to_string())))
}
