//! Primitives on the `system` object.

use crate::{invalid, text_of};
use core_types::{Interner, RuntimeErrorKind};
use object_model::{CoreClasses, Interrupt, Primitive, Value, VmContext};

pub(crate) fn install(core: &CoreClasses, interner: &mut Interner) {
    let system = &core.system_class;
    crate::install(system, interner, "printString:", system_print_string);
    crate::install(system, interner, "printNewline", system_print_newline);
    crate::install(system, interner, "println:", system_println);
    crate::install(system, interner, "errorPrintln:", system_error_println);
    crate::install(system, interner, "global:", system_global);
    crate::install(system, interner, "global:put:", system_global_put);
    crate::install(system, interner, "hasGlobal:", system_has_global);
    crate::install(system, interner, "load:", system_load);
    crate::install(system, interner, "exit:", system_exit);
    crate::install(system, interner, "time", system_time);
    crate::install(system, interner, "ticks", system_ticks);
    crate::install(system, interner, "fullGC", system_full_gc);
}

fn printable(ctx: &mut dyn VmContext, value: &Value) -> Result<String, Interrupt> {
    match text_of(ctx, value) {
        Some(text) => Ok(text),
        None => Err(invalid("printing expects a string or symbol")),
    }
}

fn system_print_string(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    print!("{}", printable(ctx, &args[0])?);
    Ok(receiver)
}

fn system_print_newline(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    println!();
    Ok(receiver)
}

fn system_println(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    println!("{}", printable(ctx, &args[0])?);
    Ok(receiver)
}

fn system_error_println(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    eprintln!("{}", printable(ctx, &args[0])?);
    Ok(receiver)
}

fn system_global(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Symbol(name) = args[0] else {
        return Err(invalid("'global:' expects a symbol"));
    };
    Ok(ctx.global(name).unwrap_or(Value::Nil))
}

fn system_global_put(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    mut args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let value = args.pop().expect("arity checked by dispatch");
    let Value::Symbol(name) = args[0] else {
        return Err(invalid("'global:put:' expects a symbol"));
    };
    ctx.set_global(name, value.clone());
    Ok(value)
}

fn system_has_global(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Symbol(name) = args[0] else {
        return Err(invalid("'hasGlobal:' expects a symbol"));
    };
    Ok(Value::Boolean(ctx.has_global(name)))
}

fn system_load(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Symbol(name) = args[0] else {
        return Err(invalid("'load:' expects a symbol"));
    };
    match ctx.load_class(name) {
        Ok(class) => Ok(Value::Class(class)),
        // Not found answers nil; broken files still raise.
        Err(err) if err.kind == RuntimeErrorKind::UnknownGlobal => Ok(Value::Nil),
        Err(err) => Err(err.into()),
    }
}

fn system_exit(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Integer(code) = args[0] else {
        return Err(invalid("'exit:' expects an integer code"));
    };
    Err(Interrupt::Exit(code as i32))
}

fn system_time(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Integer((ctx.ticks() / 1000) as i64))
}

fn system_ticks(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Integer(ctx.ticks() as i64))
}

fn system_full_gc(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    // Memory is reference-counted; there is no collector to trigger.
    Ok(Value::Boolean(false))
}
