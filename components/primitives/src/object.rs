//! Primitives on Object, Class, and Nil.
//!
//! Object also carries the protocol fallbacks the engine relies on:
//! `doesNotUnderstand:arguments:`, `escapedBlock:` and `unknownGlobal:`.
//! Their defaults raise ordinary user-level runtime errors; programs
//! override them to recover.

use crate::invalid;
use core_types::{Interner, RuntimeErrorKind};
use object_model::{CoreClasses, Instance, Interrupt, Primitive, Value, VmContext};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

pub(crate) fn install(core: &CoreClasses, interner: &mut Interner) {
    let object = &core.object_class;
    crate::install(object, interner, "class", object_class);
    crate::install(object, interner, "==", object_identical);
    crate::install(object, interner, "=", object_identical);
    crate::install(object, interner, "~=", object_not_equal);
    crate::install(object, interner, "<>", object_not_equal);
    crate::install(object, interner, "hashcode", object_hashcode);
    crate::install(object, interner, "asString", object_as_string);
    crate::install(object, interner, "isNil", object_is_nil);
    crate::install(object, interner, "notNil", object_not_nil);
    crate::install(object, interner, "perform:", object_perform);
    crate::install(object, interner, "perform:withArguments:", object_perform_with);
    crate::install(object, interner, "instVarAt:", object_inst_var_at);
    crate::install(object, interner, "instVarAt:put:", object_inst_var_at_put);
    crate::install(
        object,
        interner,
        "doesNotUnderstand:arguments:",
        object_does_not_understand,
    );
    crate::install(object, interner, "escapedBlock:", object_escaped_block);
    crate::install(object, interner, "unknownGlobal:", object_unknown_global);

    let class = &core.class_class;
    crate::install(class, interner, "new", class_new);
    crate::install(class, interner, "name", class_name);
    crate::install(class, interner, "superclass", class_superclass);

    let nil = &core.nil_class;
    crate::install(nil, interner, "isNil", nil_is_nil);
    crate::install(nil, interner, "notNil", nil_not_nil);
    crate::install(nil, interner, "asString", nil_as_string);
}

fn object_class(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Class(ctx.class_of(&receiver)))
}

fn object_identical(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Boolean(receiver.is_identical(&args[0])))
}

fn object_not_equal(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let eq = ctx.intern("=");
    let result = ctx.dispatch(eq, receiver, args)?;
    match result {
        Value::Boolean(b) => Ok(Value::Boolean(!b)),
        _ => Err(invalid("'=' must answer a boolean")),
    }
}

fn object_hashcode(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let mut hasher = DefaultHasher::new();
    match &receiver {
        Value::Nil => 0u8.hash(&mut hasher),
        Value::Boolean(b) => b.hash(&mut hasher),
        Value::Integer(n) => n.hash(&mut hasher),
        Value::BigInteger(n) => n.hash(&mut hasher),
        Value::Double(d) => d.to_bits().hash(&mut hasher),
        Value::Str(s) => s.hash(&mut hasher),
        Value::Symbol(sym) => ctx.symbol_text(*sym).hash(&mut hasher),
        // Reference kinds hash by identity.
        Value::Array(a) => (Rc::as_ptr(a) as usize).hash(&mut hasher),
        Value::Block(b) => (Rc::as_ptr(b) as usize).hash(&mut hasher),
        Value::Class(c) => (Rc::as_ptr(c) as usize).hash(&mut hasher),
        Value::Invokable(i) => (Rc::as_ptr(i) as usize).hash(&mut hasher),
        Value::Instance(o) => (Rc::as_ptr(o) as usize).hash(&mut hasher),
    }
    Ok(Value::Integer((hasher.finish() as i64).abs()))
}

fn object_as_string(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let class = ctx.class_of(&receiver);
    let name = ctx.symbol_text(class.borrow().name);
    Ok(Value::Str(Rc::new(format!("instance of {}", name))))
}

fn object_is_nil(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Boolean(false))
}

fn object_not_nil(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Boolean(true))
}

fn object_perform(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Symbol(selector) = args[0] else {
        return Err(invalid("perform: expects a symbol"));
    };
    ctx.dispatch(selector, receiver, vec![])
}

fn object_perform_with(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Symbol(selector) = args[0] else {
        return Err(invalid("perform:withArguments: expects a symbol"));
    };
    let Value::Array(arguments) = &args[1] else {
        return Err(invalid("perform:withArguments: expects an argument array"));
    };
    ctx.dispatch(selector, receiver, arguments.to_values())
}

fn object_inst_var_at(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let (obj, index) = field_access(&receiver, &args[0])?;
    Ok(obj.read_field(index))
}

fn object_inst_var_at_put(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    mut args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let value = args.pop().expect("arity checked by dispatch");
    let (obj, index) = field_access(&receiver, &args[0])?;
    obj.write_field(index, value.clone());
    Ok(value)
}

// Shared 1-based field index validation.
fn field_access<'v>(
    receiver: &'v Value,
    index: &Value,
) -> Result<(&'v Rc<Instance>, usize), Interrupt> {
    let Value::Instance(obj) = receiver else {
        return Err(invalid("instVarAt: works on plain instances only"));
    };
    let Value::Integer(i) = index else {
        return Err(invalid("instVarAt: expects an integer index"));
    };
    let count = obj.class().borrow().number_of_fields() as i64;
    if *i < 1 || *i > count {
        return Err(invalid(format!(
            "field index {} out of range 1..{}",
            i, count
        )));
    }
    Ok((obj, (*i - 1) as usize))
}

fn object_does_not_understand(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let selector = match args.first() {
        Some(Value::Symbol(sym)) => ctx.symbol_text(*sym).to_string(),
        _ => "?".to_string(),
    };
    let class = ctx.class_of(&receiver);
    let class_name = ctx.symbol_text(class.borrow().name);
    Err(Interrupt::error(
        RuntimeErrorKind::DoesNotUnderstand,
        format!("{} does not understand '{}'", class_name, selector),
    ))
}

fn object_escaped_block(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let class = ctx.class_of(&receiver);
    let class_name = ctx.symbol_text(class.borrow().name);
    Err(Interrupt::error(
        RuntimeErrorKind::EscapedBlock,
        format!(
            "a block escaped its home activation in an instance of {}",
            class_name
        ),
    ))
}

fn object_unknown_global(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let name = match args.first() {
        Some(Value::Symbol(sym)) => ctx.symbol_text(*sym).to_string(),
        _ => "?".to_string(),
    };
    Err(Interrupt::error(
        RuntimeErrorKind::UnknownGlobal,
        format!("unknown global '{}'", name),
    ))
}

fn class_new(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Class(class) = receiver else {
        return Err(invalid("'new' expects a class receiver"));
    };
    Ok(Value::Instance(Rc::new(Instance::new(class))))
}

fn class_name(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Class(class) = receiver else {
        return Err(invalid("'name' expects a class receiver"));
    };
    let name = class.borrow().name;
    Ok(Value::Symbol(name))
}

fn class_superclass(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Class(class) = receiver else {
        return Err(invalid("'superclass' expects a class receiver"));
    };
    let superclass = class.borrow().superclass.clone();
    Ok(match superclass {
        Some(s) => Value::Class(s),
        None => Value::Nil,
    })
}

fn nil_is_nil(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Boolean(true))
}

fn nil_not_nil(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Boolean(false))
}

fn nil_as_string(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    Ok(Value::Str(Rc::new("nil".to_string())))
}
