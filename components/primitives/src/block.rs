//! Primitives on Block.

use crate::{eval_arg, expect_boolean, invalid};
use core_types::Interner;
use object_model::{CoreClasses, Interrupt, Primitive, Value, VmContext};

pub(crate) fn install(core: &CoreClasses, interner: &mut Interner) {
    let block = &core.block_class;
    crate::install(block, interner, "value", block_value);
    crate::install(block, interner, "value:", block_value);
    crate::install(block, interner, "value:with:", block_value);
    crate::install(block, interner, "numArgs", block_num_args);
    crate::install(block, interner, "whileTrue:", block_while_true);
    crate::install(block, interner, "whileFalse:", block_while_false);
}

// One implementation serves every arity; the engine checks the argument
// count against the block's parameter list.
fn block_value(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Block(block) = receiver else {
        return Err(invalid("'value' expects a block receiver"));
    };
    ctx.invoke_block(&block, args)
}

fn block_num_args(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Block(block) = receiver else {
        return Err(invalid("'numArgs' expects a block receiver"));
    };
    Ok(Value::Integer(block.num_args() as i64))
}

fn block_while_true(
    prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    block_while(prim, ctx, receiver, args, true)
}

fn block_while_false(
    prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    block_while(prim, ctx, receiver, args, false)
}

fn block_while(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    mut args: Vec<Value>,
    run_while: bool,
) -> Result<Value, Interrupt> {
    let Value::Block(condition) = receiver else {
        return Err(invalid("'whileTrue:' expects a block receiver"));
    };
    let body = args.remove(0);
    loop {
        let test = ctx.invoke_block(&condition, vec![])?;
        if expect_boolean(&test, "the loop condition")? != run_while {
            return Ok(Value::Nil);
        }
        eval_arg(ctx, body.clone())?;
    }
}
