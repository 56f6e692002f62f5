//! Primitives on Integer and Double.
//!
//! Integer covers both machine words and big integers; one class, two
//! representations. Machine arithmetic promotes to the arbitrary-
//! precision representation on overflow and results demote back when
//! they fit, so programs never observe the boundary.

use crate::invalid;
use core_types::Interner;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use object_model::{CoreClasses, Interrupt, Primitive, Value, VmContext};
use std::cmp::Ordering;
use std::rc::Rc;

pub(crate) fn install(core: &CoreClasses, interner: &mut Interner) {
    let int = &core.integer_class;
    crate::install(int, interner, "+", num_add);
    crate::install(int, interner, "-", num_sub);
    crate::install(int, interner, "*", num_mul);
    crate::install(int, interner, "/", int_div);
    crate::install(int, interner, "//", num_fdiv);
    crate::install(int, interner, "%", int_mod);
    crate::install(int, interner, "rem:", int_rem);
    crate::install(int, interner, "sqrt", num_sqrt);
    crate::install(int, interner, "abs", num_abs);
    crate::install(int, interner, "negated", num_negated);
    crate::install(int, interner, "&", int_bitand);
    crate::install(int, interner, "<<", int_shl);
    crate::install(int, interner, ">>>", int_shr);
    crate::install(int, interner, "<", num_lt);
    crate::install(int, interner, "<=", num_le);
    crate::install(int, interner, ">", num_gt);
    crate::install(int, interner, ">=", num_ge);
    crate::install(int, interner, "=", num_eq);
    crate::install(int, interner, "asString", num_as_string);
    crate::install(int, interner, "asDouble", int_as_double);
    crate::install(int, interner, "to:do:", int_to_do);

    let int_meta = core
        .integer_class
        .borrow()
        .metaclass()
        .expect("Integer has a metaclass");
    crate::install(&int_meta, interner, "fromString:", int_from_string);

    let dbl = &core.double_class;
    crate::install(dbl, interner, "+", num_add);
    crate::install(dbl, interner, "-", num_sub);
    crate::install(dbl, interner, "*", num_mul);
    crate::install(dbl, interner, "/", num_fdiv);
    crate::install(dbl, interner, "//", num_fdiv);
    crate::install(dbl, interner, "sqrt", num_sqrt);
    crate::install(dbl, interner, "abs", num_abs);
    crate::install(dbl, interner, "negated", num_negated);
    crate::install(dbl, interner, "round", dbl_round);
    crate::install(dbl, interner, "asInteger", dbl_as_integer);
    crate::install(dbl, interner, "<", num_lt);
    crate::install(dbl, interner, "<=", num_le);
    crate::install(dbl, interner, ">", num_gt);
    crate::install(dbl, interner, ">=", num_ge);
    crate::install(dbl, interner, "=", num_eq);
    crate::install(dbl, interner, "asString", num_as_string);
}

// The numeric tower a primitive sees.
enum Num {
    Int(i64),
    Big(Rc<BigInt>),
    Dbl(f64),
}

fn num_of(value: &Value) -> Option<Num> {
    match value {
        Value::Integer(n) => Some(Num::Int(*n)),
        Value::BigInteger(n) => Some(Num::Big(n.clone())),
        Value::Double(d) => Some(Num::Dbl(*d)),
        _ => None,
    }
}

fn as_f64(num: &Num) -> f64 {
    match num {
        Num::Int(n) => *n as f64,
        Num::Big(n) => n.to_f64().unwrap_or(f64::INFINITY),
        Num::Dbl(d) => *d,
    }
}

fn as_big(num: &Num) -> BigInt {
    match num {
        Num::Int(n) => BigInt::from(*n),
        Num::Big(n) => (**n).clone(),
        Num::Dbl(_) => unreachable!("doubles never reach the big-integer path"),
    }
}

// Results demote to a machine word when they fit.
fn normalize_big(value: BigInt) -> Value {
    match value.to_i64() {
        Some(n) => Value::Integer(n),
        None => Value::BigInteger(Rc::new(value)),
    }
}

fn operands(receiver: &Value, args: &[Value], selector: &str) -> Result<(Num, Num), Interrupt> {
    let lhs = num_of(receiver)
        .ok_or_else(|| invalid(format!("'{}' expects a numeric receiver", selector)))?;
    let rhs = num_of(&args[0])
        .ok_or_else(|| invalid(format!("'{}' expects a numeric argument", selector)))?;
    Ok((lhs, rhs))
}

fn arith(
    receiver: &Value,
    args: &[Value],
    selector: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    big_op: fn(&BigInt, &BigInt) -> BigInt,
    dbl_op: fn(f64, f64) -> f64,
) -> Result<Value, Interrupt> {
    let (lhs, rhs) = operands(receiver, args, selector)?;
    Ok(match (&lhs, &rhs) {
        (Num::Dbl(_), _) | (_, Num::Dbl(_)) => Value::Double(dbl_op(as_f64(&lhs), as_f64(&rhs))),
        (Num::Int(a), Num::Int(b)) => match int_op(*a, *b) {
            Some(n) => Value::Integer(n),
            None => normalize_big(big_op(&BigInt::from(*a), &BigInt::from(*b))),
        },
        _ => normalize_big(big_op(&as_big(&lhs), &as_big(&rhs))),
    })
}

fn num_add(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    arith(&receiver, &args, "+", i64::checked_add, |a, b| a + b, |a, b| a + b)
}

fn num_sub(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    arith(&receiver, &args, "-", i64::checked_sub, |a, b| a - b, |a, b| a - b)
}

fn num_mul(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    arith(&receiver, &args, "*", i64::checked_mul, |a, b| a * b, |a, b| a * b)
}

fn int_div(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let (lhs, rhs) = operands(&receiver, &args, "/")?;
    match (&lhs, &rhs) {
        (Num::Dbl(_), _) | (_, Num::Dbl(_)) => {
            Ok(Value::Double(as_f64(&lhs) / as_f64(&rhs)))
        }
        (Num::Int(a), Num::Int(b)) => {
            if *b == 0 {
                return Err(invalid("division by zero"));
            }
            match a.checked_div(*b) {
                Some(n) => Ok(Value::Integer(n)),
                None => Ok(normalize_big(BigInt::from(*a) / BigInt::from(*b))),
            }
        }
        _ => {
            let divisor = as_big(&rhs);
            if divisor.is_zero() {
                return Err(invalid("division by zero"));
            }
            Ok(normalize_big(as_big(&lhs) / divisor))
        }
    }
}

fn num_fdiv(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let (lhs, rhs) = operands(&receiver, &args, "//")?;
    Ok(Value::Double(as_f64(&lhs) / as_f64(&rhs)))
}

fn int_mod(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let (lhs, rhs) = operands(&receiver, &args, "%")?;
    match (&lhs, &rhs) {
        (Num::Int(a), Num::Int(b)) => {
            if *b == 0 {
                return Err(invalid("modulo by zero"));
            }
            // Floored modulo: the result takes the divisor's sign.
            Ok(Value::Integer(((a % b) + b) % b))
        }
        (Num::Dbl(_), _) | (_, Num::Dbl(_)) => {
            Err(invalid("'%' expects integer operands"))
        }
        _ => {
            let divisor = as_big(&rhs);
            if divisor.is_zero() {
                return Err(invalid("modulo by zero"));
            }
            let mut r = as_big(&lhs) % &divisor;
            if !r.is_zero() && (r.is_negative() != divisor.is_negative()) {
                r += divisor;
            }
            Ok(normalize_big(r))
        }
    }
}

fn int_rem(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let (lhs, rhs) = operands(&receiver, &args, "rem:")?;
    match (&lhs, &rhs) {
        (Num::Int(a), Num::Int(b)) => {
            if *b == 0 {
                return Err(invalid("remainder by zero"));
            }
            Ok(Value::Integer(a.wrapping_rem(*b)))
        }
        (Num::Dbl(_), _) | (_, Num::Dbl(_)) => Err(invalid("'rem:' expects integer operands")),
        _ => {
            let divisor = as_big(&rhs);
            if divisor.is_zero() {
                return Err(invalid("remainder by zero"));
            }
            Ok(normalize_big(as_big(&lhs) % divisor))
        }
    }
}

fn num_sqrt(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let num = num_of(&receiver).ok_or_else(|| invalid("'sqrt' expects a numeric receiver"))?;
    Ok(Value::Double(as_f64(&num).sqrt()))
}

fn num_abs(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    match num_of(&receiver).ok_or_else(|| invalid("'abs' expects a numeric receiver"))? {
        Num::Int(n) => Ok(match n.checked_abs() {
            Some(a) => Value::Integer(a),
            None => normalize_big(BigInt::from(n).abs()),
        }),
        Num::Big(n) => Ok(normalize_big(n.abs())),
        Num::Dbl(d) => Ok(Value::Double(d.abs())),
    }
}

fn num_negated(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    match num_of(&receiver).ok_or_else(|| invalid("'negated' expects a numeric receiver"))? {
        Num::Int(n) => Ok(match n.checked_neg() {
            Some(v) => Value::Integer(v),
            None => normalize_big(-BigInt::from(n)),
        }),
        Num::Big(n) => Ok(normalize_big(-(*n).clone())),
        Num::Dbl(d) => Ok(Value::Double(-d)),
    }
}

fn int_bitand(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let (lhs, rhs) = operands(&receiver, &args, "&")?;
    match (&lhs, &rhs) {
        (Num::Int(a), Num::Int(b)) => Ok(Value::Integer(a & b)),
        (Num::Dbl(_), _) | (_, Num::Dbl(_)) => Err(invalid("'&' expects integer operands")),
        _ => Ok(normalize_big(as_big(&lhs) & as_big(&rhs))),
    }
}

fn int_shl(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let (lhs, rhs) = operands(&receiver, &args, "<<")?;
    let shift = match rhs {
        Num::Int(s) if (0..=4096).contains(&s) => s as u32,
        _ => return Err(invalid("'<<' expects a small non-negative shift")),
    };
    match lhs {
        Num::Int(a) => {
            // Promote instead of losing high bits.
            match a.checked_shl(shift).filter(|r| (r >> shift) == a) {
                Some(r) => Ok(Value::Integer(r)),
                None => Ok(normalize_big(BigInt::from(a) << shift)),
            }
        }
        Num::Big(a) => Ok(normalize_big((*a).clone() << shift)),
        Num::Dbl(_) => Err(invalid("'<<' expects integer operands")),
    }
}

fn int_shr(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let (lhs, rhs) = operands(&receiver, &args, ">>>")?;
    let shift = match rhs {
        Num::Int(s) if (0..64).contains(&s) => s as u32,
        _ => return Err(invalid("'>>>' expects a shift between 0 and 63")),
    };
    match lhs {
        Num::Int(a) => Ok(Value::Integer(((a as u64) >> shift) as i64)),
        _ => Err(invalid("'>>>' expects a machine integer receiver")),
    }
}

fn compare(lhs: &Num, rhs: &Num) -> Ordering {
    match (lhs, rhs) {
        (Num::Int(a), Num::Int(b)) => a.cmp(b),
        (Num::Dbl(_), _) | (_, Num::Dbl(_)) => as_f64(lhs)
            .partial_cmp(&as_f64(rhs))
            .unwrap_or(Ordering::Greater),
        _ => as_big(lhs).cmp(&as_big(rhs)),
    }
}

fn num_compare(
    receiver: &Value,
    args: &[Value],
    selector: &str,
    accept: fn(Ordering) -> bool,
) -> Result<Value, Interrupt> {
    let (lhs, rhs) = operands(receiver, args, selector)?;
    Ok(Value::Boolean(accept(compare(&lhs, &rhs))))
}

fn num_lt(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    num_compare(&receiver, &args, "<", Ordering::is_lt)
}

fn num_le(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    num_compare(&receiver, &args, "<=", Ordering::is_le)
}

fn num_gt(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    num_compare(&receiver, &args, ">", Ordering::is_gt)
}

fn num_ge(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    num_compare(&receiver, &args, ">=", Ordering::is_ge)
}

fn num_eq(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let lhs = num_of(&receiver).ok_or_else(|| invalid("'=' expects a numeric receiver"))?;
    // Numbers never equal non-numbers; no error, just false.
    Ok(match num_of(&args[0]) {
        Some(rhs) => Value::Boolean(compare(&lhs, &rhs) == Ordering::Equal),
        None => Value::Boolean(false),
    })
}

fn num_as_string(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let text = match &receiver {
        Value::Integer(n) => n.to_string(),
        Value::BigInteger(n) => n.to_string(),
        Value::Double(d) => format!("{:?}", d),
        _ => return Err(invalid("'asString' expects a numeric receiver")),
    };
    Ok(Value::Str(Rc::new(text)))
}

fn int_as_double(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let num = num_of(&receiver).ok_or_else(|| invalid("'asDouble' expects a number"))?;
    Ok(Value::Double(as_f64(&num)))
}

fn int_to_do(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Integer(from) = receiver else {
        return Err(invalid("'to:do:' expects a machine integer receiver"));
    };
    let Value::Integer(to) = args[0] else {
        return Err(invalid("'to:do:' expects an integer bound"));
    };
    let Value::Block(ref body) = args[1] else {
        return Err(invalid("'to:do:' expects a block body"));
    };
    let mut i = from;
    while i <= to {
        ctx.invoke_block(body, vec![Value::Integer(i)])?;
        i += 1;
    }
    Ok(receiver)
}

fn int_from_string(
    _prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Some(text) = crate::text_of(ctx, &args[0]) else {
        return Err(invalid("'fromString:' expects a string"));
    };
    let trimmed = text.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(Value::Integer(n));
    }
    match trimmed.parse::<BigInt>() {
        Ok(n) => Ok(normalize_big(n)),
        Err(_) => Err(invalid(format!("'{}' is not an integer", trimmed))),
    }
}

fn dbl_round(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Double(d) = receiver else {
        return Err(invalid("'round' expects a double receiver"));
    };
    Ok(Value::Integer(d.round() as i64))
}

fn dbl_as_integer(
    _prim: &Primitive,
    _ctx: &mut dyn VmContext,
    receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let Value::Double(d) = receiver else {
        return Err(invalid("'asInteger' expects a double receiver"));
    };
    Ok(Value::Integer(d.trunc() as i64))
}
