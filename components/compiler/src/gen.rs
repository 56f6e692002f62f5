//! Bytecode generation and class assembly.
//!
//! Every identifier is resolved here, at compile time, to one of: an
//! argument or local slot (with the context level of the owning frame),
//! an instance-field index, or a global symbol. The interpreter never
//! looks a name up at run time. Send sites get their inline-cache slots
//! assigned here as well.

use crate::ast::{Body, ClassDef, Expression, MethodBodyDef, MethodDef, Statement};
use bytecode_system::Opcode;
use core_types::{selector_arity, Interner, ParseError, RuntimeErrorKind, SourcePosition, SymbolId};
use object_model::{
    som_ref, ArrayObj, Class, Interrupt, Invokable, Method, MethodBody, Primitive, SomRef,
    Value, VmContext,
};
use std::rc::Rc;

/// Assemble a parsed class definition into a class/metaclass pair.
///
/// `superclass` must already be loaded so inherited fields and the
/// metaclass chain are known; the loader resolves it before calling.
pub fn compile_class(
    def: &ClassDef,
    superclass: SomRef<Class>,
    interner: &mut Interner,
) -> Result<SomRef<Class>, ParseError> {
    let name = interner.intern(&def.name);

    let instance_fields = extend_fields(
        superclass.borrow().field_names.clone(),
        &def.instance_fields,
        interner,
        def.position,
    )?;
    let class = som_ref(Class::new(name, Some(superclass.clone()), instance_fields));

    let meta_name = interner.intern(&format!("{} class", def.name));
    let meta_super = superclass.borrow().metaclass();
    let inherited_class_fields = meta_super
        .as_ref()
        .map(|m| m.borrow().field_names.clone())
        .unwrap_or_default();
    let class_fields = extend_fields(
        inherited_class_fields,
        &def.class_fields,
        interner,
        def.position,
    )?;
    let metaclass = som_ref(Class::new(meta_name, meta_super, class_fields));
    class.borrow().set_metaclass(metaclass.clone());

    for method in &def.instance_methods {
        let fields = class.borrow().field_names.clone();
        let invokable = compile_method(method, &fields, interner)?;
        Class::install(&class, invokable.signature(), invokable);
    }
    for method in &def.class_methods {
        let fields = metaclass.borrow().field_names.clone();
        let invokable = compile_method(method, &fields, interner)?;
        Class::install(&metaclass, invokable.signature(), invokable);
    }

    Ok(class)
}

fn extend_fields(
    mut fields: Vec<SymbolId>,
    own: &[String],
    interner: &mut Interner,
    position: SourcePosition,
) -> Result<Vec<SymbolId>, ParseError> {
    for name in own {
        let sym = interner.intern(name);
        if fields.contains(&sym) {
            return Err(ParseError {
                message: format!("field '{}' already declared in the superclass chain", name),
                position,
                expected: "a fresh field name".to_string(),
                found: format!("'{}'", name),
            });
        }
        fields.push(sym);
    }
    Ok(fields)
}

fn compile_method(
    def: &MethodDef,
    fields: &[SymbolId],
    interner: &mut Interner,
) -> Result<Rc<Invokable>, ParseError> {
    let signature = interner.intern(&def.selector);
    match &def.body {
        MethodBodyDef::Primitive => Ok(Rc::new(Invokable::Primitive(Rc::new(Primitive::new(
            signature,
            undefined_primitive,
        ))))),
        MethodBodyDef::Body(body) => {
            let mut compiler = MethodCompiler {
                interner,
                fields,
                scopes: Vec::new(),
                position: def.position,
            };
            let method = compiler.compile(signature, &def.parameters, body)?;
            Ok(Rc::new(Invokable::Method(Rc::new(method))))
        }
    }
}

// Trap installed for `primitive` bodies the bootstrap did not replace.
fn undefined_primitive(
    prim: &Primitive,
    ctx: &mut dyn VmContext,
    _receiver: Value,
    _args: Vec<Value>,
) -> Result<Value, Interrupt> {
    let name = ctx.symbol_text(prim.signature);
    Err(Interrupt::error(
        RuntimeErrorKind::UndefinedPrimitive,
        format!("undefined primitive '{}'", name),
    ))
}

/// The block-invocation selector for a given parameter count.
fn block_selector(num_params: usize) -> String {
    match num_params {
        0 => "value".to_string(),
        1 => "value:".to_string(),
        n => {
            let mut s = "value:".to_string();
            for _ in 1..n {
                s.push_str("with:");
            }
            s
        }
    }
}

// How an identifier resolved at compile time.
enum Resolved {
    Argument { index: u8, context: u8 },
    Local { index: u8, context: u8 },
    Field { index: u8 },
    Global(SymbolId),
}

struct ScopeInfo {
    params: Vec<String>,
    locals: Vec<String>,
}

struct Emitter {
    code: Vec<Opcode>,
    literals: Vec<Value>,
    num_caches: usize,
    cur_stack: usize,
    max_stack: usize,
}

impl Emitter {
    fn new() -> Self {
        Self {
            code: Vec::new(),
            literals: Vec::new(),
            num_caches: 0,
            cur_stack: 0,
            max_stack: 0,
        }
    }

    fn note_effect(&mut self, pushed: usize, popped: usize) {
        self.cur_stack = self.cur_stack.saturating_sub(popped) + pushed;
        self.max_stack = self.max_stack.max(self.cur_stack);
    }

    fn emit_push(&mut self, op: Opcode) {
        self.note_effect(1, 0);
        self.code.push(op);
    }

    fn emit_pop(&mut self, op: Opcode) {
        self.note_effect(0, 1);
        self.code.push(op);
    }

    fn emit_send(&mut self, op: Opcode, argc: usize) {
        self.note_effect(1, argc + 1);
        self.code.push(op);
    }

    fn alloc_cache(&mut self, position: SourcePosition) -> Result<u16, ParseError> {
        if self.num_caches > u16::MAX as usize {
            return Err(too_complex("too many send sites in one method", position));
        }
        let slot = self.num_caches as u16;
        self.num_caches += 1;
        Ok(slot)
    }

    fn add_literal(&mut self, value: Value, position: SourcePosition) -> Result<u8, ParseError> {
        if let Some(found) = self.literals.iter().position(|v| {
            // Invokables are never shared between sites; everything else
            // dedups by content so repeated constants stay compact.
            !matches!(value, Value::Invokable(_)) && *v == value
        }) {
            return Ok(found as u8);
        }
        if self.literals.len() > u8::MAX as usize {
            return Err(too_complex("too many literals in one method", position));
        }
        self.literals.push(value);
        Ok((self.literals.len() - 1) as u8)
    }
}

fn too_complex(message: &str, position: SourcePosition) -> ParseError {
    ParseError {
        message: message.to_string(),
        position,
        expected: "a smaller method".to_string(),
        found: "an oversized one".to_string(),
    }
}

struct MethodCompiler<'i, 'f> {
    interner: &'i mut Interner,
    fields: &'f [SymbolId],
    scopes: Vec<ScopeInfo>,
    position: SourcePosition,
}

impl MethodCompiler<'_, '_> {
    // Context level from the current frame out to the home method frame.
    fn home_context(&self) -> u8 {
        (self.scopes.len() - 1) as u8
    }

    fn compile(
        &mut self,
        signature: SymbolId,
        params: &[String],
        body: &Body,
    ) -> Result<Method, ParseError> {
        self.scopes.push(ScopeInfo {
            params: params.to_vec(),
            locals: body.locals.clone(),
        });
        let is_block = self.scopes.len() > 1;

        let mut em = Emitter::new();
        let last = body.statements.len().saturating_sub(1);
        let mut ends_with_return = false;
        for (i, statement) in body.statements.iter().enumerate() {
            match statement {
                Statement::Expression(expr) => {
                    self.emit_expression(&mut em, expr)?;
                    if !(is_block && i == last) {
                        em.emit_pop(Opcode::Pop);
                    }
                    ends_with_return = false;
                }
                Statement::Return(expr) => {
                    self.emit_expression(&mut em, expr)?;
                    if is_block {
                        em.emit_pop(Opcode::ReturnNonLocal);
                    } else {
                        em.emit_pop(Opcode::ReturnLocal);
                    }
                    ends_with_return = true;
                }
            }
        }

        if !ends_with_return {
            if is_block {
                if body.statements.is_empty() {
                    let lit = em.add_literal(Value::Nil, self.position)?;
                    em.emit_push(Opcode::PushConstant { literal: lit });
                }
                em.emit_pop(Opcode::ReturnLocal);
            } else {
                // Methods answer self unless told otherwise.
                em.emit_push(Opcode::PushArgument { index: 0, context: 0 });
                em.emit_pop(Opcode::ReturnLocal);
            }
        }

        self.scopes.pop();
        Ok(Method::new(
            signature,
            MethodBody {
                code: em.code,
                literals: em.literals,
                num_args: params.len(),
                num_locals: body.locals.len(),
                num_caches: em.num_caches,
                max_stack: em.max_stack,
            },
        ))
    }

    fn resolve(&mut self, name: &str) -> Result<Resolved, ParseError> {
        for (context, scope) in self.scopes.iter().rev().enumerate() {
            if let Some(i) = scope.params.iter().position(|p| p == name) {
                return Ok(Resolved::Argument {
                    index: slot_index(i + 1, self.position)?,
                    context: context_index(context, self.position)?,
                });
            }
            if let Some(i) = scope.locals.iter().position(|l| l == name) {
                return Ok(Resolved::Local {
                    index: slot_index(i, self.position)?,
                    context: context_index(context, self.position)?,
                });
            }
        }
        let sym = self.interner.intern(name);
        if let Some(i) = self.fields.iter().position(|f| *f == sym) {
            return Ok(Resolved::Field {
                index: slot_index(i, self.position)?,
            });
        }
        Ok(Resolved::Global(sym))
    }

    fn emit_expression(&mut self, em: &mut Emitter, expr: &Expression) -> Result<(), ParseError> {
        match expr {
            Expression::Variable(name) => self.emit_variable(em, name),
            Expression::Integer(n) => {
                let lit = em.add_literal(Value::Integer(*n), self.position)?;
                em.emit_push(Opcode::PushConstant { literal: lit });
                Ok(())
            }
            Expression::BigInteger(n) => {
                let lit =
                    em.add_literal(Value::BigInteger(Rc::new(n.clone())), self.position)?;
                em.emit_push(Opcode::PushConstant { literal: lit });
                Ok(())
            }
            Expression::Double(d) => {
                let lit = em.add_literal(Value::Double(*d), self.position)?;
                em.emit_push(Opcode::PushConstant { literal: lit });
                Ok(())
            }
            Expression::Str(s) => {
                let lit = em.add_literal(Value::Str(Rc::new(s.clone())), self.position)?;
                em.emit_push(Opcode::PushConstant { literal: lit });
                Ok(())
            }
            Expression::Symbol(s) => {
                let sym = self.interner.intern(s);
                let lit = em.add_literal(Value::Symbol(sym), self.position)?;
                em.emit_push(Opcode::PushConstant { literal: lit });
                Ok(())
            }
            Expression::Array(elements) => {
                let array = self.literal_array(elements)?;
                let lit = em.add_literal(array, self.position)?;
                em.emit_push(Opcode::PushConstant { literal: lit });
                Ok(())
            }
            Expression::Block { parameters, body } => {
                let selector = block_selector(parameters.len());
                let signature = self.interner.intern(&selector);
                let method = self.compile(signature, parameters, body)?;
                let lit = em.add_literal(
                    Value::Invokable(Rc::new(Invokable::Method(Rc::new(method)))),
                    self.position,
                )?;
                em.emit_push(Opcode::PushBlock { literal: lit });
                Ok(())
            }
            Expression::Message {
                receiver,
                selector,
                arguments,
            } => self.emit_message(em, receiver, selector, arguments),
            Expression::Assignment { variable, value } => {
                self.emit_expression(em, value)?;
                // Assignment is an expression; its value survives the store.
                em.emit_push(Opcode::Dup);
                match self.resolve(variable)? {
                    Resolved::Argument { index, context } => {
                        em.emit_pop(Opcode::PopArgument { index, context });
                        Ok(())
                    }
                    Resolved::Local { index, context } => {
                        em.emit_pop(Opcode::PopLocal { index, context });
                        Ok(())
                    }
                    Resolved::Field { index } => {
                        em.emit_pop(Opcode::PopField {
                            index,
                            context: self.home_context(),
                        });
                        Ok(())
                    }
                    Resolved::Global(_) => Err(ParseError {
                        message: format!("cannot assign to undeclared variable '{}'", variable),
                        position: self.position,
                        expected: "an argument, local, or field".to_string(),
                        found: format!("'{}'", variable),
                    }),
                }
            }
        }
    }

    fn emit_variable(&mut self, em: &mut Emitter, name: &str) -> Result<(), ParseError> {
        match name {
            "nil" => {
                let lit = em.add_literal(Value::Nil, self.position)?;
                em.emit_push(Opcode::PushConstant { literal: lit });
            }
            "true" => {
                let lit = em.add_literal(Value::Boolean(true), self.position)?;
                em.emit_push(Opcode::PushConstant { literal: lit });
            }
            "false" => {
                let lit = em.add_literal(Value::Boolean(false), self.position)?;
                em.emit_push(Opcode::PushConstant { literal: lit });
            }
            "self" | "super" => {
                em.emit_push(Opcode::PushArgument {
                    index: 0,
                    context: self.home_context(),
                });
            }
            _ => match self.resolve(name)? {
                Resolved::Argument { index, context } => {
                    em.emit_push(Opcode::PushArgument { index, context });
                }
                Resolved::Local { index, context } => {
                    em.emit_push(Opcode::PushLocal { index, context });
                }
                Resolved::Field { index } => {
                    em.emit_push(Opcode::PushField {
                        index,
                        context: self.home_context(),
                    });
                }
                Resolved::Global(sym) => {
                    let lit = em.add_literal(Value::Symbol(sym), self.position)?;
                    em.emit_push(Opcode::PushGlobal { literal: lit });
                }
            },
        }
        Ok(())
    }

    fn emit_message(
        &mut self,
        em: &mut Emitter,
        receiver: &Expression,
        selector: &str,
        arguments: &[Expression],
    ) -> Result<(), ParseError> {
        let super_send = receiver.is_super();
        self.emit_expression(em, receiver)?;
        for argument in arguments {
            self.emit_expression(em, argument)?;
        }
        let argc = arguments.len();
        debug_assert_eq!(argc, selector_arity(selector));

        if super_send {
            let sym = self.interner.intern(selector);
            let literal = em.add_literal(Value::Symbol(sym), self.position)?;
            let cache = em.alloc_cache(self.position)?;
            em.emit_send(Opcode::SuperSend { literal, cache }, argc);
            return Ok(());
        }

        // Quickened arithmetic; the interpreter falls back to a full
        // send for non-integer operands.
        if argc == 1 {
            match selector {
                "+" => {
                    em.emit_send(Opcode::Add, 1);
                    return Ok(());
                }
                "-" => {
                    em.emit_send(Opcode::Subtract, 1);
                    return Ok(());
                }
                "*" => {
                    em.emit_send(Opcode::Multiply, 1);
                    return Ok(());
                }
                _ => {}
            }
        }

        let sym = self.interner.intern(selector);
        let literal = em.add_literal(Value::Symbol(sym), self.position)?;
        let cache = em.alloc_cache(self.position)?;
        em.emit_send(Opcode::Send { literal, cache }, argc);
        Ok(())
    }

    fn literal_array(&mut self, elements: &[Expression]) -> Result<Value, ParseError> {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(match element {
                Expression::Integer(n) => Value::Integer(*n),
                Expression::BigInteger(n) => Value::BigInteger(Rc::new(n.clone())),
                Expression::Double(d) => Value::Double(*d),
                Expression::Str(s) => Value::Str(Rc::new(s.clone())),
                Expression::Symbol(s) => Value::Symbol(self.interner.intern(s)),
                Expression::Array(nested) => self.literal_array(nested)?,
                Expression::Variable(name) if name == "nil" => Value::Nil,
                Expression::Variable(name) if name == "true" => Value::Boolean(true),
                Expression::Variable(name) if name == "false" => Value::Boolean(false),
                _ => {
                    return Err(ParseError {
                        message: "literal arrays may only hold literals".to_string(),
                        position: self.position,
                        expected: "a literal".to_string(),
                        found: "an expression".to_string(),
                    })
                }
            });
        }
        Ok(Value::Array(Rc::new(ArrayObj::from_values(values))))
    }
}

fn slot_index(index: usize, position: SourcePosition) -> Result<u8, ParseError> {
    u8::try_from(index).map_err(|_| too_complex("too many slots in one scope", position))
}

fn context_index(context: usize, position: SourcePosition) -> Result<u8, ParseError> {
    u8::try_from(context).map_err(|_| too_complex("blocks nested too deeply", position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn compile(source: &str) -> (SomRef<Class>, Interner) {
        let mut interner = Interner::new();
        let object = som_ref(Class::new(interner.intern("Object"), None, vec![]));
        let object_meta = som_ref(Class::new(
            interner.intern("Object class"),
            None,
            vec![],
        ));
        object.borrow().set_metaclass(object_meta);
        let def = Parser::new(source)
            .expect("lexes")
            .parse_class()
            .expect("parses");
        let class = compile_class(&def, object, &mut interner).expect("compiles");
        (class, interner)
    }

    fn method_body(class: &SomRef<Class>, interner: &mut Interner, selector: &str) -> MethodBody {
        let sym = interner.intern(selector);
        let inv = class.borrow().lookup_method(sym).expect("method exists");
        inv.as_method().expect("compiled method").body.clone()
    }

    #[test]
    fn test_counter_field_access() {
        let (class, mut interner) = compile(
            "Counter = ( | n |
                init = ( n := 0 )
                inc = ( n := n + 1. ^n )
            )",
        );
        let inc = method_body(&class, &mut interner, "inc");
        assert!(inc
            .code
            .iter()
            .any(|op| matches!(op, Opcode::PushField { index: 0, context: 0 })));
        assert!(inc
            .code
            .iter()
            .any(|op| matches!(op, Opcode::PopField { index: 0, context: 0 })));
        assert!(inc.code.contains(&Opcode::Add));
        // `^n` ends the method; no implicit self return follows.
        assert_eq!(inc.code.last(), Some(&Opcode::ReturnLocal));
    }

    #[test]
    fn test_implicit_self_return() {
        let (class, mut interner) = compile("T = ( nop = ( 1 ) )");
        let body = method_body(&class, &mut interner, "nop");
        let tail = &body.code[body.code.len() - 2..];
        assert_eq!(
            tail,
            &[
                Opcode::PushArgument { index: 0, context: 0 },
                Opcode::ReturnLocal
            ]
        );
    }

    #[test]
    fn test_arguments_and_locals_resolve_to_slots() {
        let (class, mut interner) = compile("T = ( add: a to: b = ( | t | t := a. ^t + b ) )");
        let body = method_body(&class, &mut interner, "add:to:");
        assert_eq!(body.num_args, 2);
        assert_eq!(body.num_locals, 1);
        assert!(body
            .code
            .iter()
            .any(|op| matches!(op, Opcode::PushArgument { index: 1, context: 0 })));
        assert!(body
            .code
            .iter()
            .any(|op| matches!(op, Opcode::PopLocal { index: 0, context: 0 })));
        assert!(body
            .code
            .iter()
            .any(|op| matches!(op, Opcode::PushArgument { index: 2, context: 0 })));
    }

    #[test]
    fn test_block_outer_access_uses_context_level() {
        let (class, mut interner) = compile("T = ( m: a = ( ^[ a ] ) )");
        let body = method_body(&class, &mut interner, "m:");
        let block = body
            .literals
            .iter()
            .find_map(|lit| match lit {
                Value::Invokable(inv) => inv.as_method().map(|m| m.body.clone()),
                _ => None,
            })
            .expect("block literal");
        assert!(block
            .code
            .iter()
            .any(|op| matches!(op, Opcode::PushArgument { index: 1, context: 1 })));
        // The block answers its last expression without unwinding.
        assert_eq!(block.code.last(), Some(&Opcode::ReturnLocal));
    }

    #[test]
    fn test_caret_in_block_is_non_local() {
        let (class, mut interner) = compile("T = ( m = ( [ ^42 ] value. ^0 ) )");
        let body = method_body(&class, &mut interner, "m");
        let block = body
            .literals
            .iter()
            .find_map(|lit| match lit {
                Value::Invokable(inv) => inv.as_method().map(|m| m.body.clone()),
                _ => None,
            })
            .expect("block literal");
        assert!(block.code.contains(&Opcode::ReturnNonLocal));
    }

    #[test]
    fn test_super_send_is_marked() {
        let (class, mut interner) = compile("T = ( m = ( ^super m ) )");
        let body = method_body(&class, &mut interner, "m");
        assert!(body
            .code
            .iter()
            .any(|op| matches!(op, Opcode::SuperSend { .. })));
    }

    #[test]
    fn test_cache_slots_are_distinct() {
        let (class, mut interner) = compile("T = ( m = ( self foo. self bar. ^self baz ) )");
        let body = method_body(&class, &mut interner, "m");
        let caches: Vec<u16> = body
            .code
            .iter()
            .filter_map(|op| match op {
                Opcode::Send { cache, .. } => Some(*cache),
                _ => None,
            })
            .collect();
        assert_eq!(caches, vec![0, 1, 2]);
        assert_eq!(body.num_caches, 3);
    }

    #[test]
    fn test_quickened_arithmetic() {
        let (class, mut interner) = compile("T = ( m = ( ^1 + 2 * 3 - 4 ) )");
        let body = method_body(&class, &mut interner, "m");
        assert!(body.code.contains(&Opcode::Add));
        assert!(body.code.contains(&Opcode::Multiply));
        assert!(body.code.contains(&Opcode::Subtract));
        assert_eq!(body.num_caches, 0);
    }

    #[test]
    fn test_literal_dedup() {
        let (class, mut interner) = compile("T = ( m = ( ^7 + 7 + 7 ) )");
        let body = method_body(&class, &mut interner, "m");
        let sevens = body
            .literals
            .iter()
            .filter(|v| **v == Value::Integer(7))
            .count();
        assert_eq!(sevens, 1);
    }

    #[test]
    fn test_inherited_fields_come_first() {
        let mut interner = Interner::new();
        let object = som_ref(Class::new(interner.intern("Object"), None, vec![]));
        object
            .borrow()
            .set_metaclass(som_ref(Class::new(interner.intern("Object class"), None, vec![])));
        let base_def = Parser::new("Base = ( | a b | )")
            .unwrap()
            .parse_class()
            .unwrap();
        let base = compile_class(&base_def, object, &mut interner).unwrap();
        let sub_def = Parser::new("Sub = Base ( | c | )")
            .unwrap()
            .parse_class()
            .unwrap();
        let sub = compile_class(&sub_def, base.clone(), &mut interner).unwrap();

        let base_fields = base.borrow().field_names.clone();
        let sub_fields = sub.borrow().field_names.clone();
        assert_eq!(sub_fields.len(), 3);
        assert_eq!(&sub_fields[..2], &base_fields[..]);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut interner = Interner::new();
        let object = som_ref(Class::new(interner.intern("Object"), None, vec![]));
        object
            .borrow()
            .set_metaclass(som_ref(Class::new(interner.intern("Object class"), None, vec![])));
        let base = compile_class(
            &Parser::new("Base = ( | a | )").unwrap().parse_class().unwrap(),
            object,
            &mut interner,
        )
        .unwrap();
        let err = compile_class(
            &Parser::new("Sub = Base ( | a | )").unwrap().parse_class().unwrap(),
            base,
            &mut interner,
        )
        .unwrap_err();
        assert!(err.message.contains("already declared"));
    }

    #[test]
    fn test_assign_to_undeclared_rejected() {
        let mut interner = Interner::new();
        let object = som_ref(Class::new(interner.intern("Object"), None, vec![]));
        object
            .borrow()
            .set_metaclass(som_ref(Class::new(interner.intern("Object class"), None, vec![])));
        let def = Parser::new("T = ( m = ( zig := 1 ) )")
            .unwrap()
            .parse_class()
            .unwrap();
        let err = compile_class(&def, object, &mut interner).unwrap_err();
        assert!(err.message.contains("cannot assign"));
    }

    #[test]
    fn test_block_selector_naming() {
        assert_eq!(block_selector(0), "value");
        assert_eq!(block_selector(1), "value:");
        assert_eq!(block_selector(2), "value:with:");
    }
}
