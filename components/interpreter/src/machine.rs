//! The bytecode interpreter loop.
//!
//! One frame is executed per `execute` call; sends re-enter through the
//! dispatch engine, so the host call stack mirrors the language call
//! stack. Unwinding (non-local returns, errors, `System exit:`) travels
//! through the `Result` error channel; `execute`'s caller consumes a
//! non-local return addressed to its own frame and re-raises the rest.

use crate::universe::Universe;
use bytecode_system::Opcode;
use core_types::{selector_arity, RuntimeError, SymbolId};
use num_bigint::BigInt;
use object_model::{
    ArrayObj, Block, Class, CoreClasses, Frame, Interrupt, Invokable, Method, SomRef, Value,
    VmContext,
};
use std::rc::Rc;

/// The bytecode execution engine.
pub struct Interpreter {
    universe: Universe,
    call_depth: usize,
}

impl Interpreter {
    /// Wrap a bootstrapped universe.
    pub fn new(universe: Universe) -> Self {
        Self {
            universe,
            call_depth: 0,
        }
    }

    /// Shared access to the universe.
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Exclusive access to the universe.
    pub fn universe_mut(&mut self) -> &mut Universe {
        &mut self.universe
    }

    pub(crate) fn call_depth(&self) -> usize {
        self.call_depth
    }

    pub(crate) fn enter_activation(&mut self) {
        self.call_depth += 1;
    }

    pub(crate) fn leave_activation(&mut self) {
        self.call_depth -= 1;
    }

    /// Run a program: send `run:` (with the argument strings) or `run`
    /// to the class side of `class`.
    pub fn run_program(
        &mut self,
        class: SomRef<Class>,
        args: Vec<String>,
    ) -> Result<Value, Interrupt> {
        let receiver = Value::Class(class);
        let selectors = *self.universe.selectors();
        let metaclass = self.class_of(&receiver);
        let takes_args = metaclass
            .borrow()
            .lookup_method(selectors.run_with)
            .is_some();
        if takes_args {
            let argv: Vec<Value> = args
                .into_iter()
                .map(|a| Value::Str(Rc::new(a)))
                .collect();
            let argv = Value::Array(Rc::new(ArrayObj::from_values(argv)));
            self.full_dispatch(selectors.run_with, receiver, vec![argv])
        } else {
            self.full_dispatch(selectors.run, receiver, vec![])
        }
    }

    /// Execute `frame` to completion.
    pub(crate) fn execute(&mut self, frame: &Rc<Frame>) -> Result<Value, Interrupt> {
        let method = frame.method().clone();
        loop {
            let pc = frame.pc();
            let op = method
                .body
                .code
                .get(pc)
                .cloned()
                .ok_or_else(|| Interrupt::fatal("program counter ran off the method end"))?;
            frame.set_pc(pc + 1);

            match op {
                Opcode::Halt => return Ok(frame.top().unwrap_or(Value::Nil)),
                Opcode::Dup => {
                    let top = self.top(frame)?;
                    frame.push(top);
                }
                Opcode::PushLocal { index, context } => {
                    let target = self.context_frame(frame, context)?;
                    frame.push(target.local(index as usize));
                }
                Opcode::PushArgument { index, context } => {
                    let target = self.context_frame(frame, context)?;
                    frame.push(target.argument(index as usize));
                }
                Opcode::PushField { index, context } => {
                    let target = self.context_frame(frame, context)?;
                    let value = self.read_receiver_field(&target.receiver(), index as usize)?;
                    frame.push(value);
                }
                Opcode::PushBlock { literal } => {
                    let body = self.literal(&method, literal)?;
                    let Value::Invokable(inv) = body else {
                        return Err(Interrupt::fatal("push_block literal is not a method"));
                    };
                    let Some(block_method) = inv.as_method().cloned() else {
                        return Err(Interrupt::fatal("push_block literal is a primitive"));
                    };
                    let block = Block::new(block_method, frame.clone());
                    frame.push(Value::Block(Rc::new(block)));
                }
                Opcode::PushConstant { literal } => {
                    let value = self.literal(&method, literal)?;
                    frame.push(value);
                }
                Opcode::PushGlobal { literal } => {
                    let name = self.selector_literal(&method, literal)?;
                    let value = self.global_or_load(frame, name)?;
                    frame.push(value);
                }
                Opcode::Pop => {
                    self.pop(frame)?;
                }
                Opcode::PopLocal { index, context } => {
                    let value = self.pop(frame)?;
                    let target = self.context_frame(frame, context)?;
                    target.set_local(index as usize, value);
                }
                Opcode::PopArgument { index, context } => {
                    let value = self.pop(frame)?;
                    let target = self.context_frame(frame, context)?;
                    target.set_argument(index as usize, value);
                }
                Opcode::PopField { index, context } => {
                    let value = self.pop(frame)?;
                    let target = self.context_frame(frame, context)?;
                    self.write_receiver_field(&target.receiver(), index as usize, value)?;
                }
                Opcode::Send { literal, cache } => {
                    let selector = self.selector_literal(&method, literal)?;
                    let argc = selector_arity(&self.universe.symbol_text(selector));
                    let args = self.pop_args(frame, argc)?;
                    let receiver = self.pop(frame)?;
                    let result = self.send_cached(&method, cache, selector, receiver, args)?;
                    frame.push(result);
                }
                Opcode::SuperSend { literal, cache } => {
                    let selector = self.selector_literal(&method, literal)?;
                    let argc = selector_arity(&self.universe.symbol_text(selector));
                    let args = self.pop_args(frame, argc)?;
                    let receiver = self.pop(frame)?;
                    let home_method = Frame::home(frame).method().clone();
                    let result = self.super_send(
                        &method,
                        &home_method,
                        cache,
                        selector,
                        receiver,
                        args,
                    )?;
                    frame.push(result);
                }
                Opcode::ReturnLocal => return self.pop(frame),
                Opcode::ReturnNonLocal => {
                    let value = self.pop(frame)?;
                    return self.return_non_local(frame, value);
                }
                Opcode::Add => {
                    let selector = self.universe.selectors().plus;
                    self.quickened(frame, selector, i64::checked_add, |a, b| a + b)?;
                }
                Opcode::Subtract => {
                    let selector = self.universe.selectors().minus;
                    self.quickened(frame, selector, i64::checked_sub, |a, b| a - b)?;
                }
                Opcode::Multiply => {
                    let selector = self.universe.selectors().star;
                    self.quickened(frame, selector, i64::checked_mul, |a, b| a * b)?;
                }
            }
        }
    }

    // `^expr` reached inside a block: unwind to the home activation if it
    // is still on the stack, otherwise recover through `escapedBlock:`.
    fn return_non_local(
        &mut self,
        frame: &Rc<Frame>,
        value: Value,
    ) -> Result<Value, Interrupt> {
        let home = Frame::home(frame);
        if home.is_on_stack() {
            return Err(Interrupt::NonLocalReturn {
                value,
                target: home,
            });
        }
        let block = frame
            .block()
            .cloned()
            .ok_or_else(|| Interrupt::fatal("non-local return outside a block activation"))?;
        let escaped = self.universe.selectors().escaped_block;
        let receiver = home.receiver();
        self.full_dispatch(escaped, receiver, vec![Value::Block(block)])
    }

    fn quickened(
        &mut self,
        frame: &Rc<Frame>,
        selector: SymbolId,
        checked: fn(i64, i64) -> Option<i64>,
        big: fn(&BigInt, &BigInt) -> BigInt,
    ) -> Result<(), Interrupt> {
        let rhs = self.pop(frame)?;
        let lhs = self.pop(frame)?;
        if let (Value::Integer(a), Value::Integer(b)) = (&lhs, &rhs) {
            let result = match checked(*a, *b) {
                Some(n) => Value::Integer(n),
                // Overflow promotes transparently to a big integer.
                None => Value::BigInteger(Rc::new(big(&BigInt::from(*a), &BigInt::from(*b)))),
            };
            frame.push(result);
            return Ok(());
        }
        let result = self.full_dispatch(selector, lhs, vec![rhs])?;
        frame.push(result);
        Ok(())
    }

    fn global_or_load(
        &mut self,
        frame: &Rc<Frame>,
        name: SymbolId,
    ) -> Result<Value, Interrupt> {
        if let Some(value) = self.universe.global(name) {
            return Ok(value);
        }
        match self.universe.load_class(name) {
            Ok(class) => Ok(Value::Class(class)),
            Err(err) if err.kind == core_types::RuntimeErrorKind::UnknownGlobal => {
                // Last resort: let the program intercept the unknown name.
                let unknown = self.universe.selectors().unknown_global;
                let receiver = Frame::home(frame).receiver();
                self.full_dispatch(unknown, receiver, vec![Value::Symbol(name)])
            }
            Err(err) => Err(err.into()),
        }
    }

    fn read_receiver_field(
        &self,
        receiver: &Value,
        index: usize,
    ) -> Result<Value, Interrupt> {
        match receiver {
            Value::Instance(obj) => Ok(obj.read_field(index)),
            Value::Class(class) => Ok(class.borrow().class_field(index)),
            _ => Err(Interrupt::fatal("field access on a receiver without fields")),
        }
    }

    fn write_receiver_field(
        &self,
        receiver: &Value,
        index: usize,
        value: Value,
    ) -> Result<(), Interrupt> {
        match receiver {
            Value::Instance(obj) => {
                obj.write_field(index, value);
                Ok(())
            }
            Value::Class(class) => {
                class.borrow().set_class_field(index, value);
                Ok(())
            }
            _ => Err(Interrupt::fatal("field store on a receiver without fields")),
        }
    }

    fn context_frame(&self, frame: &Rc<Frame>, level: u8) -> Result<Rc<Frame>, Interrupt> {
        Frame::context_at(frame, level)
            .ok_or_else(|| Interrupt::fatal("context level without an enclosing activation"))
    }

    fn literal(&self, method: &Rc<Method>, index: u8) -> Result<Value, Interrupt> {
        method
            .body
            .literals
            .get(index as usize)
            .cloned()
            .ok_or_else(|| Interrupt::fatal("literal index out of range"))
    }

    fn selector_literal(&self, method: &Rc<Method>, index: u8) -> Result<SymbolId, Interrupt> {
        match self.literal(method, index)? {
            Value::Symbol(sym) => Ok(sym),
            _ => Err(Interrupt::fatal("selector literal is not a symbol")),
        }
    }

    fn pop(&self, frame: &Rc<Frame>) -> Result<Value, Interrupt> {
        frame
            .pop()
            .ok_or_else(|| Interrupt::fatal("operand stack underflow"))
    }

    fn top(&self, frame: &Rc<Frame>) -> Result<Value, Interrupt> {
        frame
            .top()
            .ok_or_else(|| Interrupt::fatal("operand stack underflow"))
    }

    fn pop_args(&self, frame: &Rc<Frame>, argc: usize) -> Result<Vec<Value>, Interrupt> {
        frame
            .pop_n(argc)
            .ok_or_else(|| Interrupt::fatal("operand stack underflow"))
    }
}

impl VmContext for Interpreter {
    fn intern(&mut self, text: &str) -> SymbolId {
        self.universe.intern(text)
    }

    fn symbol_text(&self, id: SymbolId) -> Rc<str> {
        self.universe.symbol_text(id)
    }

    fn core(&self) -> &CoreClasses {
        self.universe.core()
    }

    fn global(&self, name: SymbolId) -> Option<Value> {
        self.universe.global(name)
    }

    fn set_global(&mut self, name: SymbolId, value: Value) {
        self.universe.set_global(name, value);
    }

    fn load_class(&mut self, name: SymbolId) -> Result<SomRef<Class>, RuntimeError> {
        self.universe.load_class(name)
    }

    fn invoke(
        &mut self,
        invokable: &Rc<Invokable>,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        self.call_invokable(invokable, receiver, args)
    }

    fn invoke_block(&mut self, block: &Rc<Block>, args: Vec<Value>) -> Result<Value, Interrupt> {
        self.call_block(block, args)
    }

    fn dispatch(
        &mut self,
        selector: SymbolId,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        self.full_dispatch(selector, receiver, args)
    }

    fn ticks(&self) -> u64 {
        self.universe.ticks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_model::{CallCache, MethodBody};

    fn universe() -> Universe {
        Universe::new(vec![])
    }

    // A method whose body just returns the given constant.
    fn constant_method(interner_sym: SymbolId, value: Value) -> Rc<Method> {
        Rc::new(Method::new(
            interner_sym,
            MethodBody {
                code: vec![
                    Opcode::PushConstant { literal: 0 },
                    Opcode::ReturnLocal,
                ],
                literals: vec![value],
                num_args: 0,
                num_locals: 0,
                num_caches: 0,
                max_stack: 1,
            },
        ))
    }

    #[test]
    fn test_execute_constant_return() {
        let mut interp = Interpreter::new(universe());
        let sym = interp.universe_mut().intern("answer");
        let method = constant_method(sym, Value::Integer(42));
        let inv = Rc::new(Invokable::Method(method));
        let result = interp
            .call_invokable(&inv, Value::Nil, vec![])
            .expect("runs");
        assert_eq!(result, Value::Integer(42));
    }

    #[test]
    fn test_dispatch_walks_superclass_chain() {
        let mut interp = Interpreter::new(universe());
        let sym = interp.universe_mut().intern("inherited");
        let method = constant_method(sym, Value::Integer(7));
        let object = interp.universe().core().object_class.clone();
        Class::install(&object, sym, Rc::new(Invokable::Method(method)));

        // Integers inherit from Object.
        let result = interp
            .full_dispatch(sym, Value::Integer(1), vec![])
            .expect("dispatches");
        assert_eq!(result, Value::Integer(7));
    }

    #[test]
    fn test_send_cached_transitions_to_monomorphic() {
        let mut interp = Interpreter::new(universe());
        let sym = interp.universe_mut().intern("probe");
        let target = constant_method(sym, Value::Integer(1));
        let object = interp.universe().core().object_class.clone();
        Class::install(&object, sym, Rc::new(Invokable::Method(target)));

        // A sender with one send site.
        let sender = Rc::new(Method::new(
            sym,
            MethodBody {
                code: vec![],
                literals: vec![Value::Symbol(sym)],
                num_args: 0,
                num_locals: 0,
                num_caches: 1,
                max_stack: 2,
            },
        ));
        assert!(matches!(sender.cache(0), CallCache::Uninitialized));
        let result = interp
            .send_cached(&sender, 0, sym, Value::Integer(3), vec![])
            .expect("sends");
        assert_eq!(result, Value::Integer(1));
        assert!(matches!(sender.cache(0), CallCache::Monomorphic { .. }));

        // Same class hits the cache; a second class goes polymorphic.
        interp
            .send_cached(&sender, 0, sym, Value::Integer(4), vec![])
            .expect("sends");
        assert!(matches!(sender.cache(0), CallCache::Monomorphic { .. }));
        interp
            .send_cached(&sender, 0, sym, Value::Double(1.0), vec![])
            .expect("sends");
        assert!(matches!(sender.cache(0), CallCache::Polymorphic { .. }));
    }

    #[test]
    fn test_missing_dnu_handler_is_fatal() {
        let mut interp = Interpreter::new(universe());
        let sym = interp.universe_mut().intern("definitelyMissing");
        let err = interp
            .full_dispatch(sym, Value::Integer(1), vec![])
            .unwrap_err();
        match err {
            Interrupt::Error(e) => assert!(e.is_fatal()),
            other => panic!("expected a fatal error, got {:?}", other),
        }
    }

    #[test]
    fn test_dnu_receives_selector_and_arguments() {
        let mut interp = Interpreter::new(universe());
        let missing = interp.universe_mut().intern("nope:nope:");
        let dnu = interp.universe().selectors().does_not_understand;

        // A handler that answers its arguments array.
        let handler = Rc::new(Method::new(
            dnu,
            MethodBody {
                code: vec![
                    Opcode::PushArgument { index: 2, context: 0 },
                    Opcode::ReturnLocal,
                ],
                literals: vec![],
                num_args: 2,
                num_locals: 0,
                num_caches: 0,
                max_stack: 1,
            },
        ));
        let object = interp.universe().core().object_class.clone();
        Class::install(&object, dnu, Rc::new(Invokable::Method(handler)));

        let result = interp
            .full_dispatch(
                missing,
                Value::Integer(9),
                vec![Value::Integer(1), Value::Str(Rc::new("two".to_string()))],
            )
            .expect("recovers through DNU");
        let Value::Array(arr) = result else {
            panic!("expected the arguments array back");
        };
        assert_eq!(arr.size(), 2);
        assert_eq!(arr.get_indexable(0), Some(Value::Integer(1)));
        assert_eq!(
            arr.get_indexable(1),
            Some(Value::Str(Rc::new("two".to_string())))
        );
    }

    #[test]
    fn test_quickened_add_overflow_promotes() {
        let mut interp = Interpreter::new(universe());
        let sym = interp.universe_mut().intern("m");
        let method = Rc::new(Method::new(
            sym,
            MethodBody {
                code: vec![
                    Opcode::PushConstant { literal: 0 },
                    Opcode::PushConstant { literal: 1 },
                    Opcode::Add,
                    Opcode::ReturnLocal,
                ],
                literals: vec![Value::Integer(i64::MAX), Value::Integer(1)],
                num_args: 0,
                num_locals: 0,
                num_caches: 0,
                max_stack: 2,
            },
        ));
        let inv = Rc::new(Invokable::Method(method));
        let result = interp
            .call_invokable(&inv, Value::Nil, vec![])
            .expect("runs");
        let expected = BigInt::from(i64::MAX) + 1;
        assert_eq!(result, Value::BigInteger(Rc::new(expected)));
    }

    #[test]
    fn test_run_program_without_run_method_errors() {
        let mut interp = Interpreter::new(universe());
        let class = interp
            .universe_mut()
            .load_class_from_source("Quiet = ( )")
            .expect("compiles");
        // No DNU handler installed in the bare universe, so the missing
        // `run` surfaces as the bootstrap-corruption fatal.
        let err = interp.run_program(class, vec![]).unwrap_err();
        assert!(matches!(err, Interrupt::Error(e) if e.is_fatal()));
    }

    #[test]
    fn test_block_arity_mismatch() {
        let mut interp = Interpreter::new(universe());
        let sym = interp.universe_mut().intern("value");
        let block_method = constant_method(sym, Value::Nil);
        // A block needs a frame to capture; fake a home activation.
        let home = Frame::allocate(
            constant_method(sym, Value::Nil),
            Value::Nil,
            vec![Value::Nil],
            None,
        );
        let block = Rc::new(Block::new(block_method, home));
        let err = interp
            .call_block(&block, vec![Value::Integer(1)])
            .unwrap_err();
        assert!(matches!(
            err,
            Interrupt::Error(e) if e.kind == core_types::RuntimeErrorKind::InvalidArgument
        ));
    }
}
