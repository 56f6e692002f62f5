//! The dispatch engine: selector resolution, inline caches, DNU.
//!
//! Caching lives at the call site, not here: `send_cached` consults and
//! advances the sending method's cache slot, everything below it is plain
//! superclass-chain lookup. A failed lookup synthesizes a
//! `doesNotUnderstand:arguments:` send through the same machinery; if
//! that selector is missing too, the image is corrupt and the error is
//! fatal.

use crate::machine::Interpreter;
use core_types::{RuntimeErrorKind, SymbolId};
use object_model::{
    ArrayObj, Block, CallCache, Class, Frame, Interrupt, Invokable, Method, SomRef, Value,
    VmContext,
};
use std::rc::Rc;

/// Upper bound on interpreter re-entrancy; beyond it the user program is
/// assumed to be stuck in unbounded recursion.
const MAX_CALL_DEPTH: usize = 8192;

impl Interpreter {
    /// Send through a call-site cache slot of `method`.
    pub(crate) fn send_cached(
        &mut self,
        method: &Rc<Method>,
        cache_slot: u16,
        selector: SymbolId,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        let class = self.class_of(&receiver);
        let cache = method.cache(cache_slot as usize);

        if let Some(target) = cache.lookup(&class) {
            return self.call_invokable(&target, receiver, args);
        }
        if cache.is_megamorphic() {
            return self.lookup_and_invoke(selector, receiver, args, &class);
        }

        let resolved = class.borrow().lookup_method(selector);
        match resolved {
            Some(target) => {
                let mut cache = cache;
                cache.record(class.clone(), target.clone());
                method.set_cache(cache_slot as usize, cache);
                self.call_invokable(&target, receiver, args)
            }
            None => self.does_not_understand(selector, receiver, args),
        }
    }

    /// Super send: statically bound to the home method holder's
    /// superclass, pinned in the cache slot on first execution.
    pub(crate) fn super_send(
        &mut self,
        sending_method: &Rc<Method>,
        home_method: &Rc<Method>,
        cache_slot: u16,
        selector: SymbolId,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        if let CallCache::Monomorphic { target, .. } = sending_method.cache(cache_slot as usize)
        {
            return self.call_invokable(&target, receiver, args);
        }

        let holder = home_method.holder().ok_or_else(|| {
            Interrupt::fatal("super send from a method with no holder class")
        })?;
        let superclass = holder.borrow().superclass.clone().ok_or_else(|| {
            Interrupt::fatal("super send from the root of the class hierarchy")
        })?;
        let target = superclass
            .borrow()
            .lookup_method(selector)
            .ok_or_else(|| {
                // A super target is fixed by the class hierarchy; its
                // absence is a malformed image, not a DNU candidate.
                Interrupt::fatal(format!(
                    "malformed hierarchy: super send target '{}' not found",
                    self.universe().symbol_text(selector)
                ))
            })?;
        sending_method.set_cache(
            cache_slot as usize,
            CallCache::Monomorphic {
                class: superclass,
                target: target.clone(),
            },
        );
        self.call_invokable(&target, receiver, args)
    }

    /// Uncached dispatch against a known receiver class.
    pub(crate) fn lookup_and_invoke(
        &mut self,
        selector: SymbolId,
        receiver: Value,
        args: Vec<Value>,
        class: &SomRef<Class>,
    ) -> Result<Value, Interrupt> {
        let resolved = class.borrow().lookup_method(selector);
        match resolved {
            Some(target) => self.call_invokable(&target, receiver, args),
            None => self.does_not_understand(selector, receiver, args),
        }
    }

    /// Full dispatch: class of receiver, chain lookup, DNU fallback.
    pub(crate) fn full_dispatch(
        &mut self,
        selector: SymbolId,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        let class = self.class_of(&receiver);
        self.lookup_and_invoke(selector, receiver, args, &class)
    }

    /// Synthesize `doesNotUnderstand:arguments:` for a failed lookup.
    pub(crate) fn does_not_understand(
        &mut self,
        selector: SymbolId,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        let dnu = self.universe().selectors().does_not_understand;
        let class = self.class_of(&receiver);
        let handler = class.borrow().lookup_method(dnu);
        let handler = handler.ok_or_else(|| {
            Interrupt::fatal(
                "bootstrap corruption: Object>>doesNotUnderstand:arguments: is missing",
            )
        })?;
        let arguments = Value::Array(Rc::new(ArrayObj::from_values(args)));
        self.call_invokable(&handler, receiver, vec![Value::Symbol(selector), arguments])
    }

    /// Invoke a resolved method or primitive on `receiver`.
    pub(crate) fn call_invokable(
        &mut self,
        invokable: &Rc<Invokable>,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        match &**invokable {
            Invokable::Primitive(p) => {
                // Compiled sends always match, but `perform:` can hand a
                // primitive any argument list.
                let expected = core_types::selector_arity(&self.universe().symbol_text(p.signature));
                if args.len() != expected {
                    return Err(Interrupt::error(
                        RuntimeErrorKind::InvalidArgument,
                        format!(
                            "'{}' expects {} arguments, got {}",
                            self.universe().symbol_text(p.signature),
                            expected,
                            args.len()
                        ),
                    ));
                }
                (p.func)(p.as_ref(), self, receiver, args)
            }
            Invokable::Method(m) => {
                if args.len() != m.body.num_args {
                    return Err(Interrupt::error(
                        RuntimeErrorKind::InvalidArgument,
                        format!(
                            "'{}' expects {} arguments, got {}",
                            self.universe().symbol_text(m.signature),
                            m.body.num_args,
                            args.len()
                        ),
                    ));
                }
                let mut frame_args = Vec::with_capacity(args.len() + 1);
                frame_args.push(receiver.clone());
                frame_args.extend(args);
                self.activate(m.clone(), receiver, frame_args, None)
            }
        }
    }

    /// Activate a block closure.
    pub(crate) fn call_block(
        &mut self,
        block: &Rc<Block>,
        args: Vec<Value>,
    ) -> Result<Value, Interrupt> {
        if args.len() != block.num_args() {
            return Err(Interrupt::error(
                RuntimeErrorKind::InvalidArgument,
                format!(
                    "block expects {} arguments, got {}",
                    block.num_args(),
                    args.len()
                ),
            ));
        }
        let receiver = Value::Block(block.clone());
        let mut frame_args = Vec::with_capacity(args.len() + 1);
        frame_args.push(receiver.clone());
        frame_args.extend(args);
        self.activate(
            block.method.clone(),
            receiver,
            frame_args,
            Some(block.clone()),
        )
    }

    // Allocate the frame, run it, and consume a non-local return whose
    // target is this very frame. The marker flips on every exit path.
    fn activate(
        &mut self,
        method: Rc<Method>,
        receiver: Value,
        args: Vec<Value>,
        block: Option<Rc<Block>>,
    ) -> Result<Value, Interrupt> {
        if self.call_depth() >= MAX_CALL_DEPTH {
            return Err(Interrupt::error(
                RuntimeErrorKind::StackExhausted,
                "call stack exhausted",
            ));
        }
        let frame = Frame::allocate(method, receiver, args, block);
        self.enter_activation();
        let result = self.execute(&frame);
        self.leave_activation();
        frame.mark_returned();
        match result {
            Err(Interrupt::NonLocalReturn { value, target }) if Rc::ptr_eq(&target, &frame) => {
                Ok(value)
            }
            other => other,
        }
    }
}
