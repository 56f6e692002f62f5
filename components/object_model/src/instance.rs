//! Instances of user-defined classes and their adaptive field storage.
//!
//! An instance points at its class, at the layout currently describing
//! its storage, and at the storage itself. Reads and writes go through
//! the layout's per-field locations; a write that does not fit the
//! current location transitions the layout and migrates the instance
//! before retrying, so the retry is guaranteed to succeed.

use crate::layout::{FieldLocation, ObjectLayout, PRIM_INLINE_SLOTS, PTR_INLINE_SLOTS};
use crate::{Class, SomRef, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The concrete field storage of one instance.
///
/// Primitive slots hold raw `i64` bit patterns (doubles via `to_bits`)
/// with an is-set bitmask; pointer slots hold boxed values. The first few
/// slots of each store are inline; extension arrays are allocated only
/// for layouts that exceed the inline capacity.
#[derive(Debug)]
struct FieldStorage {
    prim_inline: [i64; PRIM_INLINE_SLOTS],
    ptr_inline: [Value; PTR_INLINE_SLOTS],
    prim_ext: Vec<i64>,
    ptr_ext: Vec<Value>,
    prim_set: u64,
}

impl FieldStorage {
    fn new(layout: &ObjectLayout) -> Self {
        Self {
            prim_inline: [0; PRIM_INLINE_SLOTS],
            ptr_inline: std::array::from_fn(|_| Value::Nil),
            prim_ext: vec![0; layout.prim_slots().saturating_sub(PRIM_INLINE_SLOTS)],
            ptr_ext: vec![Value::Nil; layout.ptr_slots().saturating_sub(PTR_INLINE_SLOTS)],
            prim_set: 0,
        }
    }

    fn prim_is_set(&self, slot: usize) -> bool {
        self.prim_set & (1 << slot) != 0
    }

    fn read_prim(&self, slot: usize) -> Option<i64> {
        if !self.prim_is_set(slot) {
            return None;
        }
        Some(if slot < PRIM_INLINE_SLOTS {
            self.prim_inline[slot]
        } else {
            self.prim_ext[slot - PRIM_INLINE_SLOTS]
        })
    }

    fn write_prim(&mut self, slot: usize, bits: i64) {
        if slot < PRIM_INLINE_SLOTS {
            self.prim_inline[slot] = bits;
        } else {
            self.prim_ext[slot - PRIM_INLINE_SLOTS] = bits;
        }
        self.prim_set |= 1 << slot;
    }

    fn clear_prim(&mut self, slot: usize) {
        self.prim_set &= !(1 << slot);
    }

    fn read_ptr(&self, slot: usize) -> Value {
        if slot < PTR_INLINE_SLOTS {
            self.ptr_inline[slot].clone()
        } else {
            self.ptr_ext[slot - PTR_INLINE_SLOTS].clone()
        }
    }

    fn write_ptr(&mut self, slot: usize, value: Value) {
        if slot < PTR_INLINE_SLOTS {
            self.ptr_inline[slot] = value;
        } else {
            self.ptr_ext[slot - PTR_INLINE_SLOTS] = value;
        }
    }
}

/// An instance of a user-defined class.
pub struct Instance {
    class: SomRef<Class>,
    layout: RefCell<Rc<ObjectLayout>>,
    fields: RefCell<FieldStorage>,
}

impl Instance {
    /// Create an instance of `class` with every field unwritten.
    pub fn new(class: SomRef<Class>) -> Self {
        let layout = class.borrow().instance_layout();
        let fields = RefCell::new(FieldStorage::new(&layout));
        Self {
            class,
            layout: RefCell::new(layout),
            fields,
        }
    }

    /// The class this is an instance of.
    pub fn class(&self) -> SomRef<Class> {
        self.class.clone()
    }

    /// The layout currently describing this instance's storage.
    ///
    /// Exposed for the layout-sharing identity check; ordinary access
    /// goes through [`Instance::read_field`] / [`Instance::write_field`].
    pub fn layout(&self) -> Rc<ObjectLayout> {
        self.layout.borrow().clone()
    }

    /// The location field `index` currently occupies.
    pub fn location_of(&self, index: usize) -> FieldLocation {
        self.layout.borrow().location(index)
    }

    /// Read field `index`; unwritten and cleared fields read as nil.
    pub fn read_field(&self, index: usize) -> Value {
        let layout = self.layout.borrow();
        let fields = self.fields.borrow();
        match layout.location(index) {
            FieldLocation::Unwritten => Value::Nil,
            FieldLocation::IntSlot(slot) => match fields.read_prim(slot) {
                Some(bits) => Value::Integer(bits),
                None => Value::Nil,
            },
            FieldLocation::DoubleSlot(slot) => match fields.read_prim(slot) {
                Some(bits) => Value::Double(f64::from_bits(bits as u64)),
                None => Value::Nil,
            },
            FieldLocation::PtrSlot(slot) => fields.read_ptr(slot),
        }
    }

    /// Write `value` to field `index`, transitioning and migrating the
    /// instance when the current location cannot hold the value's kind.
    pub fn write_field(&self, index: usize, value: Value) {
        loop {
            let layout = self.layout.borrow().clone();
            match layout.location(index) {
                FieldLocation::Unwritten => {
                    if value.is_nil() {
                        return;
                    }
                }
                FieldLocation::IntSlot(slot) => match value {
                    Value::Integer(n) => {
                        self.fields.borrow_mut().write_prim(slot, n);
                        return;
                    }
                    Value::Nil => {
                        self.fields.borrow_mut().clear_prim(slot);
                        return;
                    }
                    _ => {}
                },
                FieldLocation::DoubleSlot(slot) => match value {
                    Value::Double(d) => {
                        self.fields.borrow_mut().write_prim(slot, d.to_bits() as i64);
                        return;
                    }
                    Value::Nil => {
                        self.fields.borrow_mut().clear_prim(slot);
                        return;
                    }
                    _ => {}
                },
                FieldLocation::PtrSlot(slot) => {
                    self.fields.borrow_mut().write_ptr(slot, value);
                    return;
                }
            }
            // The location cannot hold this kind: transition the layout,
            // migrate, and retry (guaranteed to hit a matching arm).
            let next = layout.with_field(index, value.storage_kind());
            self.migrate(&layout, &next);
        }
    }

    fn migrate(&self, old: &Rc<ObjectLayout>, new: &Rc<ObjectLayout>) {
        let mut storage = FieldStorage::new(new);
        for index in 0..old.field_count() {
            let value = self.read_field(index);
            if value.is_nil() {
                continue;
            }
            match new.location(index) {
                FieldLocation::Unwritten => {}
                FieldLocation::IntSlot(slot) => {
                    if let Value::Integer(n) = value {
                        storage.write_prim(slot, n);
                    }
                }
                FieldLocation::DoubleSlot(slot) => {
                    if let Value::Double(d) = value {
                        storage.write_prim(slot, d.to_bits() as i64);
                    }
                }
                FieldLocation::PtrSlot(slot) => storage.write_ptr(slot, value),
            }
        }
        *self.fields.borrow_mut() = storage;
        *self.layout.borrow_mut() = new.clone();
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.borrow().name.0)
            .field("fields", &self.layout.borrow().field_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::som_ref;
    use core_types::SymbolId;

    fn test_class(fields: usize) -> SomRef<Class> {
        let names = (0..fields).map(|i| SymbolId(i as u32)).collect();
        som_ref(Class::new(SymbolId(1000), None, names))
    }

    #[test]
    fn test_unwritten_reads_nil() {
        let obj = Instance::new(test_class(3));
        for i in 0..3 {
            assert_eq!(obj.read_field(i), Value::Nil);
        }
    }

    #[test]
    fn test_round_trip_every_kind() {
        let obj = Instance::new(test_class(5));
        obj.write_field(0, Value::Integer(7));
        obj.write_field(1, Value::Double(2.5));
        obj.write_field(2, Value::Boolean(true));
        obj.write_field(3, Value::Str(Rc::new("hi".to_string())));
        obj.write_field(4, Value::Nil);

        assert_eq!(obj.read_field(0), Value::Integer(7));
        assert_eq!(obj.read_field(1), Value::Double(2.5));
        assert_eq!(obj.read_field(2), Value::Boolean(true));
        assert_eq!(obj.read_field(3), Value::Str(Rc::new("hi".to_string())));
        assert_eq!(obj.read_field(4), Value::Nil);
    }

    #[test]
    fn test_generalization_preserves_values() {
        let obj = Instance::new(test_class(2));
        obj.write_field(0, Value::Integer(1));
        obj.write_field(1, Value::Integer(2));
        // Conflicting write generalizes field 0 but must keep field 1.
        obj.write_field(0, Value::Str(Rc::new("now a string".to_string())));
        assert_eq!(
            obj.read_field(0),
            Value::Str(Rc::new("now a string".to_string()))
        );
        assert_eq!(obj.read_field(1), Value::Integer(2));
        assert!(matches!(obj.location_of(0), FieldLocation::PtrSlot(_)));
    }

    #[test]
    fn test_nil_clears_primitive_slot_without_transition() {
        let obj = Instance::new(test_class(1));
        obj.write_field(0, Value::Integer(9));
        let before = obj.layout();
        obj.write_field(0, Value::Nil);
        assert_eq!(obj.read_field(0), Value::Nil);
        assert!(Rc::ptr_eq(&before, &obj.layout()));
        // Re-writing an integer reuses the same slot and layout.
        obj.write_field(0, Value::Integer(10));
        assert_eq!(obj.read_field(0), Value::Integer(10));
        assert!(Rc::ptr_eq(&before, &obj.layout()));
    }

    #[test]
    fn test_layout_sharing_across_instances() {
        let class = test_class(2);
        let a = Instance::new(class.clone());
        let b = Instance::new(class);
        assert!(Rc::ptr_eq(&a.layout(), &b.layout()));

        a.write_field(0, Value::Integer(1));
        b.write_field(0, Value::Integer(99));
        assert!(Rc::ptr_eq(&a.layout(), &b.layout()));

        a.write_field(1, Value::Double(0.5));
        b.write_field(1, Value::Double(1.5));
        assert!(Rc::ptr_eq(&a.layout(), &b.layout()));
    }

    #[test]
    fn test_divergent_histories_distinct_layouts() {
        let class = test_class(1);
        let a = Instance::new(class.clone());
        let b = Instance::new(class);
        a.write_field(0, Value::Integer(1));
        b.write_field(0, Value::Double(1.0));
        assert!(!Rc::ptr_eq(&a.layout(), &b.layout()));
    }

    #[test]
    fn test_extension_slots_beyond_inline_capacity() {
        let count = PRIM_INLINE_SLOTS + PTR_INLINE_SLOTS + 4;
        let obj = Instance::new(test_class(count));
        for i in 0..count {
            obj.write_field(i, Value::Integer(i as i64));
        }
        for i in 0..count {
            assert_eq!(obj.read_field(i), Value::Integer(i as i64));
        }
    }
}
