//! Adaptive per-class field layouts.
//!
//! A layout maps every declared field index of a class to a concrete
//! storage location. Layouts are immutable once published: a write that
//! needs a new or more general location produces a *new* layout through
//! the transition table and the instance migrates to it. Instances of one
//! class that observe the same sequence of field-kind assignments walk the
//! same transition edges and therefore share the identical layout object,
//! which is what makes the identity fast path on every field access valid.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Number of primitive (unboxed) slots stored directly in an instance.
pub const PRIM_INLINE_SLOTS: usize = 5;

/// Number of pointer slots stored directly in an instance.
pub const PTR_INLINE_SLOTS: usize = 5;

/// The specialization a field location can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Unboxed `i64`
    Integer,
    /// Unboxed `f64` bit pattern
    Double,
    /// Boxed value pointer
    Object,
}

/// Where one field of an instance lives.
///
/// Slot numbers below the inline capacity address the instance's inline
/// storage; numbers at or above it address the lazily allocated extension
/// array for the respective store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLocation {
    /// Never written; always reads as nil
    Unwritten,
    /// Unboxed integer slot in the primitive store
    IntSlot(usize),
    /// Unboxed double slot in the primitive store
    DoubleSlot(usize),
    /// Boxed slot in the pointer store
    PtrSlot(usize),
}

/// The layout of all instances currently sharing one field-type history.
///
/// Compared by identity (`Rc::ptr_eq`) for the storage-validity fast
/// path. Replaced, never mutated; the transition table is the only
/// interior-mutable part and only grows.
#[derive(Debug)]
pub struct ObjectLayout {
    field_count: usize,
    locations: Vec<FieldLocation>,
    prim_slots: usize,
    ptr_slots: usize,
    transitions: RefCell<HashMap<(usize, StorageKind), Rc<ObjectLayout>>>,
}

impl ObjectLayout {
    /// The empty layout for a class with `field_count` declared fields:
    /// every field unwritten, no storage allocated.
    pub fn empty(field_count: usize) -> Rc<Self> {
        Rc::new(Self {
            field_count,
            locations: vec![FieldLocation::Unwritten; field_count],
            prim_slots: 0,
            ptr_slots: 0,
            transitions: RefCell::new(HashMap::new()),
        })
    }

    /// Number of declared fields this layout covers.
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// The location assigned to field `index`.
    pub fn location(&self, index: usize) -> FieldLocation {
        self.locations[index]
    }

    /// Total primitive slots allocated by this layout.
    pub fn prim_slots(&self) -> usize {
        self.prim_slots
    }

    /// Total pointer slots allocated by this layout.
    pub fn ptr_slots(&self) -> usize {
        self.ptr_slots
    }

    /// The layout reached by typing `index` for `kind`.
    ///
    /// An untyped field becomes a slot of `kind`; a field already typed
    /// differently generalizes to the pointer representation. Transitions
    /// are interned per layout, so repeated identical histories converge
    /// on the identical (`Rc::ptr_eq`) successor.
    pub fn with_field(self: &Rc<Self>, index: usize, kind: StorageKind) -> Rc<Self> {
        debug_assert!(index < self.field_count);
        if let Some(next) = self.transitions.borrow().get(&(index, kind)) {
            return next.clone();
        }

        let mut effective = match (self.locations[index], kind) {
            // First write to an untyped field specializes to the value's kind.
            (FieldLocation::Unwritten, k) => k,
            // Any conflict generalizes to the pointer representation.
            _ => StorageKind::Object,
        };
        // The is-set bitmask is one machine word wide; classes with more
        // primitive-typed fields than that fall back to pointer slots.
        if effective != StorageKind::Object && self.prim_slots >= 64 {
            effective = StorageKind::Object;
        }

        let mut locations = self.locations.clone();
        let mut prim_slots = self.prim_slots;
        let mut ptr_slots = self.ptr_slots;
        locations[index] = match effective {
            StorageKind::Integer => {
                let slot = prim_slots;
                prim_slots += 1;
                FieldLocation::IntSlot(slot)
            }
            StorageKind::Double => {
                let slot = prim_slots;
                prim_slots += 1;
                FieldLocation::DoubleSlot(slot)
            }
            StorageKind::Object => {
                let slot = ptr_slots;
                ptr_slots += 1;
                FieldLocation::PtrSlot(slot)
            }
        };

        log::trace!(
            "layout transition: field {} -> {:?} ({} prim / {} ptr slots)",
            index,
            effective,
            prim_slots,
            ptr_slots
        );

        let next = Rc::new(Self {
            field_count: self.field_count,
            locations,
            prim_slots,
            ptr_slots,
            transitions: RefCell::new(HashMap::new()),
        });
        self.transitions
            .borrow_mut()
            .insert((index, kind), next.clone());
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_layout() {
        let layout = ObjectLayout::empty(3);
        assert_eq!(layout.field_count(), 3);
        for i in 0..3 {
            assert_eq!(layout.location(i), FieldLocation::Unwritten);
        }
        assert_eq!(layout.prim_slots(), 0);
        assert_eq!(layout.ptr_slots(), 0);
    }

    #[test]
    fn test_specializing_transition() {
        let layout = ObjectLayout::empty(2);
        let with_int = layout.with_field(0, StorageKind::Integer);
        assert_eq!(with_int.location(0), FieldLocation::IntSlot(0));
        assert_eq!(with_int.location(1), FieldLocation::Unwritten);
        assert_eq!(with_int.prim_slots(), 1);

        let with_both = with_int.with_field(1, StorageKind::Object);
        assert_eq!(with_both.location(0), FieldLocation::IntSlot(0));
        assert_eq!(with_both.location(1), FieldLocation::PtrSlot(0));
    }

    #[test]
    fn test_transitions_are_interned() {
        let layout = ObjectLayout::empty(1);
        let a = layout.with_field(0, StorageKind::Integer);
        let b = layout.with_field(0, StorageKind::Integer);
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_conflict_generalizes_to_pointer() {
        let layout = ObjectLayout::empty(1);
        let as_int = layout.with_field(0, StorageKind::Integer);
        let general = as_int.with_field(0, StorageKind::Double);
        assert_eq!(general.location(0), FieldLocation::PtrSlot(0));
    }

    #[test]
    fn test_double_slot_allocation() {
        let layout = ObjectLayout::empty(2);
        let a = layout.with_field(0, StorageKind::Double);
        assert_eq!(a.location(0), FieldLocation::DoubleSlot(0));
        let b = a.with_field(1, StorageKind::Integer);
        assert_eq!(b.location(1), FieldLocation::IntSlot(1));
        assert_eq!(b.prim_slots(), 2);
    }
}
