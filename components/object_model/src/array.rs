//! Strategy-switching array storage.
//!
//! An array's backing store adapts to its contents: all-nil arrays store
//! only a length, homogeneous arrays store unboxed elements, and arrays
//! that mix nils into one primitive kind track the type seen so far.
//! Writes that violate the current strategy widen it, always preserving
//! the existing elements; the visible length changes only through
//! explicit grow operations.

use crate::Value;
use std::cell::RefCell;
use std::fmt;

/// Element kinds an array strategy can specialize on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElemKind {
    Integer,
    Double,
    Boolean,
    Object,
}

impl ElemKind {
    fn of(value: &Value) -> Option<ElemKind> {
        match value {
            Value::Nil => None,
            Value::Integer(_) => Some(ElemKind::Integer),
            Value::Double(_) => Some(ElemKind::Double),
            Value::Boolean(_) => Some(ElemKind::Boolean),
            _ => Some(ElemKind::Object),
        }
    }
}

/// The backing store of an array.
#[derive(Debug, Clone)]
pub enum ArrayStorage {
    /// All elements nil; only the length is stored
    Empty {
        /// Visible element count
        length: usize,
    },
    /// Homogeneous unboxed integers
    Integers(Vec<i64>),
    /// Homogeneous unboxed doubles
    Doubles(Vec<f64>),
    /// Homogeneous booleans
    Booleans(Vec<bool>),
    /// Boxed values, the fully general representation
    Objects(Vec<Value>),
    /// One primitive kind mixed with nils; collapses to the homogeneous
    /// representation when the last nil is overwritten
    PartiallyEmpty {
        /// Elements, nil holes included
        values: Vec<Value>,
        /// Number of nil holes remaining
        empty_count: usize,
        /// The primitive kind observed so far
        kind_so_far: ElemKindTag,
    },
}

/// Public tag mirroring the primitive kinds `PartiallyEmpty` can track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemKindTag {
    /// Integers plus nils
    Integer,
    /// Doubles plus nils
    Double,
    /// Booleans plus nils
    Boolean,
}

impl ElemKindTag {
    fn matches(&self, kind: ElemKind) -> bool {
        matches!(
            (self, kind),
            (ElemKindTag::Integer, ElemKind::Integer)
                | (ElemKindTag::Double, ElemKind::Double)
                | (ElemKindTag::Boolean, ElemKind::Boolean)
        )
    }

    fn from_kind(kind: ElemKind) -> Option<ElemKindTag> {
        match kind {
            ElemKind::Integer => Some(ElemKindTag::Integer),
            ElemKind::Double => Some(ElemKindTag::Double),
            ElemKind::Boolean => Some(ElemKindTag::Boolean),
            ElemKind::Object => None,
        }
    }
}

/// An array object: identity plus adaptive storage.
pub struct ArrayObj {
    storage: RefCell<ArrayStorage>,
}

impl ArrayObj {
    /// A fresh all-nil array of `length` elements.
    pub fn with_length(length: usize) -> Self {
        Self {
            storage: RefCell::new(ArrayStorage::Empty { length }),
        }
    }

    /// Build an array from boxed values, choosing the cheapest strategy
    /// that holds them.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            storage: RefCell::new(Self::best_storage(values)),
        }
    }

    fn best_storage(values: Vec<Value>) -> ArrayStorage {
        let mut kind: Option<ElemKind> = None;
        let mut nils = 0usize;
        for value in &values {
            match ElemKind::of(value) {
                None => nils += 1,
                Some(k) => match kind {
                    None => kind = Some(k),
                    Some(existing) if existing == k => {}
                    Some(_) => kind = Some(ElemKind::Object),
                },
            }
        }
        match (kind, nils) {
            (None, _) => ArrayStorage::Empty { length: values.len() },
            (Some(ElemKind::Object), _) => ArrayStorage::Objects(values),
            (Some(k), 0) => match k {
                ElemKind::Integer => ArrayStorage::Integers(
                    values
                        .iter()
                        .map(|v| match v {
                            Value::Integer(n) => *n,
                            _ => unreachable!("scanned as homogeneous integers"),
                        })
                        .collect(),
                ),
                ElemKind::Double => ArrayStorage::Doubles(
                    values
                        .iter()
                        .map(|v| match v {
                            Value::Double(d) => *d,
                            _ => unreachable!("scanned as homogeneous doubles"),
                        })
                        .collect(),
                ),
                ElemKind::Boolean => ArrayStorage::Booleans(
                    values
                        .iter()
                        .map(|v| match v {
                            Value::Boolean(b) => *b,
                            _ => unreachable!("scanned as homogeneous booleans"),
                        })
                        .collect(),
                ),
                ElemKind::Object => unreachable!(),
            },
            (Some(k), empty_count) => match ElemKindTag::from_kind(k) {
                Some(tag) => ArrayStorage::PartiallyEmpty {
                    values,
                    empty_count,
                    kind_so_far: tag,
                },
                None => ArrayStorage::Objects(values),
            },
        }
    }

    /// Visible element count.
    pub fn size(&self) -> usize {
        match &*self.storage.borrow() {
            ArrayStorage::Empty { length } => *length,
            ArrayStorage::Integers(v) => v.len(),
            ArrayStorage::Doubles(v) => v.len(),
            ArrayStorage::Booleans(v) => v.len(),
            ArrayStorage::Objects(v) => v.len(),
            ArrayStorage::PartiallyEmpty { values, .. } => values.len(),
        }
    }

    /// Read element `index` (0-based); `None` when out of bounds.
    pub fn get_indexable(&self, index: usize) -> Option<Value> {
        if index >= self.size() {
            return None;
        }
        Some(match &*self.storage.borrow() {
            ArrayStorage::Empty { .. } => Value::Nil,
            ArrayStorage::Integers(v) => Value::Integer(v[index]),
            ArrayStorage::Doubles(v) => Value::Double(v[index]),
            ArrayStorage::Booleans(v) => Value::Boolean(v[index]),
            ArrayStorage::Objects(v) => v[index].clone(),
            ArrayStorage::PartiallyEmpty { values, .. } => values[index].clone(),
        })
    }

    /// Write element `index` (0-based), widening the strategy if the
    /// value does not fit it. Returns false when out of bounds.
    pub fn set_indexable(&self, index: usize, value: Value) -> bool {
        if index >= self.size() {
            return false;
        }
        let mut storage = self.storage.borrow_mut();
        let next = Self::store(&mut storage, index, value);
        if let Some(next) = next {
            *storage = next;
        }
        true
    }

    // Applies the write in place when possible, or returns the widened
    // replacement storage.
    fn store(storage: &mut ArrayStorage, index: usize, value: Value) -> Option<ArrayStorage> {
        match storage {
            ArrayStorage::Empty { length } => {
                let kind = ElemKind::of(&value)?;
                let length = *length;
                if length == 1 {
                    return Some(Self::best_storage(vec![value]));
                }
                let mut values = vec![Value::Nil; length];
                values[index] = value;
                Some(match ElemKindTag::from_kind(kind) {
                    Some(tag) => ArrayStorage::PartiallyEmpty {
                        values,
                        empty_count: length - 1,
                        kind_so_far: tag,
                    },
                    None => ArrayStorage::Objects(values),
                })
            }
            ArrayStorage::Integers(v) => match value {
                Value::Integer(n) => {
                    v[index] = n;
                    None
                }
                other => Some(Self::widen_homogeneous(
                    v.iter().map(|n| Value::Integer(*n)).collect(),
                    index,
                    other,
                )),
            },
            ArrayStorage::Doubles(v) => match value {
                Value::Double(d) => {
                    v[index] = d;
                    None
                }
                other => Some(Self::widen_homogeneous(
                    v.iter().map(|d| Value::Double(*d)).collect(),
                    index,
                    other,
                )),
            },
            ArrayStorage::Booleans(v) => match value {
                Value::Boolean(b) => {
                    v[index] = b;
                    None
                }
                other => Some(Self::widen_homogeneous(
                    v.iter().map(|b| Value::Boolean(*b)).collect(),
                    index,
                    other,
                )),
            },
            ArrayStorage::Objects(v) => {
                v[index] = value;
                None
            }
            ArrayStorage::PartiallyEmpty {
                values,
                empty_count,
                kind_so_far,
            } => {
                match ElemKind::of(&value) {
                    None => {
                        if !values[index].is_nil() {
                            *empty_count += 1;
                        }
                        values[index] = Value::Nil;
                        None
                    }
                    Some(kind) if kind_so_far.matches(kind) => {
                        if values[index].is_nil() {
                            *empty_count -= 1;
                        }
                        values[index] = value;
                        if *empty_count == 0 {
                            // Last hole filled; collapse to the
                            // homogeneous representation.
                            Some(Self::best_storage(std::mem::take(values)))
                        } else {
                            None
                        }
                    }
                    Some(_) => {
                        let mut values = std::mem::take(values);
                        values[index] = value;
                        Some(ArrayStorage::Objects(values))
                    }
                }
            }
        }
    }

    fn widen_homogeneous(mut values: Vec<Value>, index: usize, value: Value) -> ArrayStorage {
        if value.is_nil() {
            let empty_count = 1;
            let kind_so_far = values
                .first()
                .and_then(ElemKind::of)
                .and_then(ElemKindTag::from_kind);
            values[index] = Value::Nil;
            match kind_so_far {
                Some(tag) => ArrayStorage::PartiallyEmpty {
                    values,
                    empty_count,
                    kind_so_far: tag,
                },
                None => ArrayStorage::Objects(values),
            }
        } else {
            values[index] = value;
            ArrayStorage::Objects(values)
        }
    }

    /// Boxed snapshot of all elements.
    pub fn to_values(&self) -> Vec<Value> {
        (0..self.size())
            .map(|i| self.get_indexable(i).unwrap_or(Value::Nil))
            .collect()
    }

    /// A fresh array with the same contents and strategy.
    pub fn copy(&self) -> ArrayObj {
        ArrayObj {
            storage: RefCell::new(self.storage.borrow().clone()),
        }
    }

    /// A fresh array one element longer, ending with `value`.
    pub fn copy_extended_with(&self, value: Value) -> ArrayObj {
        let mut values = self.to_values();
        values.push(value);
        ArrayObj::from_values(values)
    }

    /// Name of the current strategy, for diagnostics and tests.
    pub fn strategy_name(&self) -> &'static str {
        match &*self.storage.borrow() {
            ArrayStorage::Empty { .. } => "empty",
            ArrayStorage::Integers(_) => "integers",
            ArrayStorage::Doubles(_) => "doubles",
            ArrayStorage::Booleans(_) => "booleans",
            ArrayStorage::Objects(_) => "objects",
            ArrayStorage::PartiallyEmpty { .. } => "partially-empty",
        }
    }
}

impl fmt::Debug for ArrayObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayObj")
            .field("size", &self.size())
            .field("strategy", &self.strategy_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_empty_stays_empty_on_nil_writes() {
        let arr = ArrayObj::with_length(3);
        assert!(arr.set_indexable(1, Value::Nil));
        assert_eq!(arr.strategy_name(), "empty");
        assert_eq!(arr.size(), 3);
        assert_eq!(arr.get_indexable(1), Some(Value::Nil));
    }

    #[test]
    fn test_first_integer_write_materializes() {
        let arr = ArrayObj::with_length(3);
        arr.set_indexable(0, Value::Integer(5));
        assert_eq!(arr.strategy_name(), "partially-empty");
        assert_eq!(arr.get_indexable(0), Some(Value::Integer(5)));
        assert_eq!(arr.get_indexable(1), Some(Value::Nil));
    }

    #[test]
    fn test_filling_all_holes_collapses_to_homogeneous() {
        let arr = ArrayObj::with_length(2);
        arr.set_indexable(0, Value::Integer(1));
        arr.set_indexable(1, Value::Integer(2));
        assert_eq!(arr.strategy_name(), "integers");
        assert_eq!(arr.get_indexable(0), Some(Value::Integer(1)));
        assert_eq!(arr.get_indexable(1), Some(Value::Integer(2)));
    }

    #[test]
    fn test_heterogeneous_write_widens_to_objects() {
        let arr = ArrayObj::from_values(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(arr.strategy_name(), "integers");
        arr.set_indexable(0, Value::Double(0.5));
        assert_eq!(arr.strategy_name(), "objects");
        assert_eq!(arr.get_indexable(0), Some(Value::Double(0.5)));
        assert_eq!(arr.get_indexable(1), Some(Value::Integer(2)));
    }

    #[test]
    fn test_nil_into_homogeneous_tracks_type_so_far() {
        let arr = ArrayObj::from_values(vec![Value::Boolean(true), Value::Boolean(false)]);
        assert_eq!(arr.strategy_name(), "booleans");
        arr.set_indexable(0, Value::Nil);
        assert_eq!(arr.strategy_name(), "partially-empty");
        assert_eq!(arr.get_indexable(0), Some(Value::Nil));
        assert_eq!(arr.get_indexable(1), Some(Value::Boolean(false)));
        // Refilling with the tracked kind collapses again.
        arr.set_indexable(0, Value::Boolean(true));
        assert_eq!(arr.strategy_name(), "booleans");
    }

    #[test]
    fn test_size_invariant_under_writes() {
        let arr = ArrayObj::with_length(4);
        for (i, v) in [
            Value::Integer(1),
            Value::Double(2.0),
            Value::Nil,
            Value::Str(Rc::new("x".to_string())),
        ]
        .into_iter()
        .enumerate()
        {
            arr.set_indexable(i, v);
            assert_eq!(arr.size(), 4);
        }
    }

    #[test]
    fn test_out_of_bounds() {
        let arr = ArrayObj::with_length(1);
        assert_eq!(arr.get_indexable(1), None);
        assert!(!arr.set_indexable(1, Value::Integer(1)));
    }

    #[test]
    fn test_copy_is_independent() {
        let arr = ArrayObj::from_values(vec![Value::Integer(1)]);
        let copy = arr.copy();
        copy.set_indexable(0, Value::Integer(9));
        assert_eq!(arr.get_indexable(0), Some(Value::Integer(1)));
        assert_eq!(copy.get_indexable(0), Some(Value::Integer(9)));
    }

    #[test]
    fn test_copy_extended_with() {
        let arr = ArrayObj::from_values(vec![Value::Integer(1), Value::Integer(2)]);
        let longer = arr.copy_extended_with(Value::Integer(3));
        assert_eq!(longer.size(), 3);
        assert_eq!(longer.strategy_name(), "integers");
        assert_eq!(longer.get_indexable(2), Some(Value::Integer(3)));
        assert_eq!(arr.size(), 2);
    }

    #[test]
    fn test_single_element_empty_write() {
        let arr = ArrayObj::with_length(1);
        arr.set_indexable(0, Value::Integer(7));
        assert_eq!(arr.strategy_name(), "integers");
    }
}
