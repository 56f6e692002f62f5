//! Symbol interning.
//!
//! Selectors, globals-table keys and symbol literals are interned once and
//! compared by id afterwards. Two symbols with equal text are the same
//! [`SymbolId`] for the lifetime of the interner, so identity comparison
//! is text comparison.

use std::collections::HashMap;
use std::rc::Rc;

/// An interned symbol.
///
/// The id is an index into the owning [`Interner`]; equal text always
/// yields an equal id, so `==` on `SymbolId` is symbol identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// Symbol table mapping text to [`SymbolId`] and back.
///
/// Interning is O(1) average via a hash map keyed by text. Symbols are
/// never removed; the table lives as long as the runtime.
///
/// # Examples
///
/// ```
/// use core_types::Interner;
///
/// let mut interner = Interner::new();
/// let a = interner.intern("at:put:");
/// let b = interner.intern("at:put:");
/// assert_eq!(a, b);
/// assert_eq!(interner.lookup(a), "at:put:");
/// ```
#[derive(Debug, Default)]
pub struct Interner {
    ids: HashMap<Rc<str>, SymbolId>,
    texts: Vec<Rc<str>>,
}

impl Interner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            texts: Vec::new(),
        }
    }

    /// Intern `text`, returning the canonical id for it.
    ///
    /// Returns the existing id if the text was interned before.
    pub fn intern(&mut self, text: &str) -> SymbolId {
        if let Some(id) = self.ids.get(text) {
            return *id;
        }
        let id = SymbolId(self.texts.len() as u32);
        let shared: Rc<str> = Rc::from(text);
        self.texts.push(shared.clone());
        self.ids.insert(shared, id);
        id
    }

    /// Resolve an id back to its text.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this interner; ids never cross
    /// interner instances in practice.
    pub fn lookup(&self, id: SymbolId) -> &str {
        &self.texts[id.0 as usize]
    }

    /// Resolve an id to a shared handle on its text.
    pub fn lookup_rc(&self, id: SymbolId) -> Rc<str> {
        self.texts[id.0 as usize].clone()
    }

    /// Number of distinct symbols interned so far.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Whether no symbol has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Number of arguments a selector takes: one per keyword part, one for a
/// binary selector, zero for a unary one.
pub fn selector_arity(selector: &str) -> usize {
    let colons = selector.matches(':').count();
    if colons > 0 {
        colons
    } else if selector.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_arity() {
        assert_eq!(selector_arity("size"), 0);
        assert_eq!(selector_arity("+"), 1);
        assert_eq!(selector_arity("<="), 1);
        assert_eq!(selector_arity("at:"), 1);
        assert_eq!(selector_arity("at:put:"), 2);
    }

    #[test]
    fn test_intern_same_text_same_id() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_intern_distinct_text_distinct_id() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_lookup_round_trip() {
        let mut interner = Interner::new();
        let id = interner.intern("ifTrue:ifFalse:");
        assert_eq!(interner.lookup(id), "ifTrue:ifFalse:");
    }

    #[test]
    fn test_empty() {
        let interner = Interner::new();
        assert!(interner.is_empty());
    }
}
