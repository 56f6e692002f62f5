//! Class and metaclass objects.
//!
//! A class owns its name, superclass link, ordered instance-field names
//! (inherited fields first), and its method dictionary. Class-side
//! methods live on a parallel metaclass. Classes are immutable once
//! assembled except for the instance-layout cache, which evolves as
//! instances specialize their field storage.

use crate::layout::ObjectLayout;
use crate::{Invokable, SomRef, Value};
use core_types::SymbolId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A class object.
pub struct Class {
    /// Class name
    pub name: SymbolId,
    /// Superclass link; `None` only for the hierarchy root
    pub superclass: Option<SomRef<Class>>,
    /// Ordered instance-field names; a subclass's list strictly extends
    /// its superclass's
    pub field_names: Vec<SymbolId>,
    metaclass: RefCell<Option<SomRef<Class>>>,
    methods: RefCell<HashMap<SymbolId, Rc<Invokable>>>,
    base_layout: RefCell<Option<Rc<ObjectLayout>>>,
    // Class-side field values, indexed by the metaclass's field list.
    class_fields: RefCell<Vec<Value>>,
}

impl Class {
    /// Create a class with no methods installed yet.
    ///
    /// `field_names` must already include the inherited fields, in
    /// superclass order, before the class's own.
    pub fn new(
        name: SymbolId,
        superclass: Option<SomRef<Class>>,
        field_names: Vec<SymbolId>,
    ) -> Self {
        Self {
            name,
            superclass,
            field_names,
            metaclass: RefCell::new(None),
            methods: RefCell::new(HashMap::new()),
            base_layout: RefCell::new(None),
            class_fields: RefCell::new(Vec::new()),
        }
    }

    /// Read class-side field `index`; unwritten fields read as nil.
    pub fn class_field(&self, index: usize) -> Value {
        self.class_fields
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    /// Write class-side field `index`.
    pub fn set_class_field(&self, index: usize, value: Value) {
        let mut fields = self.class_fields.borrow_mut();
        if index >= fields.len() {
            fields.resize(index + 1, Value::Nil);
        }
        fields[index] = value;
    }

    /// The class-side class, if assembled.
    pub fn metaclass(&self) -> Option<SomRef<Class>> {
        self.metaclass.borrow().clone()
    }

    /// Attach the class-side class. Done once during assembly.
    pub fn set_metaclass(&self, metaclass: SomRef<Class>) {
        *self.metaclass.borrow_mut() = Some(metaclass);
    }

    /// Number of declared instance fields, inherited ones included.
    pub fn number_of_fields(&self) -> usize {
        self.field_names.len()
    }

    /// Declared index of the field named `name`, if any.
    pub fn field_index(&self, name: SymbolId) -> Option<usize> {
        self.field_names.iter().position(|f| *f == name)
    }

    /// Install `invokable` under `selector` and record the holder link.
    pub fn install(class: &SomRef<Class>, selector: SymbolId, invokable: Rc<Invokable>) {
        invokable.set_holder(class);
        class
            .borrow()
            .methods
            .borrow_mut()
            .insert(selector, invokable);
    }

    /// Look `selector` up on this class only, ignoring the superclass
    /// chain.
    pub fn lookup_local(&self, selector: SymbolId) -> Option<Rc<Invokable>> {
        self.methods.borrow().get(&selector).cloned()
    }

    /// Resolve `selector` by walking up the superclass chain.
    pub fn lookup_method(&self, selector: SymbolId) -> Option<Rc<Invokable>> {
        if let Some(found) = self.lookup_local(selector) {
            return Some(found);
        }
        let mut current = self.superclass.clone();
        while let Some(class) = current {
            let class = class.borrow();
            if let Some(found) = class.lookup_local(selector) {
                return Some(found);
            }
            current = class.superclass.clone();
        }
        None
    }

    /// The shared empty layout instances of this class start from.
    ///
    /// Created the first time the class instantiates; all transitions
    /// hang off it, so identical field-type histories converge.
    pub fn instance_layout(&self) -> Rc<ObjectLayout> {
        if let Some(layout) = self.base_layout.borrow().as_ref() {
            return layout.clone();
        }
        let layout = ObjectLayout::empty(self.field_names.len());
        *self.base_layout.borrow_mut() = Some(layout.clone());
        layout
    }

}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name.0)
            .field("fields", &self.field_names.len())
            .field("methods", &self.methods.borrow().len())
            .finish()
    }
}
