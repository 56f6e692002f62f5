//! The runtime universe: symbols, globals, core classes, class loading.
//!
//! Held once at process entry and passed by reference to everything that
//! needs it; there is no ambient global state. The bootstrap synthesizes
//! the core class skeletons (hierarchy and metaclass links only); their
//! primitive methods are installed afterwards by the primitive library.

use compiler::{compile_class, parse_class_source};
use core_types::{Interner, ParseError, RuntimeError, RuntimeErrorKind, SymbolId};
use object_model::{som_ref, Class, CoreClasses, Instance, SomRef, Value};
use thiserror::Error;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

/// Interned ids of the selectors the engine itself sends.
#[derive(Debug, Clone, Copy)]
pub struct Selectors {
    /// `+`
    pub plus: SymbolId,
    /// `-`
    pub minus: SymbolId,
    /// `*`
    pub star: SymbolId,
    /// `doesNotUnderstand:arguments:`
    pub does_not_understand: SymbolId,
    /// `escapedBlock:`
    pub escaped_block: SymbolId,
    /// `unknownGlobal:`
    pub unknown_global: SymbolId,
    /// `run:`
    pub run_with: SymbolId,
    /// `run`
    pub run: SymbolId,
}

/// Why loading a class from source failed.
///
/// Parse problems stay typed all the way to the driver; everything else
/// (an unresolvable superclass, an unreadable file) is a runtime error.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source did not parse
    #[error("{0}")]
    Parse(#[from] ParseError),
    /// Loading failed after parsing
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

impl From<LoadError> for RuntimeError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Parse(e) => {
                RuntimeError::new(RuntimeErrorKind::ParseFailed, e.to_string())
            }
            LoadError::Runtime(e) => e,
        }
    }
}

/// Process-lifetime runtime state.
pub struct Universe {
    interner: Interner,
    globals: HashMap<SymbolId, Value>,
    core: CoreClasses,
    selectors: Selectors,
    classpath: Vec<PathBuf>,
    loading: HashSet<SymbolId>,
    start: Instant,
}

impl Universe {
    /// Create a universe with the core class skeletons assembled and
    /// registered as globals.
    pub fn new(classpath: Vec<PathBuf>) -> Self {
        let mut interner = Interner::new();

        // Hierarchy roots first: Object, then the class machinery.
        let object_class = som_ref(Class::new(interner.intern("Object"), None, vec![]));
        let class_class = som_ref(Class::new(
            interner.intern("Class"),
            Some(object_class.clone()),
            vec![],
        ));
        let metaclass_class = som_ref(Class::new(
            interner.intern("Metaclass"),
            Some(class_class.clone()),
            vec![],
        ));
        let object_meta = som_ref(Class::new(
            interner.intern("Object class"),
            Some(class_class.clone()),
            vec![],
        ));
        object_class.borrow().set_metaclass(object_meta);

        let make = |name: &str, superclass: &SomRef<Class>, interner: &mut Interner| {
            let class = som_ref(Class::new(
                interner.intern(name),
                Some(superclass.clone()),
                vec![],
            ));
            let meta_super = superclass
                .borrow()
                .metaclass()
                .unwrap_or_else(|| class_class.clone());
            let metaclass = som_ref(Class::new(
                interner.intern(&format!("{} class", name)),
                Some(meta_super),
                vec![],
            ));
            class.borrow().set_metaclass(metaclass);
            class
        };

        // Metaclasses of the class machinery sit under `Object class`
        // like every other metaclass.
        let class_meta = som_ref(Class::new(
            interner.intern("Class class"),
            object_class.borrow().metaclass(),
            vec![],
        ));
        class_class.borrow().set_metaclass(class_meta.clone());
        let metaclass_meta = som_ref(Class::new(
            interner.intern("Metaclass class"),
            Some(class_meta),
            vec![],
        ));
        metaclass_class.borrow().set_metaclass(metaclass_meta);

        let nil_class = make("Nil", &object_class, &mut interner);
        let boolean_class = make("Boolean", &object_class, &mut interner);
        let true_class = make("True", &boolean_class, &mut interner);
        let false_class = make("False", &boolean_class, &mut interner);
        let integer_class = make("Integer", &object_class, &mut interner);
        let double_class = make("Double", &object_class, &mut interner);
        let string_class = make("String", &object_class, &mut interner);
        let symbol_class = make("Symbol", &string_class, &mut interner);
        let array_class = make("Array", &object_class, &mut interner);
        let block_class = make("Block", &object_class, &mut interner);
        let method_class = make("Method", &object_class, &mut interner);
        let primitive_class = make("Primitive", &object_class, &mut interner);
        let system_class = make("System", &object_class, &mut interner);

        let core = CoreClasses {
            object_class,
            class_class,
            metaclass_class,
            nil_class,
            boolean_class,
            true_class,
            false_class,
            integer_class,
            double_class,
            string_class,
            symbol_class,
            array_class,
            block_class,
            method_class,
            primitive_class,
            system_class,
        };

        let selectors = Selectors {
            plus: interner.intern("+"),
            minus: interner.intern("-"),
            star: interner.intern("*"),
            does_not_understand: interner.intern("doesNotUnderstand:arguments:"),
            escaped_block: interner.intern("escapedBlock:"),
            unknown_global: interner.intern("unknownGlobal:"),
            run_with: interner.intern("run:"),
            run: interner.intern("run"),
        };

        let mut universe = Self {
            interner,
            globals: HashMap::new(),
            core,
            selectors,
            classpath,
            loading: HashSet::new(),
            start: Instant::now(),
        };
        universe.register_core_globals();
        universe
    }

    fn register_core_globals(&mut self) {
        let classes = [
            self.core.object_class.clone(),
            self.core.class_class.clone(),
            self.core.metaclass_class.clone(),
            self.core.nil_class.clone(),
            self.core.boolean_class.clone(),
            self.core.true_class.clone(),
            self.core.false_class.clone(),
            self.core.integer_class.clone(),
            self.core.double_class.clone(),
            self.core.string_class.clone(),
            self.core.symbol_class.clone(),
            self.core.array_class.clone(),
            self.core.block_class.clone(),
            self.core.method_class.clone(),
            self.core.primitive_class.clone(),
            self.core.system_class.clone(),
        ];
        for class in classes {
            let name = class.borrow().name;
            self.globals.insert(name, Value::Class(class.clone()));
        }
        // The one well-known instance: the `system` object.
        let system = Value::Instance(Rc::new(Instance::new(self.core.system_class.clone())));
        let name = self.interner.intern("system");
        self.globals.insert(name, system);
    }

    /// The symbol table.
    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    /// Intern `text`.
    pub fn intern(&mut self, text: &str) -> SymbolId {
        self.interner.intern(text)
    }

    /// Text of an interned symbol.
    pub fn symbol_text(&self, id: SymbolId) -> Rc<str> {
        self.interner.lookup_rc(id)
    }

    /// The engine-internal selector ids.
    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    /// The bootstrap class handles.
    pub fn core(&self) -> &CoreClasses {
        &self.core
    }

    /// Read a global.
    pub fn global(&self, name: SymbolId) -> Option<Value> {
        self.globals.get(&name).cloned()
    }

    /// Install or replace a global.
    pub fn set_global(&mut self, name: SymbolId, value: Value) {
        self.globals.insert(name, value);
    }

    /// Whether a global exists.
    pub fn has_global(&self, name: SymbolId) -> bool {
        self.globals.contains_key(&name)
    }

    /// Microseconds since the universe was created.
    pub fn ticks(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Compile a class from source text, resolving its superclass
    /// through the loader, and register it as a global.
    pub fn load_class_from_source(&mut self, source: &str) -> Result<SomRef<Class>, LoadError> {
        let def = parse_class_source(source)?;
        let superclass = match &def.superclass {
            Some(name) => {
                let sym = self.interner.intern(name);
                self.resolve_class_global(sym)?
            }
            None => self.core.object_class.clone(),
        };
        let class = compile_class(&def, superclass, &mut self.interner)?;
        let name = class.borrow().name;
        self.globals.insert(name, Value::Class(class.clone()));
        Ok(class)
    }

    fn resolve_class_global(&mut self, name: SymbolId) -> Result<SomRef<Class>, RuntimeError> {
        match self.global(name) {
            Some(Value::Class(class)) => Ok(class),
            Some(_) => Err(RuntimeError::new(
                RuntimeErrorKind::UnknownGlobal,
                format!(
                    "global '{}' is not a class",
                    self.interner.lookup(name)
                ),
            )),
            None => self.load_class(name),
        }
    }

    /// Load class `name` from the classpath, superclasses first.
    pub fn load_class(&mut self, name: SymbolId) -> Result<SomRef<Class>, RuntimeError> {
        if let Some(Value::Class(class)) = self.global(name) {
            return Ok(class);
        }
        if !self.loading.insert(name) {
            return Err(RuntimeError::fatal(format!(
                "cyclic superclass chain while loading '{}'",
                self.interner.lookup(name)
            )));
        }
        let result = self.load_class_uncached(name);
        self.loading.remove(&name);
        result
    }

    fn load_class_uncached(&mut self, name: SymbolId) -> Result<SomRef<Class>, RuntimeError> {
        let file_name = format!("{}.som", self.interner.lookup(name));
        let text = self.interner.lookup(name).to_string();
        for dir in self.classpath.clone() {
            let candidate = dir.join(&file_name);
            if !candidate.is_file() {
                continue;
            }
            log::debug!("loading class {} from {}", text, candidate.display());
            let source = std::fs::read_to_string(&candidate).map_err(|e| {
                RuntimeError::new(
                    RuntimeErrorKind::ParseFailed,
                    format!("cannot read {}: {}", candidate.display(), e),
                )
            })?;
            let class = self.load_class_from_source(&source).map_err(RuntimeError::from)?;
            if class.borrow().name != name {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::ParseFailed,
                    format!(
                        "{} defines class '{}', expected '{}'",
                        candidate.display(),
                        self.interner.lookup(class.borrow().name),
                        text
                    ),
                ));
            }
            return Ok(class);
        }
        Err(RuntimeError::new(
            RuntimeErrorKind::UnknownGlobal,
            format!("class '{}' not found on the classpath", text),
        ))
    }
}
