//! Runtime core: builtin classes, overload dispatch and the tuple / long
//! primitives, on top of the `object` model and the `heap` collector.

pub mod builder;
pub mod dispatch;
pub mod errors;
pub mod lookup;
pub mod primitives;
pub mod protocol;
pub mod special;

use heap::{Collection, Heap, HeapSettings, RootProvider};
use log::debug;
use object::{Body, InternedStrings, SpecialObjects, Str, Symbol, Value};

pub use builder::ClassBuilder;
pub use errors::{ExceptionKind, RuntimeError, raise};
pub use lookup::LookupResult;
pub use protocol::CompareOp;
pub use special::bootstrap;

/// Settings used to create a [`VM`].
#[derive(Debug, Clone, Default)]
pub struct VMCreateInfo {
    pub heap: HeapSettings,
}

/// Outcome of a builtin call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallResult {
    Return(Value),
    /// The operand types are unsupported; the caller may try the
    /// reflected operation.
    NotImplemented,
}

impl CallResult {
    #[inline]
    pub fn value(self) -> Option<Value> {
        match self {
            CallResult::Return(value) => Some(value),
            CallResult::NotImplemented => None,
        }
    }

    #[inline]
    pub fn is_not_implemented(self) -> bool {
        matches!(self, CallResult::NotImplemented)
    }
}

/// The VM owns the heap, the bootstrapped special objects and the name
/// table.
pub struct VM {
    pub heap: Heap,
    pub specials: SpecialObjects,
    pub symbols: InternedStrings,
    /// Registered primitive descriptors.
    pub primitives: &'static [primitives::PrimitiveDesc],
}

impl VM {
    #[inline]
    pub fn intern(&self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    pub fn create_str(&mut self, text: &str) -> Value {
        self.heap.allocate(self.specials.str_class, Body::Str(Str::new(text)))
    }

    /// Text of a `str` box, `None` for anything else.
    pub fn str_value(&self, value: Value) -> Option<&str> {
        self.heap
            .get(value)
            .and_then(|o| o.body.as_str())
            .map(Str::as_str)
    }

    #[inline]
    pub fn bool_value(&self, b: bool) -> Value {
        self.specials.bool_value(b)
    }

    #[inline]
    pub fn none(&self) -> Value {
        self.specials.none
    }

    /// Write an attribute on a class after setup.
    ///
    /// # Panics
    /// if `class` is not a class or is frozen
    pub fn set_class_attr(&mut self, class: Value, name: &str, value: Value) {
        let symbol = self.intern(name);
        match self.heap.class_mut(class) {
            Some(class) => class.set_attr(symbol, value),
            None => panic!("{class:?} is not a class"),
        }
    }

    /// Stop-the-world collection. Static roots are always included.
    pub fn collect(&mut self, roots: &mut dyn RootProvider) -> Collection {
        self.heap.collect(roots)
    }

    /// Collect only if the heap asks for it.
    pub fn safepoint(&mut self, roots: &mut dyn RootProvider) -> Option<Collection> {
        if !self.heap.should_collect() {
            return None;
        }
        debug!("safepoint: collecting");
        Some(self.heap.collect(roots))
    }
}
