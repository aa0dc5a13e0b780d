use std::{collections::HashMap, sync::Arc};

use bitflags::bitflags;

use crate::{FinalizeFn, Symbol, TraceFn, Value, Visitable, Visitor};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClassFlags: u8 {
        /// Attribute table is read-only from now on.
        const FROZEN = 1 << 0;
        /// Created by the runtime's setup routines.
        const BUILTIN = 1 << 1;
        /// Instances own storage that needs the finalize hook.
        const HAS_FINALIZER = 1 << 2;
    }
}

/// A runtime type. Lives in the heap as a box whose class is `type`.
///
/// Mutable while its setup runs, frozen afterwards. Writing to a frozen
/// class is a contract violation and panics.
pub struct Class {
    name: Arc<str>,
    parent: Option<Value>,
    attrs: HashMap<Symbol, Value, ahash::RandomState>,
    instance_size: usize,
    trace: TraceFn,
    finalize: Option<FinalizeFn>,
    flags: ClassFlags,
}

impl Class {
    pub fn new(
        name: &str,
        parent: Option<Value>,
        trace: TraceFn,
        instance_size: usize,
        flags: ClassFlags,
    ) -> Self {
        Self {
            name: Arc::from(name),
            parent,
            attrs: HashMap::default(),
            instance_size,
            trace,
            finalize: None,
            flags: flags.difference(ClassFlags::FROZEN | ClassFlags::HAS_FINALIZER),
        }
    }

    /// Install the finalization hook. Setup only.
    pub fn with_finalizer(mut self, finalize: FinalizeFn) -> Self {
        self.finalize = Some(finalize);
        self.flags.insert(ClassFlags::HAS_FINALIZER);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<Value> {
        self.parent
    }

    #[inline]
    pub fn instance_size(&self) -> usize {
        self.instance_size
    }

    #[inline]
    pub fn trace_fn(&self) -> TraceFn {
        self.trace
    }

    #[inline]
    pub fn finalize_fn(&self) -> Option<FinalizeFn> {
        self.finalize
    }

    #[inline]
    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.flags.contains(ClassFlags::FROZEN)
    }

    /// Own attribute only, parents are not consulted.
    #[inline]
    pub fn own_attr(&self, name: Symbol) -> Option<Value> {
        self.attrs.get(&name).copied()
    }

    pub fn attr_count(&self) -> usize {
        self.attrs.len()
    }

    /// # Panics
    /// if the class is frozen
    pub fn set_attr(&mut self, name: Symbol, value: Value) {
        assert!(
            !self.is_frozen(),
            "attempt to set attribute {} on frozen class '{}'",
            name.id(),
            self.name
        );
        self.attrs.insert(name, value);
    }

    /// One-way transition to read-only.
    pub fn freeze(&mut self) {
        self.flags.insert(ClassFlags::FROZEN);
    }
}

impl Visitable for Class {
    fn visit_edges(&self, visitor: &mut dyn Visitor) {
        if let Some(parent) = self.parent {
            visitor.visit(parent);
        }
        for &value in self.attrs.values() {
            visitor.visit(value);
        }
    }
}

impl core::fmt::Debug for Class {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("attrs", &self.attrs.len())
            .field("instance_size", &self.instance_size)
            .field("flags", &self.flags)
            .finish()
    }
}
