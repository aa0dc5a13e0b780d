use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

/// An interned attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    #[inline(always)]
    pub fn id(self) -> u32 {
        self.0
    }
}

struct InternedStringsImpl {
    table: Vec<Arc<str>>,
    mappings: HashMap<Arc<str>, Symbol, ahash::RandomState>,
}

/// Shared name table. Cloning hands out another handle to the same table.
#[derive(Clone)]
pub struct InternedStrings(Arc<RwLock<InternedStringsImpl>>);

impl InternedStringsImpl {
    fn new() -> Self {
        Self {
            table: Vec::new(),
            mappings: HashMap::default(),
        }
    }

    fn get_or_add(&mut self, value: &str) -> Symbol {
        if let Some(&symbol) = self.mappings.get(value) {
            return symbol;
        }
        let id = u32::try_from(self.table.len())
            .expect("interned string table exhausted");
        let symbol = Symbol(id);
        let interned = Arc::<str>::from(value);
        self.table.push(interned.clone());
        self.mappings.insert(interned, symbol);
        symbol
    }
}

impl InternedStrings {
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(InternedStringsImpl::new())))
    }

    pub fn intern(&self, value: &str) -> Symbol {
        if let Some(&symbol) = self.0.read().mappings.get(value) {
            return symbol;
        }
        self.0.write().get_or_add(value)
    }

    /// Look up an already interned name without adding it.
    pub fn lookup(&self, value: &str) -> Option<Symbol> {
        self.0.read().mappings.get(value).copied()
    }

    pub fn resolve(&self, symbol: Symbol) -> Arc<str> {
        // symbols are only minted by this table
        self.0.read().table[symbol.0 as usize].clone()
    }

    pub fn len(&self) -> usize {
        self.0.read().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InternedStrings {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for InternedStrings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InternedStrings")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let names = InternedStrings::new();
        let a = names.intern("__getitem__");
        let b = names.intern("__getitem__");
        let c = names.intern("__len__");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(&*names.resolve(c), "__len__");
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn lookup_does_not_add() {
        let names = InternedStrings::new();
        assert!(names.lookup("missing").is_none());
        assert!(names.is_empty());
        let shared = names.clone();
        let sym = shared.intern("next");
        assert_eq!(names.lookup("next"), Some(sym));
    }
}
