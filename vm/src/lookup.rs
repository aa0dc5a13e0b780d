use object::{Symbol, Value};

use crate::VM;

/// The result of an attribute lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    /// No class on the ancestor chain defines the name.
    None,
    Found {
        /// The class whose table held the attribute (may differ from the
        /// starting class if it was found via the parent chain).
        holder: Value,
        value: Value,
    },
}

impl LookupResult {
    #[inline]
    pub fn value(self) -> Option<Value> {
        match self {
            LookupResult::Found { value, .. } => Some(value),
            LookupResult::None => None,
        }
    }
}

/// Look up `name` on `class`: own table first, then the parent chain.
pub fn class_getattr(vm: &VM, class: Value, name: Symbol) -> LookupResult {
    let mut current = Some(class);
    while let Some(holder) = current {
        let Some(class) = vm.heap.class(holder) else {
            return LookupResult::None;
        };
        if let Some(value) = class.own_attr(name) {
            return LookupResult::Found { holder, value };
        }
        current = class.parent();
    }
    LookupResult::None
}

/// Look up `name` on the class of `value`.
#[inline]
pub fn getattr(vm: &VM, value: Value, name: Symbol) -> LookupResult {
    class_getattr(vm, class_of(vm, value), name)
}

/// `true` iff `other` is on the ancestor chain of `class`, `class`
/// included.
pub fn is_subclass(vm: &VM, class: Value, other: Value) -> bool {
    let mut current = Some(class);
    while let Some(candidate) = current {
        if candidate == other {
            return true;
        }
        current = vm.heap.class(candidate).and_then(|c| c.parent());
    }
    false
}

/// Runtime class of a value. Fixnums carry no header and resolve to `int`.
///
/// # Panics
/// on a stale reference
#[inline]
pub fn class_of(vm: &VM, value: Value) -> Value {
    if value.is_fixnum() {
        return vm.specials.int_class;
    }
    vm.heap.object(value).class()
}

#[inline]
pub fn is_instance(vm: &VM, value: Value, class: Value) -> bool {
    is_subclass(vm, class_of(vm, value), class)
}

pub fn class_name(vm: &VM, class: Value) -> &str {
    vm.heap.class(class).map_or("?", |c| c.name())
}

pub fn type_name(vm: &VM, value: Value) -> &str {
    class_name(vm, class_of(vm, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{VMCreateInfo, bootstrap};

    #[test]
    fn fixnums_are_ints() {
        let vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        assert_eq!(class_of(&vm, Value::from_i64(7)), vm.specials.int_class);
        assert_eq!(type_name(&vm, Value::from_i64(7)), "int");
        assert_eq!(type_name(&vm, vm.specials.none), "NoneType");
        assert_eq!(type_name(&vm, vm.specials.tuple_class), "type");
    }

    #[test]
    fn subclass_chain_includes_self() {
        let vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let s = &vm.specials;
        assert!(is_subclass(&vm, s.bool_class, s.bool_class));
        assert!(is_subclass(&vm, s.bool_class, s.int_class));
        assert!(is_subclass(&vm, s.bool_class, s.object_class));
        assert!(!is_subclass(&vm, s.int_class, s.bool_class));
        assert!(!is_subclass(&vm, s.long_class, s.int_class));
        assert!(is_subclass(&vm, s.type_class, s.object_class));
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let name = vm.intern("__repr__");
        let hash = vm.intern("__hash__");
        let s = &vm.specials;

        // bool defines its own repr, int's hash is inherited
        match class_getattr(&vm, s.bool_class, name) {
            LookupResult::Found { holder, .. } => assert_eq!(holder, s.bool_class),
            LookupResult::None => panic!("bool.__repr__ missing"),
        }
        match class_getattr(&vm, s.bool_class, hash) {
            LookupResult::Found { holder, .. } => assert_eq!(holder, s.int_class),
            LookupResult::None => panic!("bool.__hash__ missing"),
        }

        let missing = vm.intern("no_such_attribute");
        assert_eq!(class_getattr(&vm, s.tuple_class, missing), LookupResult::None);
    }
}
