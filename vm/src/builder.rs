use log::debug;

use object::{Body, Function, Overload, OverloadSet, Value};

use crate::VM;

/// Setup-time handle on a class that is still mutable.
///
/// The only way to give attributes to a builtin class. [`freeze`] consumes
/// the builder, so no mutable handle outlives setup.
///
/// [`freeze`]: ClassBuilder::freeze
pub struct ClassBuilder<'vm> {
    vm: &'vm mut VM,
    class: Value,
}

impl<'vm> ClassBuilder<'vm> {
    /// Also gives the class its `__name__`.
    ///
    /// # Panics
    /// if `class` is not an unfrozen class
    pub fn new(vm: &'vm mut VM, class: Value) -> Self {
        let name = {
            let class_ref = vm.heap.expect_class(class);
            assert!(
                !class_ref.is_frozen(),
                "builder requested for frozen class '{}'",
                class_ref.name()
            );
            class_ref.name().to_owned()
        };
        let mut builder = Self { vm, class };
        let name = builder.vm.create_str(&name);
        builder.attr("__name__", name);
        builder
    }

    pub fn attr(&mut self, name: &str, value: Value) -> &mut Self {
        self.vm.set_class_attr(self.class, name, value);
        self
    }

    /// Install a builtin function made of `overloads`, in priority order.
    ///
    /// # Panics
    /// if the overloads do not form a valid set (no trailing wildcard
    /// fallback, arity disagreement, ...)
    pub fn function(&mut self, name: &str, overloads: Vec<Overload>) -> Value {
        let mut set = OverloadSet::new();
        for overload in overloads {
            set.register(overload);
        }
        if let Err(err) = set.validate() {
            panic!(
                "invalid overloads for {}.{name}: {err}",
                self.vm.heap.expect_class(self.class).name()
            );
        }
        let function = Function {
            name: self.vm.intern(name),
            overloads: set,
        };
        let function_class = self.vm.specials.function_class;
        let value = self.vm.heap.allocate(function_class, Body::Function(function));
        self.attr(name, value);
        value
    }

    /// Install the object already stored under `existing` as `name` too.
    ///
    /// # Panics
    /// if `existing` was not installed on this class
    pub fn alias(&mut self, name: &str, existing: &str) -> &mut Self {
        let symbol = self.vm.intern(existing);
        let value = match self.vm.heap.expect_class(self.class).own_attr(symbol) {
            Some(value) => value,
            None => panic!("alias target '{existing}' is not defined"),
        };
        self.attr(name, value)
    }

    /// Make the class read-only and keep it alive forever.
    pub fn freeze(self) -> Value {
        let class = self.vm.heap.class_mut(self.class);
        let Some(class) = class else {
            unreachable!("builder always wraps a class");
        };
        class.freeze();
        debug!(
            "froze class '{}' with {} attributes",
            class.name(),
            class.attr_count()
        );
        self.vm.heap.register_static_root(self.class);
        self.class
    }
}

#[cfg(test)]
mod tests {
    use object::{ClassFlags, ParamType, box_gc_handler};

    use super::*;
    use crate::primitives::primitive_index;
    use crate::{VMCreateInfo, bootstrap, lookup};

    #[test]
    fn builder_gives_name_and_freezes() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let object_class = vm.specials.object_class;
        let class = vm.create_class("point", Some(object_class), box_gc_handler, 16, ClassFlags::empty());
        let mut builder = ClassBuilder::new(&mut vm, class);
        builder.attr("dims", Value::from_i64(2));
        let class = builder.freeze();

        let frozen = vm.heap.expect_class(class);
        assert!(frozen.is_frozen());
        assert!(vm.heap.static_roots().contains(&class));

        let name = vm.intern("__name__");
        let name = lookup::class_getattr(&vm, class, name).value().expect("__name__");
        assert_eq!(vm.str_value(name), Some("point"));
    }

    #[test]
    #[should_panic(expected = "frozen class 'tuple'")]
    fn writing_to_a_frozen_builtin_panics() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let tuple_class = vm.specials.tuple_class;
        vm.set_class_attr(tuple_class, "extra", Value::from_i64(1));
    }

    #[test]
    #[should_panic(expected = "invalid overloads")]
    fn overloads_without_fallback_are_rejected() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let object_class = vm.specials.object_class;
        let int_class = vm.specials.int_class;
        let class = vm.create_class("broken", Some(object_class), box_gc_handler, 16, ClassFlags::empty());
        let mut builder = ClassBuilder::new(&mut vm, class);
        builder.function(
            "f",
            vec![Overload::typed(
                primitive_index("int_eq"),
                vec![ParamType::Class(int_class), ParamType::Class(int_class)],
                ParamType::Any,
            )],
        );
    }
}
