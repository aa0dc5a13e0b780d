use std::mem::size_of;

use log::debug;

use heap::Heap;
use object::{
    Body, BoxObject, Class, ClassFlags, InternedStrings, Overload, ParamType, SpecialObjects,
    TraceFn, Value, body_gc_handler, box_gc_handler,
};

use crate::primitives::long::long_finalize;
use crate::primitives::tuple::{tuple_gc_handler, tuple_iterator_gc_handler};
use crate::primitives::{PRIMITIVES, primitive_index as prim};
use crate::{ClassBuilder, VM, VMCreateInfo};

/// Placeholder class reference before `type` exists.
const CLASS_PLACEHOLDER: Value = Value::from_raw(0);

const BOX_SIZE: usize = size_of::<BoxObject>();

impl VM {
    /// Allocate a new, still mutable class of class `type`.
    ///
    /// A class whose parent has a finalizer inherits it.
    pub fn create_class(
        &mut self,
        name: &str,
        parent: Option<Value>,
        trace: TraceFn,
        instance_size: usize,
        flags: ClassFlags,
    ) -> Value {
        let inherited = parent
            .and_then(|p| self.heap.class(p))
            .and_then(Class::finalize_fn);
        let mut class = Class::new(name, parent, trace, instance_size, flags);
        if let Some(finalize) = inherited {
            class = class.with_finalizer(finalize);
        }
        let type_class = self.specials.type_class;
        self.heap.allocate(type_class, Body::Class(class))
    }

    pub fn builder(&mut self, class: Value) -> ClassBuilder<'_> {
        ClassBuilder::new(self, class)
    }
}

fn raw_class(heap: &mut Heap, meta: Value, class: Class) -> Value {
    heap.allocate_sized(meta, Body::Class(class), size_of::<Class>())
}

/// Bootstrap the VM: allocate every builtin class and singleton, install
/// the builtin functions and freeze the classes.
///
/// `type` is its own class, so it is allocated against a placeholder and
/// patched afterwards.
pub fn bootstrap(info: VMCreateInfo) -> Result<VM, &'static str> {
    let mut heap = Heap::new(info.heap)?;
    let builtin = ClassFlags::BUILTIN;
    let class_size = size_of::<Class>();

    // 1. type (self-referential) and object
    let type_class = raw_class(
        &mut heap,
        CLASS_PLACEHOLDER,
        Class::new("type", None, body_gc_handler, class_size, builtin),
    );
    heap.object_mut(type_class).header.set_class(type_class);
    let object_class = raw_class(
        &mut heap,
        type_class,
        Class::new("object", None, box_gc_handler, BOX_SIZE, builtin),
    );
    // object did not exist when type was created
    let Some(type_body) = heap.class_mut(type_class) else {
        unreachable!("type was just allocated as a class");
    };
    *type_body = Class::new("type", Some(object_class), body_gc_handler, class_size, builtin);

    // 2. the remaining builtin classes
    let mut class = |name: &str, parent: Value, trace: TraceFn| {
        raw_class(
            &mut heap,
            type_class,
            Class::new(name, Some(parent), trace, BOX_SIZE, builtin),
        )
    };
    let function_class = class("function", object_class, body_gc_handler);
    let str_class = class("str", object_class, box_gc_handler);
    let int_class = class("int", object_class, box_gc_handler);
    let bool_class = class("bool", int_class, box_gc_handler);
    let none_class = class("NoneType", object_class, box_gc_handler);
    let slice_class = class("slice", object_class, box_gc_handler);
    let tuple_iterator_class = class("tupleiterator", object_class, tuple_iterator_gc_handler);
    let tuple_class = class("tuple", object_class, tuple_gc_handler);
    let long_class = raw_class(
        &mut heap,
        type_class,
        Class::new("long", Some(object_class), box_gc_handler, BOX_SIZE, builtin)
            .with_finalizer(long_finalize),
    );

    // 3. singletons
    let none = heap.allocate(none_class, Body::None);
    let true_obj = heap.allocate(bool_class, Body::Bool(true));
    let false_obj = heap.allocate(bool_class, Body::Bool(false));
    for singleton in [none, true_obj, false_obj] {
        heap.register_static_root(singleton);
    }

    let specials = SpecialObjects {
        none,
        true_obj,
        false_obj,
        object_class,
        type_class,
        int_class,
        bool_class,
        none_class,
        str_class,
        slice_class,
        function_class,
        tuple_class,
        tuple_iterator_class,
        long_class,
    };
    let mut vm = VM {
        heap,
        specials,
        symbols: InternedStrings::new(),
        primitives: PRIMITIVES,
    };

    // 4. attributes; every setup routine ends by freezing its class
    setup_object(&mut vm);
    setup_type(&mut vm);
    setup_int(&mut vm);
    setup_bool(&mut vm);
    setup_str(&mut vm);
    setup_none(&mut vm);
    setup_function(&mut vm);
    setup_slice(&mut vm);
    setup_tuple_iterator(&mut vm);
    setup_tuple(&mut vm);
    setup_long(&mut vm);

    debug!(
        "bootstrap done: {} classes, {} live objects",
        vm.specials.classes().len(),
        vm.heap.live_objects()
    );
    Ok(vm)
}

fn unary(name: &str) -> Vec<Overload> {
    vec![Overload::generic(prim(name), 1, ParamType::Any)]
}

fn binary(name: &str) -> Vec<Overload> {
    vec![Overload::generic(prim(name), 2, ParamType::Any)]
}

/// A typed fast path followed by the not-implemented fallback.
fn binary_typed(name: &str, lhs: Value, rhs: Value) -> Vec<Overload> {
    vec![
        Overload::typed(
            prim(name),
            vec![ParamType::Class(lhs), ParamType::Class(rhs)],
            ParamType::Any,
        ),
        Overload::generic(prim("not_implemented"), 2, ParamType::Any),
    ]
}

fn setup_object(vm: &mut VM) {
    let class = vm.specials.object_class;
    let mut b = vm.builder(class);
    b.function("__eq__", binary("object_eq"));
    b.function("__ne__", binary("object_ne"));
    b.function("__hash__", unary("object_hash"));
    b.function("__repr__", unary("object_repr"));
    b.freeze();
}

fn setup_type(vm: &mut VM) {
    let class = vm.specials.type_class;
    let mut b = vm.builder(class);
    b.function("__repr__", unary("type_repr"));
    b.freeze();
}

fn setup_int(vm: &mut VM) {
    let class = vm.specials.int_class;
    let mut b = vm.builder(class);
    for (method, primitive) in [
        ("__eq__", "int_eq"),
        ("__ne__", "int_ne"),
        ("__lt__", "int_lt"),
        ("__le__", "int_le"),
        ("__gt__", "int_gt"),
        ("__ge__", "int_ge"),
    ] {
        b.function(method, binary_typed(primitive, class, class));
    }
    b.function(
        "__hash__",
        vec![Overload::generic(prim("int_hash"), 1, ParamType::Any)],
    );
    b.function("__repr__", unary("int_repr"));
    b.alias("__str__", "__repr__");
    b.freeze();
}

fn setup_bool(vm: &mut VM) {
    let class = vm.specials.bool_class;
    let mut b = vm.builder(class);
    b.function("__repr__", unary("bool_repr"));
    b.alias("__str__", "__repr__");
    b.freeze();
}

fn setup_str(vm: &mut VM) {
    let class = vm.specials.str_class;
    let int_class = vm.specials.int_class;
    let mut b = vm.builder(class);
    b.function("__eq__", binary_typed("str_eq", class, class));
    b.function("__ne__", binary_typed("str_ne", class, class));
    b.function(
        "__hash__",
        vec![Overload::generic(prim("str_hash"), 1, ParamType::Class(int_class))],
    );
    b.function("__repr__", unary("str_repr"));
    b.function("__str__", unary("str_str"));
    b.function(
        "__len__",
        vec![Overload::generic(prim("str_len"), 1, ParamType::Class(int_class))],
    );
    b.freeze();
}

fn setup_none(vm: &mut VM) {
    let class = vm.specials.none_class;
    let mut b = vm.builder(class);
    b.function("__repr__", unary("none_repr"));
    b.freeze();
}

fn setup_function(vm: &mut VM) {
    let class = vm.specials.function_class;
    let mut b = vm.builder(class);
    b.function("__repr__", unary("function_repr"));
    b.freeze();
}

fn setup_slice(vm: &mut VM) {
    let class = vm.specials.slice_class;
    let none = vm.specials.none;
    let mut b = vm.builder(class);
    b.function("__repr__", unary("slice_repr"));
    b.function("indices", binary("slice_indices"));
    // slices are unhashable
    b.attr("__hash__", none);
    b.freeze();
}

fn setup_tuple_iterator(vm: &mut VM) {
    let class = vm.specials.tuple_iterator_class;
    let bool_class = vm.specials.bool_class;
    let mut b = vm.builder(class);
    b.function(
        "__iter__",
        vec![Overload::generic(prim("tupleiter_iter"), 1, ParamType::Class(class))],
    );
    b.function(
        "__hasnext__",
        vec![Overload::generic(prim("tupleiter_hasnext"), 1, ParamType::Class(bool_class))],
    );
    b.function("next", unary("tupleiter_next"));
    b.freeze();
}

fn setup_tuple(vm: &mut VM) {
    let s = vm.specials.clone();
    let class = s.tuple_class;
    let mut b = vm.builder(class);
    b.function(
        "__len__",
        vec![Overload::generic(prim("tuple_len"), 1, ParamType::Class(s.int_class))],
    );
    b.function(
        "__getitem__",
        vec![
            Overload::typed(
                prim("tuple_getitem_int"),
                vec![ParamType::Class(class), ParamType::Class(s.int_class)],
                ParamType::Any,
            ),
            Overload::typed(
                prim("tuple_getitem_slice"),
                vec![ParamType::Class(class), ParamType::Class(s.slice_class)],
                ParamType::Class(class),
            ),
            Overload::generic(prim("tuple_getitem"), 2, ParamType::Any),
        ],
    );
    b.function("__add__", binary("tuple_add"));
    for (method, primitive) in [
        ("__eq__", "tuple_eq"),
        ("__ne__", "tuple_ne"),
        ("__lt__", "tuple_lt"),
        ("__le__", "tuple_le"),
        ("__gt__", "tuple_gt"),
        ("__ge__", "tuple_ge"),
    ] {
        b.function(method, binary(primitive));
    }
    b.function(
        "__hash__",
        vec![Overload::generic(prim("tuple_hash"), 1, ParamType::Class(s.int_class))],
    );
    b.function(
        "__contains__",
        vec![Overload::generic(prim("tuple_contains"), 2, ParamType::Class(s.bool_class))],
    );
    b.function(
        "__iter__",
        vec![Overload::generic(
            prim("tuple_iter"),
            1,
            ParamType::Class(s.tuple_iterator_class),
        )],
    );
    b.function("__repr__", unary("tuple_repr"));
    b.alias("__str__", "__repr__");
    b.freeze();
}

fn setup_long(vm: &mut VM) {
    let s = vm.specials.clone();
    let class = s.long_class;
    let mut b = vm.builder(class);
    b.function(
        "__new__",
        vec![
            Overload::generic(prim("long_new"), 2, ParamType::Any)
                .with_defaults(vec![Value::from_i64(0)]),
        ],
    );
    b.function("__mul__", binary("long_mul"));
    b.function("__repr__", unary("long_repr"));
    b.function("__str__", unary("long_str"));
    b.function("__eq__", binary("long_eq"));
    b.function("__ne__", binary("long_ne"));
    b.function(
        "__hash__",
        vec![Overload::generic(prim("long_hash"), 1, ParamType::Class(s.int_class))],
    );
    b.freeze();
}
