use object::{PrimitiveIndex, Tuple, Value};

use crate::errors::{ExceptionKind, RuntimeError, raise};
use crate::lookup::type_name;
use crate::{CallResult, VM};

pub mod base;
pub mod fixnum;
pub mod long;
pub mod string;
pub mod tuple;

/// Native entry point. `args` holds the receiver (if any) followed by the
/// positional arguments, defaults already filled in.
pub type PrimitiveFn = fn(&mut VM, &[Value]) -> Result<CallResult, RuntimeError>;

#[derive(Clone, Copy)]
pub struct PrimitiveDesc {
    pub name: &'static str,
    pub arity: u8,
    pub func: PrimitiveFn,
}

impl PrimitiveDesc {
    pub const fn new(name: &'static str, arity: u8, func: PrimitiveFn) -> Self {
        Self { name, arity, func }
    }
}

impl core::fmt::Debug for PrimitiveDesc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrimitiveDesc")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

pub static PRIMITIVES: &[PrimitiveDesc] = &[
    // object, type, NoneType, bool, function, slice
    PrimitiveDesc::new("object_eq", 2, base::object_eq),
    PrimitiveDesc::new("object_ne", 2, base::object_ne),
    PrimitiveDesc::new("object_hash", 1, base::object_hash),
    PrimitiveDesc::new("object_repr", 1, base::object_repr),
    PrimitiveDesc::new("type_repr", 1, base::type_repr),
    PrimitiveDesc::new("none_repr", 1, base::none_repr),
    PrimitiveDesc::new("bool_repr", 1, base::bool_repr),
    PrimitiveDesc::new("function_repr", 1, base::function_repr),
    PrimitiveDesc::new("slice_repr", 1, base::slice_repr),
    PrimitiveDesc::new("slice_indices", 2, base::slice_indices),
    PrimitiveDesc::new("not_implemented", 2, base::not_implemented),
    // int
    PrimitiveDesc::new("int_eq", 2, fixnum::int_eq),
    PrimitiveDesc::new("int_ne", 2, fixnum::int_ne),
    PrimitiveDesc::new("int_lt", 2, fixnum::int_lt),
    PrimitiveDesc::new("int_le", 2, fixnum::int_le),
    PrimitiveDesc::new("int_gt", 2, fixnum::int_gt),
    PrimitiveDesc::new("int_ge", 2, fixnum::int_ge),
    PrimitiveDesc::new("int_hash", 1, fixnum::int_hash),
    PrimitiveDesc::new("int_repr", 1, fixnum::int_repr),
    // str
    PrimitiveDesc::new("str_eq", 2, string::str_eq),
    PrimitiveDesc::new("str_ne", 2, string::str_ne),
    PrimitiveDesc::new("str_hash", 1, string::str_hash),
    PrimitiveDesc::new("str_repr", 1, string::str_repr),
    PrimitiveDesc::new("str_str", 1, string::str_str),
    PrimitiveDesc::new("str_len", 1, string::str_len),
    // tuple
    PrimitiveDesc::new("tuple_len", 1, tuple::tuple_len),
    PrimitiveDesc::new("tuple_getitem_int", 2, tuple::tuple_getitem_int),
    PrimitiveDesc::new("tuple_getitem_slice", 2, tuple::tuple_getitem_slice),
    PrimitiveDesc::new("tuple_getitem", 2, tuple::tuple_getitem),
    PrimitiveDesc::new("tuple_add", 2, tuple::tuple_add),
    PrimitiveDesc::new("tuple_eq", 2, tuple::tuple_eq),
    PrimitiveDesc::new("tuple_ne", 2, tuple::tuple_ne),
    PrimitiveDesc::new("tuple_lt", 2, tuple::tuple_lt),
    PrimitiveDesc::new("tuple_le", 2, tuple::tuple_le),
    PrimitiveDesc::new("tuple_gt", 2, tuple::tuple_gt),
    PrimitiveDesc::new("tuple_ge", 2, tuple::tuple_ge),
    PrimitiveDesc::new("tuple_hash", 1, tuple::tuple_hash),
    PrimitiveDesc::new("tuple_contains", 2, tuple::tuple_contains),
    PrimitiveDesc::new("tuple_iter", 1, tuple::tuple_iter),
    PrimitiveDesc::new("tuple_repr", 1, tuple::tuple_repr),
    PrimitiveDesc::new("tupleiter_iter", 1, tuple::tupleiter_iter),
    PrimitiveDesc::new("tupleiter_hasnext", 1, tuple::tupleiter_hasnext),
    PrimitiveDesc::new("tupleiter_next", 1, tuple::tupleiter_next),
    // long
    PrimitiveDesc::new("long_new", 2, long::long_new),
    PrimitiveDesc::new("long_mul", 2, long::long_mul),
    PrimitiveDesc::new("long_repr", 1, long::long_repr),
    PrimitiveDesc::new("long_str", 1, long::long_str),
    PrimitiveDesc::new("long_eq", 2, long::long_eq),
    PrimitiveDesc::new("long_ne", 2, long::long_ne),
    PrimitiveDesc::new("long_hash", 1, long::long_hash),
];

pub fn primitive_index_by_name(prims: &[PrimitiveDesc], name: &str) -> Option<usize> {
    prims.iter().position(|p| p.name == name)
}

/// Index of a registered primitive. Setup only.
///
/// # Panics
/// if no primitive is registered under `name`
pub fn primitive_index(name: &str) -> PrimitiveIndex {
    match primitive_index_by_name(PRIMITIVES, name) {
        Some(index) => PrimitiveIndex(index as u32),
        None => panic!("unknown primitive '{name}'"),
    }
}

#[inline]
pub(crate) fn ret(value: Value) -> Result<CallResult, RuntimeError> {
    Ok(CallResult::Return(value))
}

#[inline]
pub(crate) fn ret_bool(vm: &VM, b: bool) -> Result<CallResult, RuntimeError> {
    ret(vm.bool_value(b))
}

#[inline]
pub(crate) fn not_implemented() -> Result<CallResult, RuntimeError> {
    Ok(CallResult::NotImplemented)
}

pub(crate) fn ret_str(vm: &mut VM, text: &str) -> Result<CallResult, RuntimeError> {
    ret(vm.create_str(text))
}

/// TypeError for a builtin invoked on a receiver of the wrong class.
pub(crate) fn wrong_receiver<T>(
    vm: &VM,
    method: &str,
    expected: &str,
    receiver: Value,
) -> Result<T, RuntimeError> {
    raise(
        ExceptionKind::TypeError,
        format!(
            "descriptor '{method}' requires a '{expected}' object but received a '{}'",
            type_name(vm, receiver)
        ),
    )
}

/// Integer value of an `int` instance: a fixnum or a bool box.
pub(crate) fn int_value(vm: &VM, value: Value) -> Option<i64> {
    if let Some(n) = value.as_fixnum() {
        return Some(n);
    }
    vm.heap
        .get(value)
        .and_then(|o| o.body.as_bool())
        .map(i64::from)
}

pub(crate) fn as_tuple(vm: &VM, value: Value) -> Option<&Tuple> {
    vm.heap.get(value).and_then(|o| o.body.as_tuple())
}

/// Fold an arbitrary 64-bit hash into fixnum range.
#[inline]
pub(crate) fn fold_hash(hash: i64) -> i64 {
    (hash << 1) >> 1
}
