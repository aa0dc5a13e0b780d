//! Primitives of the support classes: object, type, NoneType, bool,
//! function and slice.

use object::{Body, Slice, SliceError, Value};

use crate::errors::{ExceptionKind, RuntimeError, raise};
use crate::lookup::{class_name, type_name};
use crate::primitives::{
    fold_hash, int_value, not_implemented as not_impl, ret, ret_bool, ret_str, wrong_receiver,
};
use crate::{CallResult, VM};

pub fn object_eq(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    ret_bool(vm, args[0] == args[1])
}

pub fn object_ne(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    ret_bool(vm, args[0] != args[1])
}

/// Identity hash, derived from the reference bits.
pub fn object_hash(_vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    ret(Value::from_i64(fold_hash(args[0].raw() as i64 >> 2)))
}

pub fn object_repr(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let text = format!("<{} object>", type_name(vm, args[0]));
    ret_str(vm, &text)
}

pub fn type_repr(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let text = format!("<type '{}'>", class_name(vm, args[0]));
    ret_str(vm, &text)
}

pub fn none_repr(vm: &mut VM, _args: &[Value]) -> Result<CallResult, RuntimeError> {
    ret_str(vm, "None")
}

pub fn bool_repr(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let text = if int_value(vm, args[0]) == Some(0) { "False" } else { "True" };
    ret_str(vm, text)
}

pub fn function_repr(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let name = match vm.heap.get(args[0]).and_then(|o| o.body.as_function()) {
        Some(function) => vm.symbols.resolve(function.name),
        None => return not_impl(),
    };
    let text = format!("<built-in function {name}>");
    ret_str(vm, &text)
}

/// Wildcard fallback of binary operators.
pub fn not_implemented(_vm: &mut VM, _args: &[Value]) -> Result<CallResult, RuntimeError> {
    not_impl()
}

fn expect_slice(vm: &VM, value: Value, method: &str) -> Result<Slice, RuntimeError> {
    match vm.heap.get(value).and_then(|o| o.body.as_slice()) {
        Some(&slice) => Ok(slice),
        None => wrong_receiver(vm, method, "slice", value),
    }
}

pub fn slice_repr(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let slice = expect_slice(vm, args[0], "__repr__")?;
    let part = |bound: Option<i64>| bound.map_or_else(|| "None".to_owned(), |n| n.to_string());
    let text = format!(
        "slice({}, {}, {})",
        part(slice.start),
        part(slice.stop),
        part(slice.step)
    );
    ret_str(vm, &text)
}

/// `slice.indices(len)` as a `(start, stop, step)` tuple.
pub fn slice_indices(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let slice = expect_slice(vm, args[0], "indices")?;
    let Some(len) = int_value(vm, args[1]) else {
        return raise(
            ExceptionKind::TypeError,
            format!(
                "slice indices must be integers, not {}",
                type_name(vm, args[1])
            ),
        );
    };
    if len < 0 {
        return raise(ExceptionKind::ValueError, "length should not be negative");
    }
    match slice.indices(len) {
        Ok((start, stop, step)) => {
            let parts = [start, stop, step].map(Value::from_i64);
            ret(vm.create_tuple(&parts))
        }
        Err(SliceError::ZeroStep) => raise(ExceptionKind::ValueError, "slice step cannot be zero"),
    }
}

impl VM {
    pub fn create_slice(&mut self, start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Value {
        let class = self.specials.slice_class;
        self.heap
            .allocate(class, Body::Slice(Slice::new(start, stop, step)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{VMCreateInfo, bootstrap};

    #[test]
    fn identity_equality() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let none = vm.none();
        let other = vm.create_slice(None, None, None);
        assert!(vm.equals(none, none).unwrap());
        assert!(!vm.equals(none, other).unwrap());
        let h = vm.hash(none).unwrap();
        assert_eq!(vm.hash(none).unwrap(), h);
    }

    #[test]
    fn slice_indices_normalizes() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let s = vm.create_slice(Some(-2), None, None);
        let t = vm
            .call_attr(s, "indices", &[Value::from_i64(5)])
            .unwrap()
            .value()
            .unwrap();
        assert_eq!(vm.repr(t).unwrap(), "(3, 5, 1)");
        assert_eq!(vm.repr(s).unwrap(), "slice(-2, None, None)");
    }

    #[test]
    fn slice_methods_reject_other_receivers() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let slice_class = vm.specials.slice_class;
        let s = vm.create_str("x");
        for (name, args) in [("__repr__", vec![s]), ("indices", vec![s, Value::from_i64(3)])] {
            let symbol = vm.intern(name);
            let f = crate::lookup::class_getattr(&vm, slice_class, symbol).value().unwrap();
            let err = vm.call_function(f, &args).unwrap_err();
            assert_eq!(
                err,
                RuntimeError::TypeError(format!(
                    "descriptor '{name}' requires a 'slice' object but received a 'str'"
                ))
            );
        }
    }

    #[test]
    fn function_repr_names_the_function() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let tuple_class = vm.specials.tuple_class;
        let len = vm.intern("__len__");
        let f = crate::lookup::class_getattr(&vm, tuple_class, len).value().unwrap();
        assert_eq!(vm.repr(f).unwrap(), "<built-in function __len__>");
    }
}
