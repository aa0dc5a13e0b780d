use object::Value;

use crate::errors::RuntimeError;
use crate::primitives::{int_value, not_implemented, ret, ret_bool, ret_str};
use crate::protocol::CompareOp;
use crate::{CallResult, VM};

fn int_compare(vm: &mut VM, args: &[Value], op: CompareOp) -> Result<CallResult, RuntimeError> {
    let (Some(a), Some(b)) = (int_value(vm, args[0]), int_value(vm, args[1])) else {
        return not_implemented();
    };
    ret_bool(vm, op.apply(&a, &b))
}

pub fn int_eq(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    int_compare(vm, args, CompareOp::Eq)
}

pub fn int_ne(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    int_compare(vm, args, CompareOp::Ne)
}

pub fn int_lt(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    int_compare(vm, args, CompareOp::Lt)
}

pub fn int_le(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    int_compare(vm, args, CompareOp::Le)
}

pub fn int_gt(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    int_compare(vm, args, CompareOp::Gt)
}

pub fn int_ge(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    int_compare(vm, args, CompareOp::Ge)
}

/// An int hashes to itself.
pub fn int_hash(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    match int_value(vm, args[0]) {
        Some(n) => ret(Value::from_i64(n)),
        None => not_implemented(),
    }
}

pub fn int_repr(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    match int_value(vm, args[0]) {
        Some(n) => ret_str(vm, &n.to_string()),
        None => not_implemented(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{VMCreateInfo, bootstrap};

    #[test]
    fn comparisons() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let (one, two) = (Value::from_i64(1), Value::from_i64(2));
        assert!(vm.compare(one, two, CompareOp::Lt).unwrap());
        assert!(vm.compare(two, two, CompareOp::Ge).unwrap());
        assert!(!vm.compare(one, two, CompareOp::Eq).unwrap());
        let t = vm.specials.true_obj;
        assert!(vm.equals(one, t).unwrap());
    }

    #[test]
    fn hash_is_identity() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        assert_eq!(vm.hash(Value::from_i64(-12)).unwrap(), -12);
        let f = vm.specials.false_obj;
        assert_eq!(vm.hash(f).unwrap(), 0);
    }
}
