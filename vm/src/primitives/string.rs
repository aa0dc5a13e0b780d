use object::Value;

use crate::errors::RuntimeError;
use crate::primitives::{fold_hash, not_implemented, ret, ret_bool, ret_str, wrong_receiver};
use crate::{CallResult, VM};

// fixed seeds keep string hashes stable across runs
const HASH_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

pub(crate) fn hash_text(text: &str) -> i64 {
    let [k0, k1, k2, k3] = HASH_SEEDS;
    let state = ahash::RandomState::with_seeds(k0, k1, k2, k3);
    fold_hash(state.hash_one(text) as i64)
}

fn expect_str<'a>(vm: &'a VM, value: Value, method: &str) -> Result<&'a str, RuntimeError> {
    match vm.str_value(value) {
        Some(text) => Ok(text),
        None => wrong_receiver(vm, method, "str", value),
    }
}

fn str_equality(vm: &mut VM, args: &[Value], negate: bool) -> Result<CallResult, RuntimeError> {
    let lhs = expect_str(vm, args[0], if negate { "__ne__" } else { "__eq__" })?;
    let Some(rhs) = vm.str_value(args[1]) else {
        return not_implemented();
    };
    let equal = lhs == rhs;
    ret_bool(vm, equal != negate)
}

pub fn str_eq(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    str_equality(vm, args, false)
}

pub fn str_ne(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    str_equality(vm, args, true)
}

pub fn str_hash(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    ret(Value::from_i64(hash_text(expect_str(vm, args[0], "__hash__")?)))
}

pub fn str_repr(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let text = expect_str(vm, args[0], "__repr__")?;
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        match c {
            '\'' => quoted.push_str("\\'"),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    ret_str(vm, &quoted)
}

pub fn str_str(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    expect_str(vm, args[0], "__str__")?;
    ret(args[0])
}

pub fn str_len(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let len = expect_str(vm, args[0], "__len__")?.chars().count();
    ret(Value::from_i64(len as i64))
}
