use object::{
    Body, BoxObject, Slice, SliceError, Tuple, TupleIterator, Value, Visitable, Visitor,
    box_gc_handler,
};

use crate::errors::{ExceptionKind, RuntimeError, raise};
use crate::lookup::{is_instance, type_name};
use crate::primitives::{
    as_tuple, fold_hash, int_value, not_implemented, ret, ret_bool, ret_str, wrong_receiver,
};
use crate::protocol::CompareOp;
use crate::{CallResult, VM};

const HASH_SEED: i64 = 3527539;
const HASH_MIX: i64 = 0x9e3779b9;

pub fn tuple_gc_handler(visitor: &mut dyn Visitor, object: &BoxObject) {
    box_gc_handler(visitor, object);
    if let Some(tuple) = object.body.as_tuple() {
        tuple.visit_edges(visitor);
    }
}

pub fn tuple_iterator_gc_handler(visitor: &mut dyn Visitor, object: &BoxObject) {
    box_gc_handler(visitor, object);
    if let Some(iter) = object.body.as_tuple_iterator() {
        iter.visit_edges(visitor);
    }
}

impl VM {
    /// New tuple holding a copy of `elements`.
    pub fn create_tuple(&mut self, elements: &[Value]) -> Value {
        let class = self.specials.tuple_class;
        let size = self.heap.expect_class(class).instance_size()
            + std::mem::size_of_val(elements);
        self.heap
            .allocate_sized(class, Body::Tuple(Tuple::new(elements)), size)
    }

    /// Elements of a tuple box, `None` for anything else.
    pub fn tuple_elements(&self, value: Value) -> Option<&[Value]> {
        as_tuple(self, value).map(Tuple::elements)
    }
}

/// The tuple a builtin was invoked on, TypeError for any other receiver.
fn expect_tuple<'a>(vm: &'a VM, value: Value, method: &str) -> Result<&'a Tuple, RuntimeError> {
    match as_tuple(vm, value) {
        Some(tuple) => Ok(tuple),
        None => wrong_receiver(vm, method, "tuple", value),
    }
}

fn elements_for(vm: &VM, value: Value, method: &str) -> Result<Vec<Value>, RuntimeError> {
    expect_tuple(vm, value, method).map(|tuple| tuple.elements().to_vec())
}

#[inline]
fn is_tuple(vm: &VM, value: Value) -> bool {
    is_instance(vm, value, vm.specials.tuple_class)
}

pub fn tuple_len(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let len = expect_tuple(vm, args[0], "__len__")?.len();
    ret(Value::from_i64(len as i64))
}

// ── Indexing ──────────────────────────────────────────────────────────

fn getitem_index(vm: &VM, tuple: Value, n: i64) -> Result<CallResult, RuntimeError> {
    let tuple = expect_tuple(vm, tuple, "__getitem__")?;
    let size = tuple.len() as i64;
    // negative indices are rewritten as `size - n`, which is always out of
    // range; kept so existing callers see the same IndexError
    let index = if n < 0 { size - n } else { n };
    if index < 0 || index >= size {
        return raise(ExceptionKind::IndexError, "tuple index out of range");
    }
    match tuple.get(index as usize) {
        Some(element) => ret(element),
        None => unreachable!("index checked against the tuple length"),
    }
}

fn getitem_slice(vm: &mut VM, tuple: Value, slice: Slice) -> Result<CallResult, RuntimeError> {
    let size = expect_tuple(vm, tuple, "__getitem__")?.len() as i64;
    let (start, stop, step) = match slice.indices(size) {
        Ok(bounds) => bounds,
        Err(SliceError::ZeroStep) => {
            return raise(ExceptionKind::ValueError, "slice step cannot be zero");
        }
    };
    ret(tuple_slice(vm, tuple, start, stop, step))
}

/// Number of elements selected by normalized slice bounds.
///
/// Ranges that select nothing are 0 up front; the length formula alone
/// reports 1 for them and would index past the range.
pub(crate) fn slice_length(start: i64, stop: i64, step: i64) -> i64 {
    if (step < 0 && stop >= start) || (step > 0 && start >= stop) {
        return 0;
    }
    let length = if step < 0 {
        (stop - start + 1) / step + 1
    } else {
        (stop - start - 1) / step + 1
    };
    length.max(0)
}

/// Copy out `start, start + step, ...`.
///
/// # Panics
/// if `tuple` is not a tuple or the bounds are not normalized against its
/// length
pub(crate) fn tuple_slice(vm: &mut VM, tuple: Value, start: i64, stop: i64, step: i64) -> Value {
    let elements = match as_tuple(vm, tuple) {
        Some(tuple) => tuple.elements().to_vec(),
        None => panic!("expected a tuple, got {}", type_name(vm, tuple)),
    };
    let size = elements.len() as i64;
    assert!(step != 0, "slice step cannot be zero");
    if step > 0 {
        assert!(start >= 0, "slice start {start} below zero");
        assert!(stop <= size, "slice stop {stop} past {size}");
    } else {
        assert!(start < size, "slice start {start} past {size}");
        assert!(stop >= -1, "slice stop {stop} below -1");
    }

    let length = slice_length(start, stop, step);
    let picked: Vec<Value> = (0..length)
        .map(|i| elements[(start + i * step) as usize])
        .collect();
    vm.create_tuple(&picked)
}

pub fn tuple_getitem_int(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let Some(n) = int_value(vm, args[1]) else {
        unreachable!("dispatch guarantees an int key");
    };
    getitem_index(vm, args[0], n)
}

pub fn tuple_getitem_slice(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let slice = match vm.heap.get(args[1]).and_then(|o| o.body.as_slice()) {
        Some(&slice) => slice,
        None => unreachable!("dispatch guarantees a slice key"),
    };
    getitem_slice(vm, args[0], slice)
}

/// Generic subscript: sorts out the key type at run time.
pub fn tuple_getitem(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let (tuple, key) = (args[0], args[1]);
    expect_tuple(vm, tuple, "__getitem__")?;
    if let Some(n) = int_value(vm, key) {
        return getitem_index(vm, tuple, n);
    }
    if let Some(&slice) = vm.heap.get(key).and_then(|o| o.body.as_slice()) {
        return getitem_slice(vm, tuple, slice);
    }
    raise(
        ExceptionKind::TypeError,
        format!(
            "tuple indices must be integers, not {}",
            type_name(vm, key)
        ),
    )
}

// ── Arithmetic and comparison ─────────────────────────────────────────

pub fn tuple_add(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let mut elements = elements_for(vm, args[0], "__add__")?;
    if !is_tuple(vm, args[1]) {
        return not_implemented();
    }
    elements.extend(elements_for(vm, args[1], "__add__")?);
    ret(vm.create_tuple(&elements))
}

/// Lexicographic comparison. Elements are compared through the generic
/// entry points; an all-equal prefix decides by length.
fn tuple_cmp(vm: &mut VM, args: &[Value], op: CompareOp) -> Result<CallResult, RuntimeError> {
    let lhs = elements_for(vm, args[0], op.method_name())?;
    if !is_tuple(vm, args[1]) {
        return not_implemented();
    }
    let rhs = elements_for(vm, args[1], op.method_name())?;

    for (&a, &b) in lhs.iter().zip(&rhs) {
        if vm.equals(a, b)? {
            continue;
        }
        return match op {
            CompareOp::Eq => ret_bool(vm, false),
            CompareOp::Ne => ret_bool(vm, true),
            _ => {
                let result = vm.compare(a, b, op)?;
                ret_bool(vm, result)
            }
        };
    }
    ret_bool(vm, op.apply(&lhs.len(), &rhs.len()))
}

pub fn tuple_eq(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    tuple_cmp(vm, args, CompareOp::Eq)
}

pub fn tuple_ne(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    tuple_cmp(vm, args, CompareOp::Ne)
}

pub fn tuple_lt(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    tuple_cmp(vm, args, CompareOp::Lt)
}

pub fn tuple_le(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    tuple_cmp(vm, args, CompareOp::Le)
}

pub fn tuple_gt(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    tuple_cmp(vm, args, CompareOp::Gt)
}

pub fn tuple_ge(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    tuple_cmp(vm, args, CompareOp::Ge)
}

/// Combine element hashes in order, starting from a fixed seed.
pub(crate) fn combine_hashes(hashes: impl IntoIterator<Item = i64>) -> i64 {
    let mut acc = HASH_SEED;
    for h in hashes {
        acc ^= h
            .wrapping_add(HASH_MIX)
            .wrapping_add(acc.wrapping_shl(6))
            .wrapping_add(acc >> 2);
    }
    acc
}

pub fn tuple_hash(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let elements = elements_for(vm, args[0], "__hash__")?;
    let mut hashes = Vec::with_capacity(elements.len());
    for element in elements {
        hashes.push(vm.hash(element)?);
    }
    ret(Value::from_i64(fold_hash(combine_hashes(hashes))))
}

pub fn tuple_contains(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let needle = args[1];
    for element in elements_for(vm, args[0], "__contains__")? {
        if vm.equals(element, needle)? {
            return ret_bool(vm, true);
        }
    }
    ret_bool(vm, false)
}

pub fn tuple_repr(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let elements = elements_for(vm, args[0], "__repr__")?;
    let mut parts = Vec::with_capacity(elements.len());
    for element in &elements {
        parts.push(vm.repr(*element)?);
    }
    let text = match parts.as_slice() {
        [single] => format!("({single},)"),
        _ => format!("({})", parts.join(", ")),
    };
    ret_str(vm, &text)
}

// ── Iteration ─────────────────────────────────────────────────────────

pub fn tuple_iter(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let tuple = args[0];
    let len = expect_tuple(vm, tuple, "__iter__")?.len();
    let class = vm.specials.tuple_iterator_class;
    ret(vm
        .heap
        .allocate(class, Body::TupleIterator(TupleIterator::new(tuple, len))))
}

fn expect_iterator<'a>(
    vm: &'a mut VM,
    value: Value,
    method: &str,
) -> Result<&'a mut TupleIterator, RuntimeError> {
    if vm
        .heap
        .get(value)
        .and_then(|o| o.body.as_tuple_iterator())
        .is_none()
    {
        return wrong_receiver(vm, method, "tupleiterator", value);
    }
    match vm.heap.get_mut(value).and_then(|o| o.body.as_tuple_iterator_mut()) {
        Some(iter) => Ok(iter),
        None => unreachable!("checked above"),
    }
}

pub fn tupleiter_iter(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    expect_iterator(vm, args[0], "__iter__")?;
    ret(args[0])
}

pub fn tupleiter_hasnext(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let has_next = expect_iterator(vm, args[0], "__hasnext__")?.has_next();
    ret_bool(vm, has_next)
}

pub fn tupleiter_next(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let iter = expect_iterator(vm, args[0], "next")?;
    let tuple = iter.tuple();
    let Some(index) = iter.advance() else {
        return Err(RuntimeError::StopIteration);
    };
    let element = as_tuple(vm, tuple).and_then(|t| t.get(index));
    match element {
        Some(element) => ret(element),
        None => unreachable!("iterator position stays within its tuple"),
    }
}
