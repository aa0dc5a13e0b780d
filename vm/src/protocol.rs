//! Generic entry points (compare, hash, repr, truthiness) that dispatch on
//! the classes of their operands.

use std::cmp::Ordering;

use object::Value;

use crate::dispatch::{call_attr, call_function, has_attr};
use crate::errors::{ExceptionKind, RuntimeError, raise};
use crate::lookup::{getattr, type_name};
use crate::{CallResult, VM};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Lt,
        CompareOp::Le,
        CompareOp::Gt,
        CompareOp::Ge,
    ];

    pub fn method_name(self) -> &'static str {
        match self {
            CompareOp::Eq => "__eq__",
            CompareOp::Ne => "__ne__",
            CompareOp::Lt => "__lt__",
            CompareOp::Le => "__le__",
            CompareOp::Gt => "__gt__",
            CompareOp::Ge => "__ge__",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// The operation to try with swapped operands.
    pub fn reflected(self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
        }
    }

    /// Evaluate against an already known ordering.
    #[inline]
    pub fn apply<T: Ord + ?Sized>(self, a: &T, b: &T) -> bool {
        let ordering = a.cmp(b);
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

impl VM {
    /// `a op b` as a boolean, trying `b`'s reflected method when `a`
    /// answers not-implemented. `==` and `!=` fall back to identity.
    pub fn compare(&mut self, a: Value, b: Value, op: CompareOp) -> Result<bool, RuntimeError> {
        if has_attr(self, a, op.method_name()) {
            if let CallResult::Return(result) = call_attr(self, a, op.method_name(), &[b])? {
                return self.nonzero(result);
            }
        }
        let reflected = op.reflected();
        if has_attr(self, b, reflected.method_name()) {
            if let CallResult::Return(result) = call_attr(self, b, reflected.method_name(), &[a])? {
                return self.nonzero(result);
            }
        }
        match op {
            CompareOp::Eq => Ok(a == b),
            CompareOp::Ne => Ok(a != b),
            _ => raise(
                ExceptionKind::TypeError,
                format!(
                    "'{}' not supported between instances of '{}' and '{}'",
                    op.symbol(),
                    type_name(self, a),
                    type_name(self, b)
                ),
            ),
        }
    }

    #[inline]
    pub fn equals(&mut self, a: Value, b: Value) -> Result<bool, RuntimeError> {
        if a == b {
            return Ok(true);
        }
        self.compare(a, b, CompareOp::Eq)
    }

    /// `hash(v)`, always a fixnum-range integer.
    pub fn hash(&mut self, value: Value) -> Result<i64, RuntimeError> {
        // a class opts out of hashing by binding `__hash__` to None
        let symbol = self.intern("__hash__");
        let function = match getattr(self, value, symbol).value() {
            Some(function) if function != self.specials.none => function,
            _ => {
                return raise(
                    ExceptionKind::TypeError,
                    format!("unhashable type: '{}'", type_name(self, value)),
                );
            }
        };
        let result = call_function(self, function, &[value])?;
        match result.value().and_then(Value::as_fixnum) {
            Some(hash) => Ok(hash),
            None => raise(
                ExceptionKind::TypeError,
                "__hash__ method should return an integer",
            ),
        }
    }

    pub fn repr(&mut self, value: Value) -> Result<String, RuntimeError> {
        self.text_of(value, "__repr__")
    }

    pub fn str(&mut self, value: Value) -> Result<String, RuntimeError> {
        if has_attr(self, value, "__str__") {
            self.text_of(value, "__str__")
        } else {
            self.text_of(value, "__repr__")
        }
    }

    fn text_of(&mut self, value: Value, method: &str) -> Result<String, RuntimeError> {
        let result = call_attr(self, value, method, &[])?;
        match result.value().and_then(|v| self.str_value(v)) {
            Some(text) => Ok(text.to_owned()),
            None => raise(
                ExceptionKind::TypeError,
                format!("{method} returned non-string"),
            ),
        }
    }

    /// Truthiness: `None`, `False`, zero and empty containers are false.
    pub fn nonzero(&mut self, value: Value) -> Result<bool, RuntimeError> {
        if let Some(n) = value.as_fixnum() {
            return Ok(n != 0);
        }
        if value == self.specials.none {
            return Ok(false);
        }
        if let Some(b) = self.heap.get(value).and_then(|o| o.body.as_bool()) {
            return Ok(b);
        }
        if has_attr(self, value, "__len__") {
            let len = call_attr(self, value, "__len__", &[])?;
            return Ok(len.value().and_then(Value::as_fixnum) != Some(0));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{VMCreateInfo, bootstrap};

    #[test]
    fn apply_matches_ordering() {
        assert!(CompareOp::Lt.apply(&1, &2));
        assert!(CompareOp::Le.apply(&2, &2));
        assert!(!CompareOp::Gt.apply(&2, &2));
        assert!(CompareOp::Ne.apply(&1, &2));
        for op in CompareOp::ALL {
            assert_eq!(op.reflected().reflected(), op);
        }
    }

    #[test]
    fn mixed_types_fall_back_to_identity() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let s = vm.create_str("1");
        assert!(!vm.equals(s, Value::from_i64(1)).unwrap());
        assert!(vm.compare(s, Value::from_i64(1), CompareOp::Ne).unwrap());
        let err = vm.compare(s, Value::from_i64(1), CompareOp::Lt).unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::TypeError);
    }

    #[test]
    fn reflected_comparison_is_tried() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let big = vm.create_long("5");
        // int.__eq__ does not know long, long.__eq__ knows int
        assert!(vm.equals(Value::from_i64(5), big).unwrap());
    }

    #[test]
    fn truthiness() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let none = vm.none();
        let empty = vm.create_tuple(&[]);
        let full = vm.create_tuple(&[none]);
        let f = vm.specials.false_obj;
        assert!(!vm.nonzero(none).unwrap());
        assert!(!vm.nonzero(f).unwrap());
        assert!(!vm.nonzero(Value::from_i64(0)).unwrap());
        assert!(!vm.nonzero(empty).unwrap());
        assert!(vm.nonzero(full).unwrap());
    }

    #[test]
    fn reprs_of_support_types() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let none = vm.none();
        let t = vm.specials.true_obj;
        let s = vm.create_str("hi");
        let tuple_class = vm.specials.tuple_class;
        assert_eq!(vm.repr(none).unwrap(), "None");
        assert_eq!(vm.repr(t).unwrap(), "True");
        assert_eq!(vm.repr(Value::from_i64(-3)).unwrap(), "-3");
        assert_eq!(vm.repr(s).unwrap(), "'hi'");
        assert_eq!(vm.str(s).unwrap(), "hi");
        assert_eq!(vm.repr(tuple_class).unwrap(), "<type 'tuple'>");
    }

    #[test]
    fn unhashable_is_reported() {
        let mut vm = bootstrap(VMCreateInfo::default()).expect("bootstrap");
        let s = vm.create_slice(None, None, None);
        let err = vm.hash(s).unwrap_err();
        assert_eq!(err, RuntimeError::TypeError("unhashable type: 'slice'".into()));
    }
}
