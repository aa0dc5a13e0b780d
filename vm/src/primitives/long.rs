use log::trace;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use object::{Body, BoxObject, Long, Value};

use crate::errors::{ExceptionKind, RuntimeError, raise};
use crate::lookup::{class_name, is_subclass, type_name};
use crate::primitives::{int_value, not_implemented, ret, ret_bool, ret_str, wrong_receiver};
use crate::{CallResult, VM};

/// Mersenne prime used to reduce longs outside fixnum range, so equal
/// values hash alike whatever their size.
const HASH_MODULUS: i64 = (1 << 61) - 1;

/// Releases the digit storage of a dead long. Runs once per box.
pub fn long_finalize(object: &mut BoxObject) {
    if let Some(long) = object.body.as_long_mut() {
        trace!("releasing long storage");
        long.storage_mut().release();
    }
}

/// Parse an optionally signed base-10 numeral.
pub(crate) fn parse_decimal(text: &str) -> Option<BigInt> {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

impl VM {
    fn allocate_long(&mut self, class: Value, value: BigInt) -> Value {
        self.heap.allocate(class, Body::Long(Long::new(value)))
    }

    pub fn create_long_from_i64(&mut self, n: i64) -> Value {
        let class = self.specials.long_class;
        self.allocate_long(class, BigInt::from(n))
    }

    pub fn create_long_from_bigint(&mut self, value: BigInt) -> Value {
        let class = self.specials.long_class;
        self.allocate_long(class, value)
    }

    /// Build a long from a numeral the caller already validated.
    ///
    /// # Panics
    /// if `text` is not a base-10 numeral
    pub fn create_long(&mut self, text: &str) -> Value {
        let Some(value) = parse_decimal(text) else {
            panic!("malformed long literal '{text}'");
        };
        self.create_long_from_bigint(value)
    }

    /// Backing integer of a long box.
    pub fn long_value(&self, value: Value) -> Option<&BigInt> {
        self.heap
            .get(value)
            .and_then(|o| o.body.as_long())
            .map(Long::value)
    }
}

fn expect_long<'a>(vm: &'a VM, value: Value, method: &str) -> Result<&'a BigInt, RuntimeError> {
    match vm.long_value(value) {
        Some(n) => Ok(n),
        None => wrong_receiver(vm, method, "long", value),
    }
}

/// `long.__new__(cls, val=0)`.
pub fn long_new(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let (cls, val) = (args[0], args[1]);
    if vm.heap.class(cls).is_none() {
        return raise(
            ExceptionKind::TypeError,
            format!(
                "long.__new__(X): X is not a type object ({})",
                type_name(vm, cls)
            ),
        );
    }
    if !is_subclass(vm, cls, vm.specials.long_class) {
        let name = class_name(vm, cls);
        return raise(
            ExceptionKind::TypeError,
            format!("long.__new__({name}): {name} is not a subtype of long"),
        );
    }

    let value = if let Some(n) = int_value(vm, val) {
        BigInt::from(n)
    } else if let Some(n) = vm.long_value(val) {
        n.clone()
    } else if let Some(text) = vm.str_value(val) {
        match parse_decimal(text) {
            Some(n) => n,
            None => {
                return raise(
                    ExceptionKind::ValueError,
                    format!("invalid literal for long() with base 10: '{text}'"),
                );
            }
        }
    } else {
        return raise(
            ExceptionKind::TypeError,
            format!(
                "long() argument must be a string or a number, not '{}'",
                type_name(vm, val)
            ),
        );
    };
    ret(vm.allocate_long(cls, value))
}

pub fn long_mul(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let lhs = expect_long(vm, args[0], "__mul__")?;
    let Some(rhs) = vm.long_value(args[1]) else {
        return not_implemented();
    };
    let product = lhs * rhs;
    ret(vm.create_long_from_bigint(product))
}

pub fn long_repr(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let text = format!("{}L", expect_long(vm, args[0], "__repr__")?);
    ret_str(vm, &text)
}

pub fn long_str(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let text = expect_long(vm, args[0], "__str__")?.to_string();
    ret_str(vm, &text)
}

/// Value of the right operand of an equality: another long or an int.
fn other_operand(vm: &VM, value: Value) -> Option<BigInt> {
    if let Some(n) = vm.long_value(value) {
        return Some(n.clone());
    }
    int_value(vm, value).map(BigInt::from)
}

fn long_equality(vm: &mut VM, args: &[Value], negate: bool) -> Result<CallResult, RuntimeError> {
    let lhs = expect_long(vm, args[0], if negate { "__ne__" } else { "__eq__" })?;
    let Some(rhs) = other_operand(vm, args[1]) else {
        return not_implemented();
    };
    let equal = *lhs == rhs;
    ret_bool(vm, equal != negate)
}

pub fn long_eq(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    long_equality(vm, args, false)
}

pub fn long_ne(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    long_equality(vm, args, true)
}

/// Matches `int.__hash__` for values in fixnum range.
pub(crate) fn hash_bigint(value: &BigInt) -> i64 {
    if let Some(n) = value.to_i64().filter(|&n| Value::fits_fixnum(n)) {
        return n;
    }
    let modulus = BigInt::from(HASH_MODULUS);
    let reduced = (value % &modulus).to_i64().unwrap_or_default();
    if reduced.is_zero() && !value.is_zero() {
        return if value < &BigInt::zero() { -1 } else { 1 };
    }
    reduced
}

pub fn long_hash(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
    let hash = hash_bigint(expect_long(vm, args[0], "__hash__")?);
    ret(Value::from_i64(hash))
}

#[cfg(test)]
mod tests {
    use heap::RootSet;
    use object::{ClassFlags, body_gc_handler};

    use super::*;
    use crate::lookup::class_of;
    use crate::{ClassBuilder, VMCreateInfo, bootstrap};

    fn vm() -> VM {
        bootstrap(VMCreateInfo::default()).expect("bootstrap")
    }

    fn call(vm: &mut VM, receiver: Value, name: &str, args: &[Value]) -> Value {
        vm.call_attr(receiver, name, args)
            .expect("call failed")
            .value()
            .expect("returned a value")
    }

    fn new_long(vm: &mut VM, args: &[Value]) -> Result<CallResult, RuntimeError> {
        let class = vm.specials.long_class;
        vm.call_class_attr(class, "__new__", args)
    }

    #[test]
    fn product_forms() {
        let mut vm = vm();
        let a = vm.create_long("12345");
        let b = vm.create_long_from_i64(2);
        let p = call(&mut vm, a, "__mul__", &[b]);
        assert_eq!(vm.str(p).unwrap(), "24690");
        assert_eq!(vm.repr(p).unwrap(), "24690L");
    }

    #[test]
    fn decimal_round_trip() {
        let mut vm = vm();
        for (input, canonical) in [
            ("0", "0"),
            ("42", "42"),
            ("-17", "-17"),
            ("+5", "5"),
            ("0007", "7"),
            ("-000", "0"),
            (
                "123456789012345678901234567890123456789",
                "123456789012345678901234567890123456789",
            ),
        ] {
            let v = vm.create_long(input);
            assert_eq!(vm.str(v).unwrap(), canonical);
        }
    }

    #[test]
    #[should_panic(expected = "malformed long literal")]
    fn internal_constructor_asserts_well_formed_input() {
        let mut vm = vm();
        vm.create_long("12a");
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "-", "+", "1_000", " 1", "1.5", "0x10", "--1", "١٢"] {
            assert!(parse_decimal(bad).is_none(), "{bad:?}");
        }
    }

    #[test]
    fn new_from_int_str_and_default() {
        let mut vm = vm();
        let long_class = vm.specials.long_class;

        let v = new_long(&mut vm, &[long_class, Value::from_i64(-9)]).unwrap().value().unwrap();
        assert_eq!(vm.repr(v).unwrap(), "-9L");

        let s = vm.create_str("99999999999999999999");
        let v = new_long(&mut vm, &[long_class, s]).unwrap().value().unwrap();
        assert_eq!(vm.str(v).unwrap(), "99999999999999999999");

        let v = new_long(&mut vm, &[long_class]).unwrap().value().unwrap();
        assert_eq!(vm.repr(v).unwrap(), "0L");
    }

    #[test]
    fn new_rejects_bad_arguments() {
        let mut vm = vm();
        let long_class = vm.specials.long_class;
        let tuple_class = vm.specials.tuple_class;

        let err = new_long(&mut vm, &[Value::from_i64(1)]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::TypeError("long.__new__(X): X is not a type object (int)".into())
        );

        let err = new_long(&mut vm, &[tuple_class]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::TypeError("long.__new__(tuple): tuple is not a subtype of long".into())
        );

        let s = vm.create_str("12x");
        let err = new_long(&mut vm, &[long_class, s]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::ValueError("invalid literal for long() with base 10: '12x'".into())
        );

        let t = vm.create_tuple(&[]);
        let err = new_long(&mut vm, &[long_class, t]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::TypeError("long() argument must be a string or a number, not 'tuple'".into())
        );
    }

    #[test]
    fn new_uses_the_requested_subclass() {
        let mut vm = vm();
        let long_class = vm.specials.long_class;
        let class = vm.create_class("mylong", Some(long_class), body_gc_handler, 32, ClassFlags::empty());
        let class = ClassBuilder::new(&mut vm, class).freeze();
        let v = new_long(&mut vm, &[class, Value::from_i64(3)]).unwrap().value().unwrap();
        assert_eq!(class_of(&vm, v), class);
        // inherited methods still apply
        assert_eq!(vm.repr(v).unwrap(), "3L");
    }

    #[test]
    fn mul_with_non_long() {
        let mut vm = vm();
        let a = vm.create_long("3");
        let result = vm.call_attr(a, "__mul__", &[Value::from_i64(2)]).unwrap();
        assert!(result.is_not_implemented());

        let long_class = vm.specials.long_class;
        let mul = vm.intern("__mul__");
        let f = crate::lookup::class_getattr(&vm, long_class, mul).value().unwrap();
        let err = vm.call_function(f, &[Value::from_i64(2), a]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::TypeError(
                "descriptor '__mul__' requires a 'long' object but received a 'int'".into()
            )
        );
    }

    #[test]
    fn text_forms_require_long_receiver() {
        let mut vm = vm();
        let long_class = vm.specials.long_class;
        let s = vm.create_str("x");
        for name in ["__repr__", "__str__"] {
            let symbol = vm.intern(name);
            let f = crate::lookup::class_getattr(&vm, long_class, symbol).value().unwrap();
            let err = vm.call_function(f, &[s]).unwrap_err();
            assert_eq!(
                err,
                RuntimeError::TypeError(format!(
                    "descriptor '{name}' requires a 'long' object but received a 'str'"
                ))
            );
        }
    }

    #[test]
    fn equality_and_hash_agree() {
        let mut vm = vm();
        let big = "340282366920938463463374607431768211456";
        let a = vm.create_long(big);
        let b = vm.create_long(big);
        let c = vm.create_long("7");
        assert!(vm.equals(a, b).unwrap());
        assert_eq!(vm.hash(a).unwrap(), vm.hash(b).unwrap());
        assert!(vm.equals(c, Value::from_i64(7)).unwrap());
        assert_eq!(vm.hash(c).unwrap(), vm.hash(Value::from_i64(7)).unwrap());
        assert!(!vm.equals(a, c).unwrap());
    }

    #[test]
    fn hash_stays_in_fixnum_range() {
        for text in ["4611686018427387904", "-4611686018427387905", "2305843009213693951"] {
            let h = hash_bigint(&text.parse().unwrap());
            assert!(Value::fits_fixnum(h));
            assert_ne!(h, 0);
        }
    }

    #[test]
    fn finalizer_releases_storage_once() {
        let mut vm = vm();
        let kept = vm.create_long("1");
        vm.create_long("2");
        vm.create_long("3");

        let before = vm.heap.stats().finalized_objects;
        let mut roots = RootSet::new();
        roots.push(kept);
        let first = vm.collect(&mut roots);
        assert!(first.finalized >= 2);
        let second = vm.collect(&mut roots);
        assert_eq!(second.finalized, 0);
        assert_eq!(vm.heap.stats().finalized_objects, before + first.finalized);
        assert_eq!(vm.long_value(kept), Some(&BigInt::from(1)));
    }
}
