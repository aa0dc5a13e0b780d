//! Overload resolution and the call boundary for builtin functions.

use log::trace;

use object::{ParamType, PrimitiveIndex, Value};

use crate::errors::{ExceptionKind, RuntimeError, raise};
use crate::lookup::{class_getattr, class_of, getattr, is_subclass, type_name};
use crate::{CallResult, LookupResult, VM};

struct Selected {
    primitive: PrimitiveIndex,
    args: Vec<Value>,
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    returns: ParamType,
}

#[inline]
fn accepts(vm: &VM, param: ParamType, arg: Value) -> bool {
    match param {
        ParamType::Any => true,
        ParamType::Class(class) => is_subclass(vm, class_of(vm, arg), class),
    }
}

fn select(vm: &VM, function: Value, args: &[Value]) -> Result<Selected, RuntimeError> {
    let Some(func) = vm.heap.get(function).and_then(|o| o.body.as_function()) else {
        return raise(
            ExceptionKind::TypeError,
            format!("'{}' object is not callable", type_name(vm, function)),
        );
    };
    let set = &func.overloads;
    let arity = set.arity();
    let min = set.min_args();
    if args.len() < min || args.len() > arity {
        let name = vm.symbols.resolve(func.name);
        let expected = if min == arity {
            format!("exactly {arity}")
        } else {
            format!("from {min} to {arity}")
        };
        return raise(
            ExceptionKind::TypeError,
            format!(
                "{name}() takes {expected} arguments ({} given)",
                args.len()
            ),
        );
    }

    let missing = arity - args.len();
    for candidate in set.candidates() {
        if missing > candidate.defaults.len() {
            continue;
        }
        let filled = &candidate.defaults[candidate.defaults.len() - missing..];
        let matches = args
            .iter()
            .chain(filled)
            .zip(&candidate.params)
            .all(|(&arg, &param)| accepts(vm, param, arg));
        if matches {
            let mut full = Vec::with_capacity(arity);
            full.extend_from_slice(args);
            full.extend_from_slice(filled);
            trace!(
                "dispatch {}: candidate {} ({})",
                vm.symbols.resolve(func.name),
                candidate.primitive.0,
                vm.primitives[candidate.primitive.0 as usize].name
            );
            return Ok(Selected {
                primitive: candidate.primitive,
                args: full,
                returns: candidate.returns,
            });
        }
    }

    // the validated fallback accepts everything, so only a fallback with
    // too few defaults gets here
    raise(
        ExceptionKind::TypeError,
        format!(
            "{}() missing {missing} required arguments",
            vm.symbols.resolve(func.name)
        ),
    )
}

/// Call a function box with positional arguments.
pub fn call_function(
    vm: &mut VM,
    function: Value,
    args: &[Value],
) -> Result<CallResult, RuntimeError> {
    let selected = select(vm, function, args)?;
    let desc = vm.primitives[selected.primitive.0 as usize];
    debug_assert_eq!(
        desc.arity as usize,
        selected.args.len(),
        "primitive {} registered with the wrong arity",
        desc.name
    );
    let result = (desc.func)(vm, &selected.args)?;

    #[cfg(debug_assertions)]
    if let (CallResult::Return(value), ParamType::Class(class)) = (result, selected.returns) {
        debug_assert!(
            is_subclass(vm, class_of(vm, value), class),
            "primitive {} returned {} where {} was declared",
            desc.name,
            type_name(vm, value),
            crate::lookup::class_name(vm, class)
        );
    }
    Ok(result)
}

/// `receiver.name(*args)`: resolve on the receiver's class and call with
/// the receiver bound as the first argument.
pub fn call_attr(
    vm: &mut VM,
    receiver: Value,
    name: &str,
    args: &[Value],
) -> Result<CallResult, RuntimeError> {
    let symbol = vm.intern(name);
    let LookupResult::Found { value, .. } = getattr(vm, receiver, symbol) else {
        return raise(
            ExceptionKind::TypeError,
            format!(
                "'{}' object has no attribute '{name}'",
                type_name(vm, receiver)
            ),
        );
    };
    let mut bound = Vec::with_capacity(args.len() + 1);
    bound.push(receiver);
    bound.extend_from_slice(args);
    call_function(vm, value, &bound)
}

/// `class.name(*args)` with no implicit receiver, as for `__new__`.
pub fn call_class_attr(
    vm: &mut VM,
    class: Value,
    name: &str,
    args: &[Value],
) -> Result<CallResult, RuntimeError> {
    let symbol = vm.intern(name);
    let LookupResult::Found { value, .. } = class_getattr(vm, class, symbol) else {
        return raise(
            ExceptionKind::TypeError,
            format!(
                "type object '{}' has no attribute '{name}'",
                crate::lookup::class_name(vm, class)
            ),
        );
    };
    call_function(vm, value, args)
}

/// `true` if `receiver`'s class defines `name`.
pub fn has_attr(vm: &VM, receiver: Value, name: &str) -> bool {
    match vm.symbols.lookup(name) {
        Some(symbol) => getattr(vm, receiver, symbol) != LookupResult::None,
        None => false,
    }
}

impl VM {
    #[inline]
    pub fn call_attr(
        &mut self,
        receiver: Value,
        name: &str,
        args: &[Value],
    ) -> Result<CallResult, RuntimeError> {
        call_attr(self, receiver, name, args)
    }

    #[inline]
    pub fn call_function(
        &mut self,
        function: Value,
        args: &[Value],
    ) -> Result<CallResult, RuntimeError> {
        call_function(self, function, args)
    }

    #[inline]
    pub fn call_class_attr(
        &mut self,
        class: Value,
        name: &str,
        args: &[Value],
    ) -> Result<CallResult, RuntimeError> {
        call_class_attr(self, class, name, args)
    }
}
