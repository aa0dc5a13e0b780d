use num_bigint::BigInt;

use crate::{Class, Header, OverloadSet, Symbol, Value, Visitable, Visitor};

// ── Box ────────────────────────────────────────────────────────────

/// A heap value: header plus payload.
#[derive(Debug)]
pub struct BoxObject {
    pub header: Header,
    pub body: Body,
}

/// Payload of a box. The class in the header decides which variant is
/// legal; the trace callbacks rely on that pairing.
#[derive(Debug)]
pub enum Body {
    Class(Class),
    Function(Function),
    Tuple(Tuple),
    TupleIterator(TupleIterator),
    Long(Long),
    Str(Str),
    Slice(Slice),
    Bool(bool),
    None,
}

impl BoxObject {
    pub fn new(class: Value, body: Body) -> Self {
        Self {
            header: Header::new(class),
            body,
        }
    }

    #[inline]
    pub fn class(&self) -> Value {
        self.header.class()
    }
}

macro_rules! body_accessors {
    ($($variant:ident => $as_ref:ident, $as_mut:ident: $ty:ty;)*) => {
        impl Body {
            $(
                #[inline]
                pub fn $as_ref(&self) -> Option<&$ty> {
                    match self {
                        Body::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }

                #[inline]
                pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        Body::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            )*
        }
    };
}

body_accessors! {
    Class => as_class, as_class_mut: Class;
    Function => as_function, as_function_mut: Function;
    Tuple => as_tuple, as_tuple_mut: Tuple;
    TupleIterator => as_tuple_iterator, as_tuple_iterator_mut: TupleIterator;
    Long => as_long, as_long_mut: Long;
    Str => as_str, as_str_mut: Str;
    Slice => as_slice, as_slice_mut: Slice;
}

impl Body {
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Body::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl Visitable for Body {
    fn visit_edges(&self, visitor: &mut dyn Visitor) {
        match self {
            Body::Class(class) => class.visit_edges(visitor),
            Body::Function(function) => function.visit_edges(visitor),
            Body::Tuple(tuple) => tuple.visit_edges(visitor),
            Body::TupleIterator(iter) => iter.visit_edges(visitor),
            // nothing to visit
            Body::Long(_) | Body::Str(_) | Body::Slice(_) | Body::Bool(_) | Body::None => (),
        }
    }
}

// ── Function ───────────────────────────────────────────────────────

/// A builtin function: the overload set installed under one attribute.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Symbol,
    pub overloads: OverloadSet,
}

impl Visitable for Function {
    fn visit_edges(&self, visitor: &mut dyn Visitor) {
        self.overloads.visit_edges(visitor);
    }
}

// ── Tuple ──────────────────────────────────────────────────────────

/// Fixed-length, immutable sequence of values.
#[derive(Debug, Clone)]
pub struct Tuple {
    elements: Box<[Value]>,
}

impl Tuple {
    pub fn new(elements: impl Into<Box<[Value]>>) -> Self {
        Self {
            elements: elements.into(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.elements.get(index).copied()
    }
}

impl Visitable for Tuple {
    fn visit_edges(&self, visitor: &mut dyn Visitor) {
        for &element in self.elements.iter() {
            visitor.visit(element);
        }
    }
}

/// Single-pass cursor over a tuple.
///
/// Holds the tuple alive. `position` only grows; once it reaches `len`
/// the iterator stays exhausted.
#[derive(Debug, Clone)]
pub struct TupleIterator {
    tuple: Value,
    len: usize,
    position: usize,
}

impl TupleIterator {
    pub fn new(tuple: Value, len: usize) -> Self {
        Self {
            tuple,
            len,
            position: 0,
        }
    }

    #[inline]
    pub fn tuple(&self) -> Value {
        self.tuple
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.position < self.len
    }

    /// Claim the current position and move past it.
    #[inline]
    pub fn advance(&mut self) -> Option<usize> {
        if !self.has_next() {
            return None;
        }
        let index = self.position;
        self.position += 1;
        Some(index)
    }
}

impl Visitable for TupleIterator {
    fn visit_edges(&self, visitor: &mut dyn Visitor) {
        visitor.visit(self.tuple);
    }
}

// ── Long ───────────────────────────────────────────────────────────

/// Owning handle for big-integer digits allocated outside the managed heap.
///
/// Released exactly once, by the class finalizer. Reading released storage
/// or releasing twice is a contract violation.
#[derive(Debug)]
pub struct LongStorage(Option<BigInt>);

impl LongStorage {
    pub fn new(value: BigInt) -> Self {
        Self(Some(value))
    }

    #[inline]
    pub fn get(&self) -> &BigInt {
        match &self.0 {
            Some(value) => value,
            None => panic!("long storage used after release"),
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.0.is_none()
    }

    /// # Panics
    /// if the storage was already released
    pub fn release(&mut self) {
        let taken = self.0.take();
        assert!(taken.is_some(), "long storage released twice");
        drop(taken);
    }
}

/// Arbitrary-precision integer payload.
#[derive(Debug)]
pub struct Long {
    storage: LongStorage,
}

impl Long {
    pub fn new(value: BigInt) -> Self {
        Self {
            storage: LongStorage::new(value),
        }
    }

    #[inline]
    pub fn value(&self) -> &BigInt {
        self.storage.get()
    }

    #[inline]
    pub fn storage_mut(&mut self) -> &mut LongStorage {
        &mut self.storage
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.storage.is_released()
    }
}

// ── Str ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Str {
    text: Box<str>,
}

impl Str {
    pub fn new(text: impl Into<Box<str>>) -> Self {
        Self { text: text.into() }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

// ── Slice ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceError {
    ZeroStep,
}

/// A `start:stop:step` subscript. Missing parts are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Self { start, stop, step }
    }

    /// Normalize against a sequence of `len` elements.
    ///
    /// Negative bounds count from the end, out-of-range bounds are clamped.
    /// For a positive step the result satisfies `0 <= start` and
    /// `stop <= len`; for a negative step `start < len` and `-1 <= stop`.
    pub fn indices(&self, len: i64) -> Result<(i64, i64, i64), SliceError> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(SliceError::ZeroStep);
        }
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };

        let clamp = |bound: i64| {
            if bound < 0 {
                (bound + len).max(lower)
            } else {
                bound.min(upper)
            }
        };

        let start = match self.start {
            Some(start) => clamp(start),
            None if step < 0 => upper,
            None => lower,
        };
        let stop = match self.stop {
            Some(stop) => clamp(stop),
            None if step < 0 => lower,
            None => upper,
        };
        Ok((start, stop, step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterator_position_only_grows() {
        let mut iter = TupleIterator::new(Value::from_slot(0, 0), 2);
        assert_eq!(iter.advance(), Some(0));
        assert_eq!(iter.advance(), Some(1));
        assert_eq!(iter.advance(), None);
        assert_eq!(iter.advance(), None);
        assert_eq!(iter.position(), 2);
        assert!(!iter.has_next());
    }

    #[test]
    fn empty_iterator_is_exhausted() {
        let iter = TupleIterator::new(Value::from_slot(0, 0), 0);
        assert!(!iter.has_next());
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn long_storage_release_is_single_shot() {
        let mut long = Long::new(BigInt::from(5));
        long.storage_mut().release();
        assert!(long.is_released());
        long.storage_mut().release();
    }

    #[test]
    fn slice_defaults() {
        let s = Slice::default();
        assert_eq!(s.indices(5), Ok((0, 5, 1)));
        let rev = Slice::new(None, None, Some(-1));
        assert_eq!(rev.indices(5), Ok((4, -1, -1)));
    }

    #[test]
    fn slice_negative_and_clamped_bounds() {
        let s = Slice::new(Some(-2), Some(100), None);
        assert_eq!(s.indices(5), Ok((3, 5, 1)));
        let s = Slice::new(Some(-100), Some(-1), Some(2));
        assert_eq!(s.indices(5), Ok((0, 4, 2)));
        let s = Slice::new(Some(10), Some(-10), Some(-2));
        assert_eq!(s.indices(5), Ok((4, -1, -2)));
    }

    #[test]
    fn slice_zero_step() {
        let s = Slice::new(None, None, Some(0));
        assert_eq!(s.indices(3), Err(SliceError::ZeroStep));
    }

    #[test]
    fn tuple_visits_every_element() {
        let elems = vec![Value::from_i64(1), Value::from_slot(4, 0)];
        let tuple = Tuple::new(elems.clone());
        let mut seen = Vec::new();
        tuple.visit_edges(&mut |v: Value| seen.push(v));
        assert_eq!(seen, elems);
    }
}
