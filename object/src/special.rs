use crate::Value;

/// Well-known singleton objects and builtin classes.
///
/// Holds references to boxes the runtime needs for core operations and for
/// resolving the class of values that carry no header (fixnums).
///
/// **Objects are not allocated here.** Bootstrap allocates them on the heap
/// first and then stores the references.
#[derive(Debug, Clone)]
pub struct SpecialObjects {
    // ── Singletons ─────────────────────────────────────────────────
    /// The canonical `None` object.
    pub none: Value,

    /// The canonical `True` object.
    pub true_obj: Value,

    /// The canonical `False` object.
    pub false_obj: Value,

    // ── Classes ────────────────────────────────────────────────────
    /// Root of every ancestor chain.
    pub object_class: Value,

    /// Class of all classes, its own class.
    pub type_class: Value,

    /// Class of fixnums.
    pub int_class: Value,

    pub bool_class: Value,

    pub none_class: Value,

    pub str_class: Value,

    pub slice_class: Value,

    /// Class of builtin function boxes (overload sets).
    pub function_class: Value,

    pub tuple_class: Value,

    /// Shared descriptor for tuple iterators. Registered as a static root.
    pub tuple_iterator_class: Value,

    pub long_class: Value,
}

impl SpecialObjects {
    /// Every builtin class, in bootstrap order.
    pub fn classes(&self) -> [Value; 11] {
        [
            self.type_class,
            self.object_class,
            self.function_class,
            self.str_class,
            self.int_class,
            self.bool_class,
            self.none_class,
            self.slice_class,
            self.tuple_iterator_class,
            self.tuple_class,
            self.long_class,
        ]
    }

    #[inline]
    pub fn bool_value(&self, b: bool) -> Value {
        if b { self.true_obj } else { self.false_obj }
    }
}
