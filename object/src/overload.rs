use crate::{Value, Visitable, Visitor};

/// Index into the VM's primitive table.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PrimitiveIndex(pub u32);

/// Declared type of a parameter or of a return value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Matches any runtime class.
    Any,
    /// Matches the class and its subclasses.
    Class(Value),
}

impl ParamType {
    #[inline]
    pub fn is_any(self) -> bool {
        matches!(self, ParamType::Any)
    }
}

/// One type-guarded native implementation.
#[derive(Debug, Clone)]
pub struct Overload {
    pub primitive: PrimitiveIndex,
    pub params: Vec<ParamType>,
    pub returns: ParamType,
    pub arity: usize,
    /// Values for the trailing `defaults.len()` parameters.
    pub defaults: Vec<Value>,
}

impl Overload {
    /// A candidate with wildcard parameters, no defaults.
    pub fn generic(primitive: PrimitiveIndex, arity: usize, returns: ParamType) -> Self {
        Self {
            primitive,
            params: vec![ParamType::Any; arity],
            returns,
            arity,
            defaults: Vec::new(),
        }
    }

    /// A candidate guarded by `params`; arity is `params.len()`.
    pub fn typed(primitive: PrimitiveIndex, params: Vec<ParamType>, returns: ParamType) -> Self {
        let arity = params.len();
        Self {
            primitive,
            params,
            returns,
            arity,
            defaults: Vec::new(),
        }
    }

    pub fn with_defaults(mut self, defaults: Vec<Value>) -> Self {
        self.defaults = defaults;
        self
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        self.params.iter().all(|p| p.is_any())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadError {
    Empty,
    /// The last candidate does not take the wildcard for every parameter.
    MissingFallback,
    ArityMismatch { expected: usize, found: usize },
    ParamCount { arity: usize, params: usize },
    TooManyDefaults { arity: usize, defaults: usize },
}

impl core::fmt::Display for OverloadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OverloadError::Empty => write!(f, "overload set has no candidates"),
            OverloadError::MissingFallback => {
                write!(f, "last candidate must accept any type for every parameter")
            }
            OverloadError::ArityMismatch { expected, found } => write!(
                f,
                "candidates disagree on arity: expected {expected}, found {found}"
            ),
            OverloadError::ParamCount { arity, params } => write!(
                f,
                "candidate declares {params} parameter types for arity {arity}"
            ),
            OverloadError::TooManyDefaults { arity, defaults } => {
                write!(f, "{defaults} defaults for arity {arity}")
            }
        }
    }
}

impl std::error::Error for OverloadError {}

/// Ordered candidates registered under one attribute name.
///
/// Dispatch scans in registration order, so specialised candidates go
/// first and the wildcard fallback goes last.
#[derive(Debug, Clone, Default)]
pub struct OverloadSet {
    candidates: Vec<Overload>,
}

impl OverloadSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, overload: Overload) {
        self.candidates.push(overload);
    }

    pub fn candidates(&self) -> &[Overload] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Shared arity of all candidates. Only meaningful after [`validate`].
    ///
    /// [`validate`]: Self::validate
    pub fn arity(&self) -> usize {
        self.candidates.first().map_or(0, |c| c.arity)
    }

    /// Smallest accepted argument count, counting the fallback's defaults.
    pub fn min_args(&self) -> usize {
        self.candidates
            .last()
            .map_or(0, |c| c.arity - c.defaults.len())
    }

    pub fn validate(&self) -> Result<(), OverloadError> {
        let last = self.candidates.last().ok_or(OverloadError::Empty)?;
        let arity = last.arity;
        for candidate in &self.candidates {
            if candidate.arity != arity {
                return Err(OverloadError::ArityMismatch {
                    expected: arity,
                    found: candidate.arity,
                });
            }
            if candidate.params.len() != candidate.arity {
                return Err(OverloadError::ParamCount {
                    arity: candidate.arity,
                    params: candidate.params.len(),
                });
            }
            if candidate.defaults.len() > candidate.arity {
                return Err(OverloadError::TooManyDefaults {
                    arity: candidate.arity,
                    defaults: candidate.defaults.len(),
                });
            }
        }
        if !last.is_fallback() {
            return Err(OverloadError::MissingFallback);
        }
        Ok(())
    }
}

impl Visitable for OverloadSet {
    fn visit_edges(&self, visitor: &mut dyn Visitor) {
        for candidate in &self.candidates {
            for param in candidate.params.iter().chain([&candidate.returns]) {
                if let ParamType::Class(class) = *param {
                    visitor.visit(class);
                }
            }
            for &default in &candidate.defaults {
                visitor.visit(default);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(n: u32) -> ParamType {
        ParamType::Class(Value::from_slot(n, 0))
    }

    #[test]
    fn fallback_must_come_last() {
        let mut set = OverloadSet::new();
        set.register(Overload::generic(PrimitiveIndex(0), 2, ParamType::Any));
        set.register(Overload::typed(
            PrimitiveIndex(1),
            vec![class(1), class(2)],
            ParamType::Any,
        ));
        assert_eq!(set.validate(), Err(OverloadError::MissingFallback));
    }

    #[test]
    fn empty_set_is_invalid() {
        assert_eq!(OverloadSet::new().validate(), Err(OverloadError::Empty));
    }

    #[test]
    fn arity_must_agree() {
        let mut set = OverloadSet::new();
        set.register(Overload::typed(PrimitiveIndex(0), vec![class(1)], ParamType::Any));
        set.register(Overload::generic(PrimitiveIndex(1), 2, ParamType::Any));
        assert_eq!(
            set.validate(),
            Err(OverloadError::ArityMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn defaults_lower_min_args() {
        let mut set = OverloadSet::new();
        set.register(
            Overload::generic(PrimitiveIndex(0), 2, ParamType::Any)
                .with_defaults(vec![Value::from_i64(0)]),
        );
        assert!(set.validate().is_ok());
        assert_eq!(set.arity(), 2);
        assert_eq!(set.min_args(), 1);
    }

    #[test]
    fn visits_classes_and_defaults() {
        let mut set = OverloadSet::new();
        set.register(Overload::typed(
            PrimitiveIndex(0),
            vec![class(3), ParamType::Any],
            class(4),
        ));
        set.register(
            Overload::generic(PrimitiveIndex(1), 2, ParamType::Any)
                .with_defaults(vec![Value::from_slot(9, 1)]),
        );
        let mut seen = Vec::new();
        set.visit_edges(&mut |v: Value| seen.push(v));
        assert_eq!(
            seen,
            vec![
                Value::from_slot(3, 0),
                Value::from_slot(4, 0),
                Value::from_slot(9, 1)
            ]
        );
    }
}
