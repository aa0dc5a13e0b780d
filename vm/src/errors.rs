use thiserror::Error;

/// Kind of a language-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    TypeError,
    IndexError,
    ValueError,
    StopIteration,
}

impl ExceptionKind {
    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::ValueError => "ValueError",
            ExceptionKind::StopIteration => "StopIteration",
        }
    }
}

/// A failure signalled by a builtin. Propagation belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("TypeError: {0}")]
    TypeError(String),
    #[error("IndexError: {0}")]
    IndexError(String),
    #[error("ValueError: {0}")]
    ValueError(String),
    #[error("StopIteration")]
    StopIteration,
}

impl RuntimeError {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        match kind {
            ExceptionKind::TypeError => RuntimeError::TypeError(message.into()),
            ExceptionKind::IndexError => RuntimeError::IndexError(message.into()),
            ExceptionKind::ValueError => RuntimeError::ValueError(message.into()),
            ExceptionKind::StopIteration => RuntimeError::StopIteration,
        }
    }

    pub fn kind(&self) -> ExceptionKind {
        match self {
            RuntimeError::TypeError(_) => ExceptionKind::TypeError,
            RuntimeError::IndexError(_) => ExceptionKind::IndexError,
            RuntimeError::ValueError(_) => ExceptionKind::ValueError,
            RuntimeError::StopIteration => ExceptionKind::StopIteration,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RuntimeError::TypeError(msg)
            | RuntimeError::IndexError(msg)
            | RuntimeError::ValueError(msg) => msg,
            RuntimeError::StopIteration => "",
        }
    }
}

/// Signal a failure of `kind`. Every builtin raises through here.
#[inline]
pub fn raise<T>(kind: ExceptionKind, message: impl Into<String>) -> Result<T, RuntimeError> {
    Err(RuntimeError::new(kind, message))
}
