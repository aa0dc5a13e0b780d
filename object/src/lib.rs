//! Box and class model of the runtime.
//!
//! Everything here is plain data. Allocation and reclamation live in the
//! `heap` crate, dispatch and the builtin types in `vm`.

mod class;
mod header;
mod interning;
mod objects;
mod overload;
mod special;
mod value;
mod visitor;

pub use class::{Class, ClassFlags};
pub use header::{Header, HeaderFlags};
pub use interning::{InternedStrings, Symbol};
pub use objects::{
    Body, BoxObject, Function, Long, LongStorage, Slice, SliceError, Str, Tuple,
    TupleIterator,
};
pub use overload::{Overload, OverloadError, OverloadSet, ParamType, PrimitiveIndex};
pub use special::SpecialObjects;
pub use value::{FIXNUM_MAX, FIXNUM_MIN, MAX_GENERATION, Value};
pub use visitor::{FinalizeFn, TraceFn, Visitable, Visitor, body_gc_handler, box_gc_handler};

pub use num_bigint::BigInt;
