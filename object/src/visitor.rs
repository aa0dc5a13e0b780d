use crate::{BoxObject, Value};

/// Receives the outgoing references of a box during a trace pass.
pub trait Visitor {
    fn visit(&mut self, value: Value);
}

impl<F: FnMut(Value)> Visitor for F {
    #[inline]
    fn visit(&mut self, value: Value) {
        self(value)
    }
}

/// Enumerates the reference fields a payload owns or shares.
///
/// Only direct edges are visited. The collector decides what to do with
/// them. Fixnums may be passed as well, visitors ignore them.
pub trait Visitable {
    fn visit_edges(&self, visitor: &mut dyn Visitor);
}

/// Per-class trace callback. The collector calls it for every box it has
/// proven reachable.
///
/// Contract: call [`box_gc_handler`] first, then pass every additional
/// reference field to `visitor`. A reference that is not visited is
/// invisible to the collector.
pub type TraceFn = fn(visitor: &mut dyn Visitor, object: &BoxObject);

/// Per-class finalization hook, run once by the sweep right before the box
/// is reclaimed. Releases storage the collector does not manage itself.
pub type FinalizeFn = fn(object: &mut BoxObject);

/// Base tracer: the class pointer in the header.
pub fn box_gc_handler(visitor: &mut dyn Visitor, object: &BoxObject) {
    visitor.visit(object.header.class());
}

/// Trace callback that delegates to the payload's [`Visitable`] impl.
/// Used by classes and functions.
pub fn body_gc_handler(visitor: &mut dyn Visitor, object: &BoxObject) {
    box_gc_handler(visitor, object);
    object.body.visit_edges(visitor);
}
