//! Arena heap with a stop-the-world mark/sweep collector.
//!
//! Boxes live in slots addressed by index. A reference [`Value`] carries
//! the slot's generation, so a reference that outlived its box resolves to
//! `None` instead of aliasing whatever reused the slot.
//!
//! The heap knows nothing about concrete types. It learns the edges of a
//! box from the trace callback of the box's class, and calls the class
//! finalizer (if any) right before reclaiming a box. Consumers provide:
//! - a [`TraceFn`] per class,
//! - a [`RootProvider`] to supply live roots at collection time,
//! - static roots registered once at setup.

use log::{debug, trace};

use object::{Body, BoxObject, Class, FinalizeFn, MAX_GENERATION, TraceFn, Value};

// ── Public API types ──────────────────────────────────────────────────

/// Consumers implement this to provide GC roots.
///
/// Called at the start of a collection to discover live roots from VM
/// state (value stacks, frames, handles held by the embedder, ...).
pub trait RootProvider {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(Value));
}

/// A plain list of roots.
#[derive(Debug, Default, Clone)]
pub struct RootSet {
    pub roots: Vec<Value>,
}

impl RootSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value) {
        self.roots.push(value);
    }
}

impl RootProvider for RootSet {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(Value)) {
        for &root in &self.roots {
            visitor(root);
        }
    }
}

impl RootProvider for Vec<Value> {
    fn visit_roots(&mut self, visitor: &mut dyn FnMut(Value)) {
        for &root in self.iter() {
            visitor(root);
        }
    }
}

// ── Heap settings ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HeapSettings {
    /// Number of slots reserved up front.
    pub initial_capacity: usize,
    /// Allocated bytes (by class instance size) after which a safepoint
    /// triggers a collection.
    pub bytes_before_gc: usize,
    /// Collect at every safepoint regardless of allocation volume.
    pub collect_on_every_safepoint: bool,
}

impl Default for HeapSettings {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            bytes_before_gc: 4 * 1024 * 1024, // 4 MB
            collect_on_every_safepoint: false,
        }
    }
}

impl HeapSettings {
    #[inline]
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.bytes_before_gc == 0 {
            return Err("bytes_before_gc must be > 0");
        }
        if self.initial_capacity > u32::MAX as usize {
            return Err("initial_capacity exceeds the slot index range");
        }
        Ok(())
    }
}

// ── Statistics ────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub collections: usize,
    pub allocated_objects: usize,
    pub freed_objects: usize,
    pub finalized_objects: usize,
    pub live_objects: usize,
    pub live_bytes: usize,
    pub bytes_since_gc: usize,
}

/// Result of a single collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
    pub marked: usize,
    pub freed: usize,
    pub finalized: usize,
}

// ── Heap ──────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Slot {
    generation: u32,
    size: usize,
    object: Option<BoxObject>,
}

#[derive(Debug)]
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    static_roots: Vec<Value>,
    settings: HeapSettings,
    stats: GcStats,
}

impl Heap {
    pub fn new(settings: HeapSettings) -> Result<Self, &'static str> {
        settings.validate()?;
        Ok(Self {
            slots: Vec::with_capacity(settings.initial_capacity),
            free: Vec::new(),
            static_roots: Vec::new(),
            settings,
            stats: GcStats::default(),
        })
    }

    #[inline]
    pub fn settings(&self) -> &HeapSettings {
        &self.settings
    }

    #[inline]
    pub fn stats(&self) -> GcStats {
        self.stats
    }

    #[inline]
    pub fn live_objects(&self) -> usize {
        self.stats.live_objects
    }

    // ── Allocation ────────────────────────────────────────────────────

    /// Allocate a box of `class`, sized by the class's instance size.
    ///
    /// # Panics
    /// if `class` does not resolve to a live class box
    pub fn allocate(&mut self, class: Value, body: Body) -> Value {
        let size = self.expect_class(class).instance_size();
        self.allocate_sized(class, body, size)
    }

    /// Allocate with an explicit size. Bootstrap uses this before the
    /// class of classes exists.
    pub fn allocate_sized(&mut self, class: Value, body: Body, size: usize) -> Value {
        let object = BoxObject::new(class, body);
        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                debug_assert!(slot.object.is_none(), "free list slot is occupied");
                slot.object = Some(object);
                slot.size = size;
                index
            }
            None => {
                let index = u32::try_from(self.slots.len()).expect("heap slot index overflow");
                self.slots.push(Slot {
                    generation: 0,
                    size,
                    object: Some(object),
                });
                index
            }
        };
        self.stats.allocated_objects += 1;
        self.stats.live_objects += 1;
        self.stats.live_bytes += size;
        self.stats.bytes_since_gc += size;
        Value::from_slot(index, self.slots[index as usize].generation)
    }

    // ── Access ────────────────────────────────────────────────────────

    /// Resolve a reference. `None` for fixnums and stale references.
    #[inline]
    pub fn get(&self, value: Value) -> Option<&BoxObject> {
        if !value.is_ref() {
            return None;
        }
        let slot = self.slots.get(value.slot_index() as usize)?;
        if slot.generation != value.slot_generation() {
            return None;
        }
        slot.object.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, value: Value) -> Option<&mut BoxObject> {
        if !value.is_ref() {
            return None;
        }
        let slot = self.slots.get_mut(value.slot_index() as usize)?;
        if slot.generation != value.slot_generation() {
            return None;
        }
        slot.object.as_mut()
    }

    #[inline]
    pub fn contains(&self, value: Value) -> bool {
        self.get(value).is_some()
    }

    /// Resolve a reference the caller already validated.
    ///
    /// # Panics
    /// on fixnums and stale references
    #[inline]
    pub fn object(&self, value: Value) -> &BoxObject {
        match self.get(value) {
            Some(object) => object,
            None => panic!("dangling reference {value:?}"),
        }
    }

    /// # Panics
    /// on fixnums and stale references
    #[inline]
    pub fn object_mut(&mut self, value: Value) -> &mut BoxObject {
        match self.get_mut(value) {
            Some(object) => object,
            None => panic!("dangling reference {value:?}"),
        }
    }

    #[inline]
    pub fn class(&self, value: Value) -> Option<&Class> {
        self.get(value).and_then(|o| o.body.as_class())
    }

    #[inline]
    pub fn class_mut(&mut self, value: Value) -> Option<&mut Class> {
        self.get_mut(value).and_then(|o| o.body.as_class_mut())
    }

    /// # Panics
    /// if `value` is not a live class box
    #[inline]
    pub fn expect_class(&self, value: Value) -> &Class {
        match self.class(value) {
            Some(class) => class,
            None => panic!("{value:?} is not a class"),
        }
    }

    // ── Roots ─────────────────────────────────────────────────────────

    /// Keep `value` alive regardless of reachability. Setup only; there
    /// is no way to unregister.
    pub fn register_static_root(&mut self, value: Value) {
        debug_assert!(self.contains(value), "static root must be a live box");
        if !self.static_roots.contains(&value) {
            self.static_roots.push(value);
        }
    }

    pub fn static_roots(&self) -> &[Value] {
        &self.static_roots
    }

    // ── Collection ────────────────────────────────────────────────────

    #[inline]
    pub fn should_collect(&self) -> bool {
        self.settings.collect_on_every_safepoint
            || self.stats.bytes_since_gc >= self.settings.bytes_before_gc
    }

    /// Run one full trace pass and sweep.
    ///
    /// The caller guarantees no traced structure changes while this runs,
    /// which `&mut self` enforces for everything the heap owns.
    pub fn collect(&mut self, roots: &mut dyn RootProvider) -> Collection {
        let marked = self.mark(roots);
        let (freed, finalized) = self.sweep();

        self.stats.collections += 1;
        self.stats.freed_objects += freed;
        self.stats.finalized_objects += finalized;
        self.stats.bytes_since_gc = 0;

        let result = Collection {
            marked,
            freed,
            finalized,
        };
        debug!(
            "gc #{}: marked {}, freed {}, finalized {}, live {} ({} bytes)",
            self.stats.collections,
            marked,
            freed,
            finalized,
            self.stats.live_objects,
            self.stats.live_bytes
        );
        result
    }

    fn mark(&mut self, roots: &mut dyn RootProvider) -> usize {
        let mut queue: Vec<Value> = self.static_roots.clone();
        roots.visit_roots(&mut |value| queue.push(value));

        let mut marked = 0;
        while let Some(value) = queue.pop() {
            if !value.is_ref() {
                continue;
            }
            let Some(object) = self.get_mut(value) else {
                panic!("trace reached dangling reference {value:?}");
            };
            if object.header.is_marked() {
                continue;
            }
            object.header.mark();
            marked += 1;

            let object = self.object(value);
            let trace_fn = self.trace_fn_of(object.class());
            trace_fn(&mut |child: Value| queue.push(child), object);
        }
        marked
    }

    fn trace_fn_of(&self, class: Value) -> TraceFn {
        self.expect_class(class).trace_fn()
    }

    fn finalize_fn_of(&self, class: Value) -> Option<FinalizeFn> {
        self.expect_class(class).finalize_fn()
    }

    fn sweep(&mut self) -> (usize, usize) {
        let mut dead: Vec<u32> = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(object) = slot.object.as_mut() else {
                continue;
            };
            if object.header.is_marked() {
                object.header.unmark();
            } else {
                dead.push(index as u32);
            }
        }

        // Finalizers run while every dead box is still in place, so a
        // finalizer can still resolve the class of the box it runs for.
        let mut finalized = 0;
        for &index in &dead {
            let slot = &self.slots[index as usize];
            let Some(object) = slot.object.as_ref() else {
                continue;
            };
            let Some(finalize) = self.finalize_fn_of(object.class()) else {
                continue;
            };
            let Some(object) = self.slots[index as usize].object.as_mut() else {
                continue;
            };
            if object.header.is_finalized() {
                continue;
            }
            trace!("finalizing slot {index}");
            finalize(object);
            object.header.set_finalized();
            finalized += 1;
        }

        for &index in &dead {
            let slot = &mut self.slots[index as usize];
            slot.object = None;
            slot.generation = if slot.generation == MAX_GENERATION {
                0
            } else {
                slot.generation + 1
            };
            self.stats.live_objects -= 1;
            self.stats.live_bytes -= slot.size;
            slot.size = 0;
            self.free.push(index);
        }

        (dead.len(), finalized)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use object::{
        BigInt, Body, Class, ClassFlags, Long, Tuple, TupleIterator, body_gc_handler,
        box_gc_handler,
    };

    use super::*;

    struct TestEnv {
        heap: Heap,
        type_class: Value,
        tuple_class: Value,
        iter_class: Value,
        leaf_class: Value,
    }

    fn new_class(heap: &mut Heap, meta: Value, name: &str, trace: object::TraceFn) -> Value {
        let class = Class::new(name, None, trace, 16, ClassFlags::BUILTIN);
        heap.allocate(meta, Body::Class(class))
    }

    fn create_test_env() -> TestEnv {
        let mut heap = Heap::new(HeapSettings {
            initial_capacity: 16,
            bytes_before_gc: 64,
            collect_on_every_safepoint: false,
        })
        .expect("valid settings");
        let placeholder = Value::from_i64(0);
        let type_class = heap.allocate_sized(
            placeholder,
            Body::Class(Class::new("type", None, body_gc_handler, 64, ClassFlags::BUILTIN)),
            64,
        );
        heap.object_mut(type_class).header.set_class(type_class);
        heap.register_static_root(type_class);

        let tuple_class = new_class(&mut heap, type_class, "tuple", body_gc_handler);
        let iter_class = new_class(&mut heap, type_class, "tupleiterator", body_gc_handler);
        let leaf_class = new_class(&mut heap, type_class, "leaf", box_gc_handler);
        for class in [tuple_class, iter_class, leaf_class] {
            heap.register_static_root(class);
        }
        TestEnv {
            heap,
            type_class,
            tuple_class,
            iter_class,
            leaf_class,
        }
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = HeapSettings {
            bytes_before_gc: 0,
            ..Default::default()
        };
        assert!(Heap::new(settings).is_err());
    }

    #[test]
    fn allocation_is_accounted() {
        let mut env = create_test_env();
        let before = env.heap.stats();
        let v = env.heap.allocate(env.leaf_class, Body::None);
        let after = env.heap.stats();
        assert!(env.heap.contains(v));
        assert_eq!(after.live_objects, before.live_objects + 1);
        assert_eq!(after.live_bytes, before.live_bytes + 16);
        assert!(env.heap.should_collect());
    }

    #[test]
    fn unreachable_boxes_are_swept() {
        let mut env = create_test_env();
        let garbage = env.heap.allocate(env.leaf_class, Body::None);
        let kept = env.heap.allocate(env.leaf_class, Body::None);

        let mut roots = RootSet::new();
        roots.push(kept);
        let result = env.heap.collect(&mut roots);

        assert_eq!(result.freed, 1);
        assert!(!env.heap.contains(garbage));
        assert!(env.heap.contains(kept));
        assert!(env.heap.contains(env.type_class));
    }

    #[test]
    fn tuple_keeps_elements_alive() {
        let mut env = create_test_env();
        let a = env.heap.allocate(env.leaf_class, Body::None);
        let b = env.heap.allocate(env.leaf_class, Body::None);
        let tuple = env
            .heap
            .allocate(env.tuple_class, Body::Tuple(Tuple::new(vec![a, Value::from_i64(3), b])));

        let result = env.heap.collect(&mut vec![tuple]);
        assert_eq!(result.freed, 0);
        assert!(env.heap.contains(a));
        assert!(env.heap.contains(b));

        env.heap.collect(&mut RootSet::new());
        assert!(!env.heap.contains(tuple));
        assert!(!env.heap.contains(a));
    }

    #[test]
    fn iterator_keeps_tuple_alive() {
        let mut env = create_test_env();
        let elem = env.heap.allocate(env.leaf_class, Body::None);
        let tuple = env
            .heap
            .allocate(env.tuple_class, Body::Tuple(Tuple::new(vec![elem])));
        let iter = env
            .heap
            .allocate(env.iter_class, Body::TupleIterator(TupleIterator::new(tuple, 1)));

        env.heap.collect(&mut vec![iter]);
        assert!(env.heap.contains(tuple));
        assert!(env.heap.contains(elem));
    }

    #[test]
    fn untraced_field_is_reclaimed() {
        let mut env = create_test_env();
        // a tuple class whose trace callback forgets the elements
        let broken = new_class(&mut env.heap, env.type_class, "broken", box_gc_handler);
        env.heap.register_static_root(broken);
        let elem = env.heap.allocate(env.leaf_class, Body::None);
        let tuple = env
            .heap
            .allocate(broken, Body::Tuple(Tuple::new(vec![elem])));

        env.heap.collect(&mut vec![tuple]);
        assert!(env.heap.contains(tuple));
        assert!(!env.heap.contains(elem));
    }

    #[test]
    fn stale_reference_does_not_alias_reused_slot() {
        let mut env = create_test_env();
        let old = env.heap.allocate(env.leaf_class, Body::None);
        env.heap.collect(&mut RootSet::new());
        let new = env.heap.allocate(env.leaf_class, Body::Bool(true));
        assert_eq!(old.slot_index(), new.slot_index());
        assert!(env.heap.get(old).is_none());
        assert_eq!(env.heap.object(new).body.as_bool(), Some(true));
    }

    #[test]
    fn static_roots_survive_without_references() {
        let mut env = create_test_env();
        let pinned = env.heap.allocate(env.leaf_class, Body::None);
        env.heap.register_static_root(pinned);
        env.heap.register_static_root(pinned);
        assert_eq!(
            env.heap.static_roots().iter().filter(|&&v| v == pinned).count(),
            1
        );
        env.heap.collect(&mut RootSet::new());
        env.heap.collect(&mut RootSet::new());
        assert!(env.heap.contains(pinned));
    }

    static RELEASED: AtomicUsize = AtomicUsize::new(0);

    fn release_long(object: &mut BoxObject) {
        if let Some(long) = object.body.as_long_mut() {
            long.storage_mut().release();
            RELEASED.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn finalizer_runs_once_per_dead_box() {
        let mut env = create_test_env();
        let long_class = env.heap.allocate(
            env.type_class,
            Body::Class(
                Class::new("long", None, box_gc_handler, 32, ClassFlags::BUILTIN)
                    .with_finalizer(release_long),
            ),
        );
        env.heap.register_static_root(long_class);

        let kept = env
            .heap
            .allocate(long_class, Body::Long(Long::new(BigInt::from(7))));
        for n in 0..3 {
            env.heap
                .allocate(long_class, Body::Long(Long::new(BigInt::from(n))));
        }

        let result = env.heap.collect(&mut vec![kept]);
        assert_eq!(result.finalized, 3);
        assert_eq!(RELEASED.load(Ordering::SeqCst), 3);

        let result = env.heap.collect(&mut vec![kept]);
        assert_eq!(result.finalized, 0);
        assert_eq!(RELEASED.load(Ordering::SeqCst), 3);
        assert_eq!(env.heap.stats().finalized_objects, 3);

        let long = env.heap.object(kept).body.as_long().expect("long body");
        assert_eq!(long.value(), &BigInt::from(7));
    }

    #[test]
    #[should_panic(expected = "dangling reference")]
    fn dangling_root_is_fatal() {
        let mut env = create_test_env();
        let old = env.heap.allocate(env.leaf_class, Body::None);
        env.heap.collect(&mut RootSet::new());
        env.heap.collect(&mut vec![old]);
    }
}
