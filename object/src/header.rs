use bitflags::bitflags;

use crate::Value;

bitflags! {
    /// GC bookkeeping flags stored in the header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HeaderFlags: u8 {
        /// Set by the mark phase, cleared by the sweep.
        const MARKED = 1 << 0;
        /// The class finalizer already ran for this box.
        const FINALIZED = 1 << 1;
    }
}

/// The header at the start of every box.
///
/// Holds the reference to the box's class. The class of a class is `type`,
/// which is its own class.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    class: Value,
    flags: HeaderFlags,
}

impl Header {
    pub fn new(class: Value) -> Self {
        Self {
            class,
            flags: HeaderFlags::empty(),
        }
    }

    #[inline(always)]
    pub fn class(&self) -> Value {
        self.class
    }

    /// Only used while bootstrapping self-referential classes.
    #[inline(always)]
    pub fn set_class(&mut self, class: Value) {
        self.class = class;
    }

    // ── flags ──────────────────────────────────────────────────────

    #[inline(always)]
    pub fn flags(&self) -> HeaderFlags {
        self.flags
    }

    #[inline(always)]
    pub fn is_marked(&self) -> bool {
        self.flags.contains(HeaderFlags::MARKED)
    }

    #[inline(always)]
    pub fn mark(&mut self) {
        self.flags.insert(HeaderFlags::MARKED);
    }

    #[inline(always)]
    pub fn unmark(&mut self) {
        self.flags.remove(HeaderFlags::MARKED);
    }

    #[inline(always)]
    pub fn is_finalized(&self) -> bool {
        self.flags.contains(HeaderFlags::FINALIZED)
    }

    #[inline(always)]
    pub fn set_finalized(&mut self) {
        self.flags.insert(HeaderFlags::FINALIZED);
    }
}
