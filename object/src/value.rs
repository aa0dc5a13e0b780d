/// Tag constants.
const FIXNUM_MASK: u64 = 0b1;
const TAG_MASK: u64 = 0b11;
const REF_TAG: u64 = 0b01;

const INDEX_SHIFT: u64 = 2;
const INDEX_MASK: u64 = 0xFFFF_FFFF << INDEX_SHIFT;
const GENERATION_SHIFT: u64 = 34;

/// Largest generation that fits into a reference word.
pub const MAX_GENERATION: u32 = (1 << 30) - 1;

/// Smallest and largest integers representable as a fixnum.
pub const FIXNUM_MIN: i64 = -(1i64 << 62);
pub const FIXNUM_MAX: i64 = (1i64 << 62) - 1;

/// A tagged 64-bit value.
///
/// Encoding:
/// - **Fixnum**:    `...XXXXX0`: 63-bit signed integer (low bit 0).
/// - **Reference**: `...XXXX01`: arena slot of a box. Bits `2..34` hold the
///   slot index, bits `34..64` the slot generation at allocation time.
///
/// A reference never points at memory directly. The heap resolves it and
/// rejects stale references whose generation no longer matches the slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Value(u64);

impl Value {
    #[inline(always)]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    // ── Fixnum ─────────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_fixnum(self) -> bool {
        self.0 & FIXNUM_MASK == 0
    }

    #[inline(always)]
    pub const fn fits_fixnum(n: i64) -> bool {
        n >= FIXNUM_MIN && n <= FIXNUM_MAX
    }

    #[inline(always)]
    pub fn from_i64(n: i64) -> Self {
        debug_assert!(Self::fits_fixnum(n), "fixnum overflow: {n}");
        Self((n << 1) as u64)
    }

    /// Integer payload of a fixnum, `None` for references.
    #[inline(always)]
    pub const fn as_fixnum(self) -> Option<i64> {
        if self.is_fixnum() {
            Some((self.0 as i64) >> 1)
        } else {
            None
        }
    }

    // ── Reference ──────────────────────────────────────────────────

    #[inline(always)]
    pub const fn is_ref(self) -> bool {
        self.0 & TAG_MASK == REF_TAG
    }

    #[inline(always)]
    pub fn from_slot(index: u32, generation: u32) -> Self {
        debug_assert!(generation <= MAX_GENERATION, "generation overflow");
        Self(
            ((generation as u64) << GENERATION_SHIFT)
                | ((index as u64) << INDEX_SHIFT)
                | REF_TAG,
        )
    }

    #[inline(always)]
    pub const fn slot_index(self) -> u32 {
        ((self.0 & INDEX_MASK) >> INDEX_SHIFT) as u32
    }

    #[inline(always)]
    pub const fn slot_generation(self) -> u32 {
        (self.0 >> GENERATION_SHIFT) as u32
    }
}

impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.as_fixnum() {
            Some(n) => write!(f, "Fixnum({n})"),
            None => write!(
                f,
                "Ref({}@{})",
                self.slot_index(),
                self.slot_generation()
            ),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::from_i64(n)
    }
}
