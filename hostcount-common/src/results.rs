//! Result slots for the arithmetic harness
//!
//! A small array of 64-bit cells, one per named result. Handlers store into
//! them; the control plane reads them from outside the invocation.

use core::sync::atomic::{AtomicU64, Ordering};

/// Number of result slots, matching the kernel array map
pub const RESULTS_CAPACITY: usize = 8;

/// Named slot indices
pub mod slot {
    pub const SUM: u32 = 0;
    pub const DIFFERENCE: u32 = 1;
    pub const PRODUCT: u32 = 2;
    pub const QUOTIENT: u32 = 3;
    pub const REMAINDER: u32 = 4;

    /// Slot names in index order
    pub const NAMES: [(u32, &str); 5] = [
        (SUM, "sum"),
        (DIFFERENCE, "difference"),
        (PRODUCT, "product"),
        (QUOTIENT, "quotient"),
        (REMAINDER, "remainder"),
    ];
}

pub struct ResultsSlots<const N: usize = RESULTS_CAPACITY> {
    cells: [AtomicU64; N],
}

#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicU64 = AtomicU64::new(0);

impl<const N: usize> ResultsSlots<N> {
    pub const fn new() -> Self {
        Self { cells: [ZERO; N] }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Store `value` into `index`. An out-of-range index behaves like a
    /// missed map lookup: nothing is written and `false` is returned.
    pub fn store(&self, index: u32, value: u64) -> bool {
        match self.cells.get(index as usize) {
            Some(cell) => {
                cell.store(value, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn load(&self, index: u32) -> Option<u64> {
        self.cells
            .get(index as usize)
            .map(|cell| cell.load(Ordering::Acquire))
    }
}

impl<const N: usize> Default for ResultsSlots<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for ResultsSlots<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.cells.iter().map(|c| c.load(Ordering::Relaxed)))
            .finish()
    }
}

/// Results of one harness invocation.
///
/// Uses the kernel's unsigned 64-bit semantics: arithmetic wraps, division
/// by zero yields 0 and modulo by zero leaves the dividend unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arithmetic {
    pub sum: u64,
    pub difference: u64,
    pub product: u64,
    pub quotient: u64,
    pub remainder: u64,
}

impl Arithmetic {
    /// `lhs` is the first operand (10 in the harness), `rhs` the second (20).
    /// Difference, quotient and remainder take `rhs` as the left side.
    pub const fn compute(lhs: u64, rhs: u64) -> Self {
        let quotient = match rhs.checked_div(lhs) {
            Some(q) => q,
            None => 0,
        };
        let remainder = match rhs.checked_rem(lhs) {
            Some(r) => r,
            None => rhs,
        };
        Self {
            sum: lhs.wrapping_add(rhs),
            difference: rhs.wrapping_sub(lhs),
            product: lhs.wrapping_mul(rhs),
            quotient,
            remainder,
        }
    }

    /// Write each result into its named slot, once.
    pub fn store_into<const N: usize>(&self, slots: &ResultsSlots<N>) {
        slots.store(slot::SUM, self.sum);
        slots.store(slot::DIFFERENCE, self.difference);
        slots.store(slot::PRODUCT, self.product);
        slots.store(slot::QUOTIENT, self.quotient);
        slots.store(slot::REMAINDER, self.remainder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_values() {
        let r = Arithmetic::compute(10, 20);
        assert_eq!(r.sum, 30);
        assert_eq!(r.difference, 10);
        assert_eq!(r.product, 200);
        assert_eq!(r.quotient, 2);
        assert_eq!(r.remainder, 0);
    }

    #[test]
    fn test_division_by_zero_follows_kernel() {
        let r = Arithmetic::compute(0, 20);
        assert_eq!(r.quotient, 0);
        assert_eq!(r.remainder, 20);
    }

    #[test]
    fn test_wrapping() {
        let r = Arithmetic::compute(20, 10);
        assert_eq!(r.difference, u64::MAX - 9);
    }

    #[test]
    fn test_store_out_of_range_is_noop() {
        let slots: ResultsSlots<2> = ResultsSlots::new();
        assert!(slots.store(1, 5));
        assert!(!slots.store(2, 5));
        assert_eq!(slots.load(1), Some(5));
        assert_eq!(slots.load(2), None);
    }

    #[test]
    fn test_store_into_fills_named_slots() {
        let slots = ResultsSlots::<RESULTS_CAPACITY>::new();
        Arithmetic::compute(10, 20).store_into(&slots);

        let values: Vec<_> = slot::NAMES
            .iter()
            .map(|(idx, _)| slots.load(*idx).unwrap())
            .collect();
        assert_eq!(values, vec![30, 10, 200, 2, 0]);
        assert_eq!(slots.load(5), Some(0));
    }
}
