//! Fixed-capacity lock-free counting table
//!
//! Keys are 32-bit and counters 64-bit. Storage is a fixed array of slots
//! using open addressing with linear probing; every probe sequence is
//! bounded by the capacity. Slots are never freed, so a probe that reaches
//! an empty slot proves the key is absent.
//!
//! ```text
//! ┌───────────────┬───────────────┬───────────────┬─────┐
//! │ key  | count  │ key  | count  │ key  | count  │ ... │   N slots
//! │ Atomic Atomic │ Atomic Atomic │ Atomic Atomic │     │
//! └───────────────┴───────────────┴───────────────┴─────┘
//! ```
//!
//! Keys are claimed with compare-and-swap and counters advance with
//! `fetch_add`; there is no lock anywhere.

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Default capacity, matching the kernel map's `max_entries`
pub const COUNTER_CAPACITY: usize = 1024;

/// Key cells hold a `u32` widened to `u64`, so this value never collides
/// with a real key.
const EMPTY_KEY: u64 = u64::MAX;

struct Slot {
    key: AtomicU64,
    count: AtomicU64,
}

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: Slot = Slot {
    key: AtomicU64::new(EMPTY_KEY),
    count: AtomicU64::new(0),
};

/// What a handler may do with a key it has not seen before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPolicy {
    /// Only keys seeded by the control plane are counted.
    #[default]
    LookupOnly,
    /// A missed key claims a free slot on first sight. Diverges from the
    /// kernel's bounded semantics, where handlers never insert.
    LookupOrInsert,
}

impl InsertPolicy {
    /// Value stored in the `CONTROL` map's policy slot.
    pub const fn as_raw(self) -> u32 {
        match self {
            InsertPolicy::LookupOnly => 0,
            InsertPolicy::LookupOrInsert => 1,
        }
    }

    /// Unknown values fall back to `LookupOnly`.
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => InsertPolicy::LookupOrInsert,
            _ => InsertPolicy::LookupOnly,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            InsertPolicy::LookupOnly => "lookup_only",
            InsertPolicy::LookupOrInsert => "lookup_or_insert",
        }
    }
}

/// Outcome of [`CountingTable::increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    /// The key existed; carries the counter value after the add.
    Updated(u64),
    /// The key was claimed by this call and counted once.
    Inserted,
    /// The key is absent and was not inserted.
    NotFound,
}

/// Add one to a counter cell, then report the cell's value.
///
/// The add's return value is never consumed, so it lowers to the plain
/// atomic add available on every BPF CPU version. Under contention the
/// reported value may already include other CPUs' increments.
#[inline(always)]
pub fn bump(counter: &AtomicU64) -> Increment {
    counter.fetch_add(1, Ordering::Relaxed);
    Increment::Updated(counter.load(Ordering::Relaxed))
}

/// Every slot is taken by another key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFull {
    pub capacity: usize,
}

enum Probe {
    Found(usize),
    Vacant,
    Exhausted,
}

pub struct CountingTable<const N: usize = COUNTER_CAPACITY> {
    slots: [Slot; N],
    len: AtomicUsize,
    policy: InsertPolicy,
}

impl<const N: usize> CountingTable<N> {
    const NON_EMPTY: () = assert!(N > 0, "counting table capacity must be non-zero");

    /// Create an empty lookup-only table.
    pub const fn new() -> Self {
        Self::with_policy(InsertPolicy::LookupOnly)
    }

    pub const fn with_policy(policy: InsertPolicy) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        Self {
            slots: [EMPTY_SLOT; N],
            len: AtomicUsize::new(0),
            policy,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub const fn policy(&self) -> InsertPolicy {
        self.policy
    }

    /// Number of keys present.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add `key` with a zero counter. Control-plane operation; seeding a
    /// key twice leaves the existing counter untouched.
    pub fn seed(&self, key: u32) -> Result<(), TableFull> {
        self.claim(key).map(|_| ())
    }

    /// Atomically add one to `key`'s counter.
    pub fn increment(&self, key: u32) -> Increment {
        match self.probe(key) {
            Probe::Found(idx) => {
                let prev = self.slots[idx].count.fetch_add(1, Ordering::Relaxed);
                Increment::Updated(prev.wrapping_add(1))
            }
            Probe::Vacant | Probe::Exhausted => match self.policy {
                InsertPolicy::LookupOnly => Increment::NotFound,
                InsertPolicy::LookupOrInsert => match self.claim(key) {
                    Ok((idx, claimed)) => {
                        let prev = self.slots[idx].count.fetch_add(1, Ordering::Relaxed);
                        if claimed {
                            Increment::Inserted
                        } else {
                            Increment::Updated(prev.wrapping_add(1))
                        }
                    }
                    Err(TableFull { .. }) => Increment::NotFound,
                },
            },
        }
    }

    /// Current counter for `key`, if present.
    pub fn get(&self, key: u32) -> Option<u64> {
        match self.probe(key) {
            Probe::Found(idx) => Some(self.slots[idx].count.load(Ordering::Relaxed)),
            Probe::Vacant | Probe::Exhausted => None,
        }
    }

    pub fn contains(&self, key: u32) -> bool {
        matches!(self.probe(key), Probe::Found(_))
    }

    /// Present keys and their counters. Each cell is read atomically; the
    /// iteration as a whole is not a consistent snapshot.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.slots.iter().filter_map(|slot| {
            let key = slot.key.load(Ordering::Acquire);
            if key == EMPTY_KEY {
                None
            } else {
                Some((key as u32, slot.count.load(Ordering::Relaxed)))
            }
        })
    }

    fn probe(&self, key: u32) -> Probe {
        let wanted = key as u64;
        let start = bucket::<N>(key);

        for step in 0..N {
            let idx = (start + step) % N;
            match self.slots[idx].key.load(Ordering::Acquire) {
                k if k == wanted => return Probe::Found(idx),
                EMPTY_KEY => return Probe::Vacant,
                _ => {}
            }
        }
        Probe::Exhausted
    }

    /// Returns the slot holding `key` and whether this call claimed it.
    fn claim(&self, key: u32) -> Result<(usize, bool), TableFull> {
        let wanted = key as u64;
        let start = bucket::<N>(key);

        for step in 0..N {
            let idx = (start + step) % N;
            let cell = &self.slots[idx].key;
            match cell.compare_exchange(EMPTY_KEY, wanted, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => {
                    self.len.fetch_add(1, Ordering::AcqRel);
                    return Ok((idx, true));
                }
                Err(current) if current == wanted => return Ok((idx, false)),
                Err(_) => {}
            }
        }
        Err(TableFull { capacity: N })
    }
}

impl<const N: usize> Default for CountingTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for CountingTable<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CountingTable")
            .field("capacity", &N)
            .field("len", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}

/// FNV-1a over the key bytes.
#[inline(always)]
fn bucket<const N: usize>(key: u32) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in key.to_ne_bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % N as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_counter_cell() {
        let cell = AtomicU64::new(41);
        assert_eq!(bump(&cell), Increment::Updated(42));
        assert_eq!(cell.load(Ordering::Relaxed), 42);

        let wrapped = AtomicU64::new(u64::MAX);
        assert_eq!(bump(&wrapped), Increment::Updated(0));
    }

    #[test]
    fn test_increment_seeded_key() {
        let table: CountingTable<16> = CountingTable::new();
        table.seed(7).unwrap();

        assert_eq!(table.increment(7), Increment::Updated(1));
        assert_eq!(table.increment(7), Increment::Updated(2));
        assert_eq!(table.get(7), Some(2));
    }

    #[test]
    fn test_absent_key_is_not_inserted() {
        let table: CountingTable<16> = CountingTable::new();
        table.seed(1).unwrap();
        table.increment(1);

        assert_eq!(table.increment(2), Increment::NotFound);
        assert_eq!(table.get(2), None);
        assert_eq!(table.get(1), Some(1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let table: CountingTable<4> = CountingTable::new();
        table.seed(9).unwrap();
        table.increment(9);
        table.seed(9).unwrap();

        assert_eq!(table.get(9), Some(1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_full_table_rejects_new_keys() {
        let table: CountingTable<4> = CountingTable::new();
        for key in 0..4 {
            table.seed(key).unwrap();
        }

        assert_eq!(table.seed(99), Err(TableFull { capacity: 4 }));
        assert_eq!(table.increment(99), Increment::NotFound);
        for key in 0..4 {
            assert_eq!(table.increment(key), Increment::Updated(1));
        }
    }

    #[test]
    fn test_key_zero_and_max_are_valid() {
        let table: CountingTable<8> = CountingTable::new();
        table.seed(0).unwrap();
        table.seed(u32::MAX).unwrap();

        assert_eq!(table.increment(0), Increment::Updated(1));
        assert_eq!(table.increment(u32::MAX), Increment::Updated(1));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_lookup_or_insert() {
        let table: CountingTable<2> = CountingTable::with_policy(InsertPolicy::LookupOrInsert);

        assert_eq!(table.increment(5), Increment::Inserted);
        assert_eq!(table.increment(5), Increment::Updated(2));
        assert_eq!(table.increment(6), Increment::Inserted);
        assert_eq!(table.increment(7), Increment::NotFound);
        assert_eq!(table.get(5), Some(2));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_iter_lists_present_keys() {
        let table: CountingTable<8> = CountingTable::new();
        table.seed(3).unwrap();
        table.seed(4).unwrap();
        table.increment(4);

        let mut entries: Vec<_> = table.iter().collect();
        entries.sort();
        assert_eq!(entries, vec![(3, 0), (4, 1)]);
    }

    #[test]
    fn test_policy_raw_roundtrip() {
        assert_eq!(
            InsertPolicy::from_raw(InsertPolicy::LookupOrInsert.as_raw()),
            InsertPolicy::LookupOrInsert
        );
        assert_eq!(InsertPolicy::from_raw(42), InsertPolicy::LookupOnly);
    }
}
