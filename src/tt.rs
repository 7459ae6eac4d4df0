//! Transposition table.
//!
//! A fixed-capacity, direct-mapped table: the slot index comes from the low
//! bits of the key after mixing in the high half, and each entry stores the
//! full key so collisions are detected on probe. Replacement is
//! depth-preferred: a colliding entry is only evicted by an equal-or-deeper
//! search, while a same-key store always updates.

use crate::mv::Move;

/// Smallest and largest permitted capacities (powers of two).
pub const MIN_CAPACITY: usize = 1 << 12;
pub const MAX_CAPACITY: usize = 1 << 22;

/// What kind of bound a stored score represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Clone, Copy, Debug)]
pub struct TtEntry {
    /// Full Zobrist key, kept to detect index collisions.
    pub key: u64,
    pub depth: u8,
    pub bound: Bound,
    pub score: i32,
    pub best_move: Option<Move>,
}

/// Result of a probe at a requested depth.
#[derive(Clone, Copy, Debug)]
pub enum Probe {
    /// Key and depth both satisfied: score and bound are usable.
    Hit(TtEntry),
    /// Key matched but the stored depth is too shallow; only the move hint
    /// carries over.
    Hint(Move),
    Miss,
}

pub struct TranspositionTable {
    entries: Vec<Option<TtEntry>>,
    mask: u64,
}

impl TranspositionTable {
    /// Create a table with the requested number of entries, rounded up to a
    /// power of two and clamped to the permitted range.
    pub fn new(requested: usize) -> Self {
        let capacity = requested
            .next_power_of_two()
            .clamp(MIN_CAPACITY, MAX_CAPACITY);
        Self {
            entries: vec![None; capacity],
            mask: capacity as u64 - 1,
        }
    }

    #[inline]
    fn index(&self, key: u64) -> usize {
        ((key ^ (key >> 32)) & self.mask) as usize
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Probe for `key` at `depth`.
    pub fn probe(&self, key: u64, depth: u8) -> Probe {
        match self.entries[self.index(key)] {
            Some(entry) if entry.key == key => {
                if entry.depth >= depth {
                    Probe::Hit(entry)
                } else {
                    match entry.best_move {
                        Some(m) => Probe::Hint(m),
                        None => Probe::Miss,
                    }
                }
            }
            _ => Probe::Miss,
        }
    }

    /// Store an entry under the replacement policy: empty slot or same key
    /// always store; a different key only when at least as deep.
    pub fn store(&mut self, entry: TtEntry) {
        let idx = self.index(entry.key);
        match self.entries[idx] {
            Some(existing) if existing.key != entry.key && entry.depth < existing.depth => {}
            _ => self.entries[idx] = Some(entry),
        }
    }

    /// Drop every entry, keeping the capacity.
    pub fn clear(&mut self) {
        for slot in self.entries.iter_mut() {
            *slot = None;
        }
    }
}
