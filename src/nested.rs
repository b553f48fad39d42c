//! Nested packing of palette keys.
//!
//! A key is packed by greedily absorbing the most valuable key it still
//! contains, recursing into that child first. The resulting tree lays
//! every visited key out as a contiguous sub-range of its parent's
//! bytes, so one buffer window serves many tiles.
//!
//! Population of distinct keys is independent: entries are memoized in a
//! shared cache and candidate builds at one size class fan out across
//! threads. A populated entry is a pure function of its key and the
//! candidate pool, so a cache race at worst duplicates idempotent work.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::key::{TilePaletteKey, PIXELS_PER_TILE};

/// One node of a packing tree: a key plus the child keys whose bytes
/// occupy distinct sub-ranges of this key's bytes.
pub(crate) struct NestedEntry {
    pub(crate) key: TilePaletteKey,
    pub(crate) nested: Vec<Arc<NestedEntry>>,
}

impl NestedEntry {
    /// Total number of key bytes covered by this subtree. Used as the
    /// greedy value of a candidate: absorbing it saves this many bytes.
    pub(crate) fn byte_size(&self) -> usize {
        self.key.size() + self.nested.iter().map(|n| n.byte_size()).sum::<usize>()
    }

    /// Produce this subtree's bytes, reporting the offset of every
    /// visited key through `mark`. Children come first, each at its own
    /// sub-offset; the parent's remaining bytes follow in ascending
    /// order.
    pub(crate) fn extract_buffer(
        &self,
        start_offset: usize,
        mark: &mut impl FnMut(TilePaletteKey, usize),
    ) -> Vec<u8> {
        mark(self.key, start_offset);
        let mut nested_bytes = Vec::new();
        let mut relative_offset = 0;
        for child in &self.nested {
            nested_bytes.extend_from_slice(&child.extract_buffer(start_offset + relative_offset, mark));
            relative_offset += child.key.size();
        }
        self.key.joined_buffer(&nested_bytes)
    }
}

/// Memoization cache plus the candidate pool snapshot for one packing
/// run. Entries are immutable once populated and shared via `Arc`.
pub(crate) struct NestedCache {
    /// Unplaced candidate keys with their registration counts, grouped
    /// by key size. Groups keep the caller's (sorted) order so that
    /// selection ties resolve the same way on every run.
    by_size: Vec<Vec<(TilePaletteKey, u32)>>,
    entries: Mutex<HashMap<TilePaletteKey, Arc<NestedEntry>>>,
    parallel: bool,
}

impl NestedCache {
    pub(crate) fn new(
        pool: impl IntoIterator<Item = (TilePaletteKey, u32)>,
        parallel: bool,
    ) -> Self {
        let mut by_size = vec![Vec::new(); PIXELS_PER_TILE + 1];
        for (key, uses) in pool {
            debug_assert!(key.size() <= PIXELS_PER_TILE);
            by_size[key.size()].push((key, uses));
        }
        Self {
            by_size,
            entries: Mutex::new(HashMap::new()),
            parallel,
        }
    }

    /// The populated entry for `key`, built on first request.
    pub(crate) fn entry(&self, key: TilePaletteKey) -> Arc<NestedEntry> {
        if let Some(entry) = self.entries.lock().get(&key) {
            return Arc::clone(entry);
        }
        let built = Arc::new(self.populate(key));
        let mut entries = self.entries.lock();
        Arc::clone(entries.entry(key).or_insert(built))
    }

    /// Greedily attach contained sub-keys until fewer than three colors
    /// remain uncovered or no candidate fits.
    fn populate(&self, key: TilePaletteKey) -> NestedEntry {
        let mut entry = NestedEntry {
            key,
            nested: Vec::new(),
        };
        let mut remaining = key;
        // A key never packs itself: the first search stops one below.
        let mut search_size = remaining.size() - 1;
        while remaining.size() > 2 {
            let Some(child) = self.populate_remaining(&remaining, search_size) else {
                break;
            };
            remaining = remaining.without(&child.key);
            search_size = remaining.size();
            entry.nested.push(child);
        }
        entry
    }

    /// Find the best candidate contained in `remaining`, scanning size
    /// classes downward from `start_size` and stopping at the first
    /// class with any match. Among matches, the largest built
    /// `byte_size` wins; ties prefer the more-registered key, then the
    /// earlier one in pool order.
    fn populate_remaining(
        &self,
        remaining: &TilePaletteKey,
        start_size: usize,
    ) -> Option<Arc<NestedEntry>> {
        let mut key_size = start_size.min(PIXELS_PER_TILE);
        while key_size > 2 {
            let candidates: Vec<(TilePaletteKey, u32)> = self.by_size[key_size]
                .iter()
                .filter(|(key, _)| remaining.contains(key))
                .copied()
                .collect();
            if !candidates.is_empty() {
                let built: Vec<(Arc<NestedEntry>, u32)> = if self.parallel {
                    candidates
                        .par_iter()
                        .map(|&(key, uses)| (self.entry(key), uses))
                        .collect()
                } else {
                    candidates
                        .iter()
                        .map(|&(key, uses)| (self.entry(key), uses))
                        .collect()
                };
                let mut best: Option<(Arc<NestedEntry>, u32, usize)> = None;
                for (entry, uses) in built {
                    let byte_size = entry.byte_size();
                    let better = match &best {
                        None => true,
                        Some((_, best_uses, best_bytes)) => {
                            byte_size > *best_bytes || (byte_size == *best_bytes && uses > *best_uses)
                        }
                    };
                    if better {
                        best = Some((entry, uses, byte_size));
                    }
                }
                return best.map(|(entry, _, _)| entry);
            }
            key_size -= 1;
        }
        None
    }
}
