//! Accumulates tile keys and builds the palette lookup dictionary.

use std::collections::HashMap;

use crate::key::{TileDelta, TilePaletteKey, PIXELS_PER_TILE};
use crate::lookup::PaletteLookup;
use crate::nested::NestedCache;
use crate::GeneratorConfig;

/// Builds a [`PaletteLookup`] from a set of registered tile deltas.
///
/// Tiles are registered up front with [`add`](Self::add); the dictionary
/// is then produced in one pass by [`generate`](Self::generate). Only the
/// set of distinct keys drives placement; per-key registration counts are
/// kept and serve as a tie-breaker during packing.
#[derive(Default)]
pub struct PaletteLookupGenerator {
    key_uses: HashMap<TilePaletteKey, u32>,
    config: GeneratorConfig,
}

impl PaletteLookupGenerator {
    /// Create a generator with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator with the given configuration.
    pub fn with_config(config: GeneratorConfig) -> Self {
        Self {
            key_uses: HashMap::new(),
            config,
        }
    }

    /// Register a tile delta.
    ///
    /// Tiles with at most two distinct colors are ignored: the encoder
    /// handles those through a separate fast path and they never enter
    /// the dictionary.
    pub fn add(&mut self, delta: &TileDelta) {
        let key = TilePaletteKey::from_tile(delta);
        if key.size() > 2 {
            *self.key_uses.entry(key).or_insert(0) += 1;
        }
    }

    /// How many times a key has been registered. Zero for unknown keys.
    pub fn uses(&self, key: &TilePaletteKey) -> u32 {
        self.key_uses.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct registered keys.
    pub fn key_count(&self) -> usize {
        self.key_uses.len()
    }

    /// Whether no key has been registered.
    pub fn is_empty(&self) -> bool {
        self.key_uses.is_empty()
    }

    /// Build the dictionary for all currently registered tiles.
    ///
    /// Size classes are processed from [`PIXELS_PER_TILE`] down to 3:
    /// only a set of at least a key's cardinality can contain it, so
    /// placing large keys first maximizes reuse. Each class first
    /// scavenges keys that some existing buffer window already covers,
    /// then packs the rest through the nested-entry cache. Keys are
    /// visited in a fixed total order throughout, so output is
    /// reproducible.
    pub fn generate(&self) -> PaletteLookup {
        let mut buffer: Vec<u8> = Vec::new();
        let mut starts: HashMap<TilePaletteKey, usize> = HashMap::new();

        let mut keys: Vec<TilePaletteKey> = self.key_uses.keys().copied().collect();
        keys.sort_unstable_by(|a, b| a.cmp_words(b));

        for size in (3..=PIXELS_PER_TILE).rev() {
            // Windows built for larger keys often cover smaller ones
            // outright; claiming those first costs no bytes at all.
            for key in keys.iter().filter(|k| k.size() == size) {
                if starts.contains_key(key) {
                    continue;
                }
                if let Some(start) = scavenge(&buffer, key) {
                    starts.insert(*key, start);
                }
            }

            let in_size: Vec<TilePaletteKey> = keys
                .iter()
                .filter(|k| k.size() == size && !starts.contains_key(*k))
                .copied()
                .collect();
            for key in in_size {
                let pool = keys
                    .iter()
                    .filter(|k| !starts.contains_key(*k))
                    .map(|k| (*k, self.key_uses[k]));
                let cache = NestedCache::new(pool, self.config.parallel);
                let bytes = cache
                    .entry(key)
                    .extract_buffer(buffer.len(), &mut |nested_key, offset| {
                        starts.insert(nested_key, offset);
                    });
                buffer.extend_from_slice(&bytes);
            }
        }

        // Anything never claimed above is emitted verbatim.
        let leftovers: Vec<TilePaletteKey> = keys
            .iter()
            .filter(|k| !starts.contains_key(*k))
            .copied()
            .collect();
        for key in leftovers {
            starts.insert(key, buffer.len());
            buffer.extend_from_slice(&key.buffer());
        }

        PaletteLookup::new(buffer, starts)
    }
}

/// First buffer window whose induced color set contains `key`, if any.
fn scavenge(buffer: &[u8], key: &TilePaletteKey) -> Option<usize> {
    let len = key.size();
    if buffer.len() < len {
        return None;
    }
    (0..=buffer.len() - len)
        .find(|&start| TilePaletteKey::from_colors(&buffer[start..start + len]).contains(key))
}
