//! # paldict
//!
//! A palette-lookup dictionary generator for tile-based movie
//! compression.
//!
//! Given a multiset of 4x4-pixel tiles (each pixel a palette index
//! 0..255), the generator builds one flat palette buffer plus an index
//! map so that every input tile can be reconstructed from a contiguous
//! window of that buffer and a short bitmask reference.
//!
//! ## Features
//!
//! - **Bitset keys**: a tile's distinct colors as a 256-bit set with
//!   O(1) containment and difference
//! - **Nested packing**: a key's bytes greedily reuse the largest
//!   sub-key it contains, recursively
//! - **Prefix scavenging**: keys covered by an already-built window are
//!   claimed for free
//! - **Deterministic output**: fixed key ordering makes the buffer
//!   byte-exact reproducible, with or without parallel packing
//!
//! ## Architecture
//!
//! Construction runs size classes from largest key to smallest: only a
//! set of at least a key's cardinality can contain it, so large keys
//! placed early maximize later reuse. Within a class, candidate
//! sub-keys are populated through a memoized cache, in parallel when
//! configured.
//!
//! ## Example
//!
//! ```rust
//! use paldict::{PaletteLookupGenerator, TileDelta};
//!
//! let mut generator = PaletteLookupGenerator::new();
//! let tile: TileDelta = [7, 3, 7, 9, 3, 7, 9, 3, 7, 3, 9, 7, 3, 9, 7, 3];
//! generator.add(&tile);
//!
//! let lookup = generator.generate();
//! let found = lookup.lookup(&tile);
//! assert!(found.start.is_some());
//! assert_eq!(found.expand(), tile);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod generator;
pub mod key;
pub mod lookup;

mod nested;

pub use generator::PaletteLookupGenerator;
pub use key::{TileDelta, TilePaletteKey, PIXELS_PER_TILE};
pub use lookup::{PaletteLookup, TileLookup};

/// Configuration for the dictionary generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Populate packing candidates across threads. Output is identical
    /// either way; the serial path trades throughput for simplicity.
    pub parallel: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Size accounting for a produced dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupStats {
    /// Bytes in the packed buffer.
    pub buffer_bytes: usize,
    /// Number of placed keys.
    pub entries: usize,
    /// Bytes a naive layout (every key's bytes concatenated) would use.
    pub naive_bytes: usize,
}


#[cfg(test)]
mod proptests;
