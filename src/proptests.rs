use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::{
    GeneratorConfig, PaletteLookupGenerator, TileDelta, TilePaletteKey, PIXELS_PER_TILE,
};

/// Tiles drawn from one small color cluster, so containment between
/// keys is common and packing has real work to do.
#[derive(Debug, Clone)]
struct ClusteredTiles(Vec<TileDelta>);

/// Tiles with colors spread across the whole palette; keys rarely
/// relate and mostly land as disjoint windows.
#[derive(Debug, Clone)]
struct ScatteredTiles(Vec<TileDelta>);

/// Input shapes to exercise the generator with.
#[derive(Arbitrary, Debug, Clone)]
enum Workload {
    Clustered(ClusteredTiles),
    Scattered(ScatteredTiles),
    Mixed(ClusteredTiles, ScatteredTiles),
}

impl Workload {
    fn tiles(&self) -> Vec<TileDelta> {
        match self {
            Workload::Clustered(c) => c.0.clone(),
            Workload::Scattered(s) => s.0.clone(),
            Workload::Mixed(c, s) => {
                let mut tiles = c.0.clone();
                tiles.extend_from_slice(&s.0);
                tiles
            }
        }
    }
}

fn clustered_tile() -> impl Strategy<Value = TileDelta> {
    (
        0u8..48,
        prop::collection::vec(0u8..8, PIXELS_PER_TILE),
    )
        .prop_map(|(base, offsets)| {
            let mut tile = [0u8; PIXELS_PER_TILE];
            for (pixel, offset) in tile.iter_mut().zip(offsets) {
                *pixel = base + offset;
            }
            tile
        })
}

fn scattered_tile() -> impl Strategy<Value = TileDelta> {
    prop::collection::vec(any::<u8>(), PIXELS_PER_TILE).prop_map(|colors| {
        let mut tile = [0u8; PIXELS_PER_TILE];
        tile.copy_from_slice(&colors);
        tile
    })
}

impl Arbitrary for ClusteredTiles {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop::collection::vec(clustered_tile(), 1..24)
            .prop_map(ClusteredTiles)
            .boxed()
    }
}

impl Arbitrary for ScatteredTiles {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop::collection::vec(scattered_tile(), 1..24)
            .prop_map(ScatteredTiles)
            .boxed()
    }
}

fn generate_from(tiles: &[TileDelta], parallel: bool) -> (PaletteLookupGenerator, crate::PaletteLookup) {
    let mut generator = PaletteLookupGenerator::with_config(GeneratorConfig { parallel });
    for tile in tiles {
        generator.add(tile);
    }
    let lookup = generator.generate();
    (generator, lookup)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_bitset_laws(
        a in prop::collection::vec(any::<u8>(), 0..32),
        b in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let key_a = TilePaletteKey::from_colors(&a);
        let key_b = TilePaletteKey::from_colors(&b);

        // Cached cardinality agrees with enumeration.
        prop_assert_eq!(key_a.buffer().len(), key_a.size());

        // A.contains(B) iff A | B == A.
        let mut union = key_a;
        for &color in &b {
            union.use_color(color);
        }
        prop_assert_eq!(key_a.contains(&key_b), union == key_a);

        // |A \ B| == |A| - |A & B|, and the difference avoids B.
        let intersection = key_b
            .buffer()
            .iter()
            .filter(|&&color| key_a.has_color(color))
            .count();
        let difference = key_a.without(&key_b);
        prop_assert_eq!(difference.size(), key_a.size() - intersection);
        prop_assert!(difference.buffer().iter().all(|&color| !key_b.has_color(color)));
        prop_assert!(key_a.contains(&difference));
    }

    #[test]
    fn proptest_generate_dictionary(workload in any::<Workload>()) {
        let tiles = workload.tiles();
        let (generator, lookup) = generate_from(&tiles, false);

        for tile in &tiles {
            let key = TilePaletteKey::from_tile(tile);
            if key.size() <= 2 {
                prop_assert_eq!(lookup.start_of(&key), None);
                continue;
            }

            // Every registered key is placed, and its window holds
            // exactly the key's colors with no duplicates.
            let start = lookup.start_of(&key);
            prop_assert!(start.is_some(), "unplaced key {:?}", key);
            let window = &lookup.buffer()[start.unwrap()..start.unwrap() + key.size()];
            prop_assert_eq!(TilePaletteKey::from_colors(window), key);
        }

        // Every tile survives the encode/decode round-trip, registered
        // or not.
        for tile in &tiles {
            prop_assert_eq!(lookup.lookup(tile).expand(), *tile);
        }

        // Packing never loses to concatenating every key's bytes.
        let stats = lookup.stats();
        prop_assert!(stats.buffer_bytes <= stats.naive_bytes, "stats: {:?}", stats);
        prop_assert_eq!(stats.entries, generator.key_count());
    }

    #[test]
    fn proptest_parallel_matches_serial(workload in any::<Workload>()) {
        let tiles = workload.tiles();
        let (_, serial) = generate_from(&tiles, false);
        let (_, parallel) = generate_from(&tiles, true);

        prop_assert_eq!(serial.buffer(), parallel.buffer());
        for tile in &tiles {
            let key = TilePaletteKey::from_tile(tile);
            prop_assert_eq!(serial.start_of(&key), parallel.start_of(&key));
        }
    }
}
