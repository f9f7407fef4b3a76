//! Property tests for the behavior table operators

use gridlife::genetics::{BehaviorArray, GeneticController, GeneticParams, OutputLayout};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn table(seed: u64, input_bits: u32, memory_bits: u32, comm_bits: u32) -> BehaviorArray {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    BehaviorArray::random(input_bits, OutputLayout::new(memory_bits, comm_bits), &mut rng)
}

fn differing_bits(a: &BehaviorArray, b: &BehaviorArray) -> u32 {
    a.entries()
        .iter()
        .zip(b.entries())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum()
}

proptest! {
    #[test]
    fn prop_similarity_reflexive_and_symmetric(
        a in any::<u64>(),
        b in any::<u64>(),
        input_bits in 1u32..8,
        memory_bits in 0u32..3,
        comm_bits in 0u32..3,
    ) {
        let a = table(a, input_bits, memory_bits, comm_bits);
        let b = table(b, input_bits, memory_bits, comm_bits);
        prop_assert_eq!(a.similarity(&a), 1.0);
        prop_assert_eq!(a.similarity(&b), b.similarity(&a));
        let s = a.similarity(&b);
        prop_assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn prop_splice_child_matches_neither_parent(
        a in any::<u64>(),
        b in any::<u64>(),
        seed in any::<u64>(),
        input_bits in 1u32..7,
    ) {
        let a = table(a, input_bits, 2, 2);
        let b = table(b, input_bits, 2, 2);
        prop_assume!(differing_bits(&a, &b) >= 2);

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let child = a.splice(&b, &mut rng).unwrap();
        prop_assert!(child.similarity(&a) < 1.0);
        prop_assert!(child.similarity(&b) < 1.0);
        // Every entry agrees with at least one parent on every agreed bit
        for ((c, x), y) in child.entries().iter().zip(a.entries()).zip(b.entries()) {
            let agreed = !(x ^ y);
            prop_assert_eq!(c & agreed, x & agreed);
        }
    }

    #[test]
    fn prop_zero_rate_mutation_is_identity(seed in any::<u64>(), input_bits in 1u32..8) {
        let parent = table(seed, input_bits, 2, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
        let child = parent.mutated_copy(0.0, &mut rng);
        prop_assert_eq!(&child, &parent);
    }

    #[test]
    fn prop_full_rate_mutation_keeps_entries_in_layout(
        seed in any::<u64>(),
        input_bits in 1u32..8,
    ) {
        let parent = table(seed, input_bits, 1, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
        let child = parent.mutated_copy(1.0, &mut rng);
        let width = parent.layout().total_bits();
        prop_assert_eq!(child.len(), parent.len());
        prop_assert!(child.entries().iter().all(|e| e >> width == 0));
    }
}

#[test]
fn test_controller_offspring_similarity_bounds() {
    let params = GeneticParams::default();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let a = GeneticController::new_random(&params, &mut rng);
    let b = GeneticController::new_random(&params, &mut rng);
    let child = GeneticController::from_parents(&a, &b, 0.0, &mut rng).unwrap();

    assert!(child.similarity(&a) < 1.0);
    assert!(child.similarity(&b) < 1.0);
    // Roughly half of the entries come from each side
    assert!(child.similarity(&a) > a.similarity(&b));
    assert!(child.similarity(&b) > a.similarity(&b));
}
