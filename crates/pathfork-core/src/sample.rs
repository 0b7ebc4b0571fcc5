//! Weighted trial sampling over signal distributions.

use crate::model::path::PathId;
use crate::model::signal::{Signal, SignalSet};
use rand::Rng;

impl Signal {
    /// Draws one path choice by cumulative-distribution inversion.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> PathId {
        let weights = self.distribution();
        let mut roll = rng.gen_range(0.0..1.0);

        for (index, &weight) in weights.iter().enumerate() {
            if roll < weight {
                return PathId::from_index(index);
            }
            roll -= weight;
        }

        // The mass sums to one; rounding can leave a sliver past the last
        // entry, which belongs to the last path.
        PathId::from_index(weights.len() - 1)
    }
}

impl SignalSet {
    /// Fills `choices` with one independent draw per signal, in signal
    /// order. The buffer is cleared first so it can be reused across
    /// trials.
    pub fn sample_into<R: Rng + ?Sized>(&self, choices: &mut Vec<PathId>, rng: &mut R) {
        choices.clear();
        choices.extend(self.signals().iter().map(|signal| signal.draw(rng)));
    }
}

#[cfg(test)]
mod tests {
    use crate::model::path::PathId;
    use crate::model::signal::SignalSet;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn draws_are_deterministic_with_fixed_seed() {
        let set = SignalSet::from_accuracies(&[0.3, 0.5, 0.8], 4).expect("valid set");

        let mut rng_a = SmallRng::seed_from_u64(123);
        let mut rng_b = SmallRng::seed_from_u64(123);

        let mut choices_a = Vec::new();
        let mut choices_b = Vec::new();
        for _ in 0..50 {
            set.sample_into(&mut choices_a, &mut rng_a);
            set.sample_into(&mut choices_b, &mut rng_b);
            assert_eq!(choices_a, choices_b);
        }
    }

    #[test]
    fn perfect_signal_always_picks_ground_truth() {
        let set = SignalSet::from_accuracies(&[1.0], 3).expect("valid set");
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert_eq!(set.signals()[0].draw(&mut rng), PathId::GROUND_TRUTH);
        }
    }

    #[test]
    fn worthless_signal_never_picks_ground_truth() {
        let set = SignalSet::from_accuracies(&[0.0], 3).expect("valid set");
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..1000 {
            let choice = set.signals()[0].draw(&mut rng);
            assert_ne!(choice, PathId::GROUND_TRUTH);
            assert!(choice.get() >= 2 && choice.get() <= 3);
        }
    }

    #[test]
    fn sample_into_reuses_the_buffer() {
        let set = SignalSet::from_accuracies(&[0.2, 0.9], 2).expect("valid set");
        let mut rng = SmallRng::seed_from_u64(42);
        let mut choices = vec![PathId::new(9); 8];

        set.sample_into(&mut choices, &mut rng);
        assert_eq!(choices.len(), set.len());
        for choice in &choices {
            assert!(choice.get() >= 1 && choice.get() <= set.path_count());
        }
    }
}
