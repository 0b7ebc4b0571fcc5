//! The trial loop: samples every signal once per trial and tallies each
//! strategy's decision against the ground-truth path.

use pathfork_core::model::path::PathId;
use pathfork_core::model::signal::SignalSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::strategy::{BestSignal, MajorityVote, Strategy, Trial, UniformRandom};

/// Running correctness counters, one per strategy. Each is incremented at
/// most once per trial and never exceeds the trial count.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub majority: u64,
    pub best_signal: u64,
    pub random: u64,
}

impl Tally {
    /// The counts as an ordered triple (majority, best-signal, random).
    pub const fn as_triple(self) -> (u64, u64, u64) {
        (self.majority, self.best_signal, self.random)
    }
}

/// Runs `num_trials` independent trials against `set` and returns the
/// final tally.
///
/// Trials are sequential and consume `rng` in a fixed order per trial:
/// one draw per signal, then the majority fallback draw (only when no
/// strict majority formed), then the random strategy's draw. A given
/// generator state therefore reproduces the run exactly.
pub fn simulate<R: Rng + ?Sized>(set: &SignalSet, num_trials: u64, rng: &mut R) -> Tally {
    let majority = MajorityVote;
    let best = BestSignal;
    let random = UniformRandom;

    let mut tally = Tally::default();
    let mut choices: Vec<PathId> = Vec::with_capacity(set.len());

    for _ in 0..num_trials {
        set.sample_into(&mut choices, rng);
        let trial = Trial::new(&choices, set.path_count());

        if majority.decide(&trial, rng) == PathId::GROUND_TRUTH {
            tally.majority += 1;
        }
        if best.decide(&trial, rng) == PathId::GROUND_TRUTH {
            tally.best_signal += 1;
        }
        if random.decide(&trial, rng) == PathId::GROUND_TRUTH {
            tally.random += 1;
        }
    }

    debug!(
        trials = num_trials,
        signals = set.len() as u64,
        paths = set.path_count(),
        majority = tally.majority,
        best_signal = tally.best_signal,
        random = tally.random,
        "simulation complete"
    );

    tally
}

/// Deterministic entry point: seeds a fresh generator and runs [`simulate`].
pub fn simulate_with_seed(set: &SignalSet, num_trials: u64, seed: u64) -> Tally {
    let mut rng = StdRng::seed_from_u64(seed);
    simulate(set, num_trials, &mut rng)
}
