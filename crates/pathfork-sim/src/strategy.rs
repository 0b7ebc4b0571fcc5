use pathfork_core::model::path::PathId;
use rand::Rng;
use tracing::{Level, event};

/// Borrowed view of one trial: every signal's sampled choice plus the
/// number of paths, handed to each strategy in turn.
pub struct Trial<'a> {
    choices: &'a [PathId],
    path_count: u32,
}

impl<'a> Trial<'a> {
    pub fn new(choices: &'a [PathId], path_count: u32) -> Trial<'a> {
        Trial {
            choices,
            path_count,
        }
    }

    pub fn choices(&self) -> &[PathId] {
        self.choices
    }

    pub fn path_count(&self) -> u32 {
        self.path_count
    }
}

/// Unified interface for the decision strategies under comparison.
pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Produce this strategy's decision for one trial. Strategies that
    /// need no randomness leave the generator untouched.
    fn decide<R: Rng + ?Sized>(&self, trial: &Trial<'_>, rng: &mut R) -> PathId;
}

/// Trust the signals' consensus only when it is a strict majority
/// (more than half of all signals); otherwise draw uniformly.
pub struct MajorityVote;

impl Strategy for MajorityVote {
    fn name(&self) -> &'static str {
        "majority"
    }

    fn decide<R: Rng + ?Sized>(&self, trial: &Trial<'_>, rng: &mut R) -> PathId {
        let (mode, count) = mode_of(trial.choices(), trial.path_count());

        if count as usize * 2 > trial.choices().len() {
            return mode;
        }

        if tracing::enabled!(Level::TRACE) {
            event!(
                target: "pathfork_sim::majority",
                Level::TRACE,
                top = %mode,
                count,
                signals = trial.choices().len() as u64,
                "no strict majority, drawing uniformly"
            );
        }

        uniform_draw(trial.path_count(), rng)
    }
}

/// Always defer to the most accurate signal's choice. The signal set is
/// ordered by ascending accuracy, so that is the last choice of the trial.
pub struct BestSignal;

impl Strategy for BestSignal {
    fn name(&self) -> &'static str {
        "best_signal"
    }

    fn decide<R: Rng + ?Sized>(&self, trial: &Trial<'_>, _rng: &mut R) -> PathId {
        *trial
            .choices()
            .last()
            .expect("trials carry at least one signal choice")
    }
}

/// Ignore the signals entirely and draw uniformly.
pub struct UniformRandom;

impl Strategy for UniformRandom {
    fn name(&self) -> &'static str {
        "random"
    }

    fn decide<R: Rng + ?Sized>(&self, trial: &Trial<'_>, rng: &mut R) -> PathId {
        uniform_draw(trial.path_count(), rng)
    }
}

/// Most frequent choice and its count. Count ties resolve toward the
/// smallest path id, which keeps the scan deterministic; a tied mode can
/// never clear the strict-majority bar anyway.
fn mode_of(choices: &[PathId], path_count: u32) -> (PathId, u32) {
    let mut counts = vec![0u32; path_count as usize];
    for choice in choices {
        counts[choice.index()] += 1;
    }

    let mut best_index = 0usize;
    let mut best_count = 0u32;
    for (index, &count) in counts.iter().enumerate() {
        if count > best_count {
            best_index = index;
            best_count = count;
        }
    }

    (PathId::from_index(best_index), best_count)
}

fn uniform_draw<R: Rng + ?Sized>(path_count: u32, rng: &mut R) -> PathId {
    PathId::new(rng.gen_range(1..=path_count))
}

#[cfg(test)]
mod tests {
    use super::{BestSignal, MajorityVote, Strategy, Trial, UniformRandom, mode_of};
    use pathfork_core::model::path::PathId;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn paths(ids: &[u32]) -> Vec<PathId> {
        ids.iter().map(|&id| PathId::new(id)).collect()
    }

    #[test]
    fn strict_majority_decides_the_mode() {
        let choices = paths(&[1, 2, 1]);
        let trial = Trial::new(&choices, 2);

        // Two generators with different seeds must agree: a strict
        // majority never touches the generator.
        let mut rng_a = SmallRng::seed_from_u64(1);
        let mut rng_b = SmallRng::seed_from_u64(999);
        assert_eq!(MajorityVote.decide(&trial, &mut rng_a), PathId::new(1));
        assert_eq!(MajorityVote.decide(&trial, &mut rng_b), PathId::new(1));
    }

    #[test]
    fn exact_half_is_not_a_majority() {
        let choices = paths(&[1, 1, 2, 2]);
        let trial = Trial::new(&choices, 2);
        let mut rng = SmallRng::seed_from_u64(5);

        for _ in 0..100 {
            let decision = MajorityVote.decide(&trial, &mut rng);
            assert!(decision.get() >= 1 && decision.get() <= 2);
        }
    }

    #[test]
    fn plurality_without_majority_falls_back_to_uniform() {
        let choices = paths(&[1, 1, 2, 2, 3]);
        let trial = Trial::new(&choices, 3);

        let mut seen = [false; 3];
        for seed in 0..64 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let decision = MajorityVote.decide(&trial, &mut rng);
            assert!(decision.get() >= 1 && decision.get() <= 3);
            seen[decision.index()] = true;
        }
        let distinct = seen.iter().filter(|&&s| s).count();
        assert!(distinct > 1, "uniform fallback should vary across seeds");
    }

    #[test]
    fn mode_ties_resolve_to_smallest_path() {
        let choices = paths(&[3, 2, 2, 3]);
        let (mode, count) = mode_of(&choices, 3);
        assert_eq!(mode, PathId::new(2));
        assert_eq!(count, 2);
    }

    #[test]
    fn best_signal_uses_the_last_choice() {
        let choices = paths(&[2, 3, 1]);
        let trial = Trial::new(&choices, 3);
        let mut rng = SmallRng::seed_from_u64(0);
        assert_eq!(BestSignal.decide(&trial, &mut rng), PathId::new(1));
    }

    #[test]
    fn uniform_random_stays_in_range_and_is_seeded() {
        let choices = paths(&[1]);
        let trial = Trial::new(&choices, 5);

        let mut rng_a = SmallRng::seed_from_u64(77);
        let mut rng_b = SmallRng::seed_from_u64(77);
        for _ in 0..200 {
            let a = UniformRandom.decide(&trial, &mut rng_a);
            let b = UniformRandom.decide(&trial, &mut rng_b);
            assert_eq!(a, b);
            assert!(a.get() >= 1 && a.get() <= 5);
        }
    }

    #[test]
    fn strategy_names_are_stable() {
        assert_eq!(MajorityVote.name(), "majority");
        assert_eq!(BestSignal.name(), "best_signal");
        assert_eq!(UniformRandom.name(), "random");
    }
}
