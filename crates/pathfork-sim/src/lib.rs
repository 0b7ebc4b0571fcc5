pub mod engine;
pub mod strategy;

pub use engine::{Tally, simulate, simulate_with_seed};
pub use strategy::{BestSignal, MajorityVote, Strategy, Trial, UniformRandom};
