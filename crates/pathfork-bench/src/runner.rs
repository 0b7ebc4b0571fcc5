use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pathfork_core::model::signal::{ModelError, SignalSet};
use pathfork_sim::{Tally, simulate_with_seed};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{BenchConfig, ResolvedOutputs};
use crate::report::{ConvergencePoint, ReportError, SimReport};

/// Primary entry point for running a configured scenario.
#[derive(Debug)]
pub struct HarnessRunner {
    config: BenchConfig,
    outputs: ResolvedOutputs,
    signals: SignalSet,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub trials_run: u64,
    pub batches: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
}

impl HarnessRunner {
    /// Build a runner from a validated configuration. Constructing the
    /// signal set here is the atomic precondition gate: nothing is
    /// sampled, written, or logged for a malformed scenario.
    pub fn new(config: BenchConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let signals = SignalSet::from_accuracies(&config.scenario.signals, config.scenario.paths)?;

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            signals,
        })
    }

    /// Execute the scenario, streaming one JSONL row per batch to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut master = StdRng::seed_from_u64(self.config.scenario.seed.unwrap_or(0));

        let total_trials = self.config.scenario.trials;
        let batch_size = self.config.scenario.batch_size;

        let mut totals = Tally::default();
        let mut curve = Vec::new();
        let mut trials_run = 0u64;
        let mut batch_index = 0usize;
        let mut rows_written = 0usize;

        while trials_run < total_trials {
            let batch_trials = batch_size.min(total_trials - trials_run);
            let batch_seed = master.next_u64();
            let tally = simulate_with_seed(&self.signals, batch_trials, batch_seed);

            totals.majority += tally.majority;
            totals.best_signal += tally.best_signal;
            totals.random += tally.random;
            trials_run += batch_trials;

            curve.push(ConvergencePoint {
                trials: trials_run,
                majority: totals.majority as f64 / trials_run as f64,
                best_signal: totals.best_signal as f64 / trials_run as f64,
                random: totals.random as f64 / trials_run as f64,
            });

            let row = BatchLogRow {
                run_id: self.config.run_id.clone(),
                batch_index,
                batch_seed,
                trials: batch_trials,
                majority: tally.majority,
                best_signal: tally.best_signal,
                random: tally.random,
            };
            serde_json::to_writer(&mut writer, &row)?;
            writer.write_all(b"\n")?;
            rows_written += 1;

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: "pathfork_bench::batch",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    batch_index = batch_index as u32,
                    trials = batch_trials,
                    majority = tally.majority,
                    best_signal = tally.best_signal,
                    random = tally.random
                );
            }

            batch_index += 1;
        }

        writer.flush()?;

        let report = SimReport::build(&self.config, totals, trials_run);
        report.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match report.render_plot(&self.outputs.plots_dir, &curve) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        Ok(RunSummary {
            trials_run,
            batches: batch_index,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct BatchLogRow {
    run_id: String,
    batch_index: usize,
    batch_seed: u64,
    trials: u64,
    majority: u64,
    best_signal: u64,
    random: u64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid scenario: {0}")]
    Model(#[from] ModelError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("report generation failed: {0}")]
    Report(#[from] ReportError),
}
