use std::path::PathBuf;

use clap::Parser;

use pathfork_bench::config::{BenchConfig, ResolvedOutputs};
use pathfork_bench::logging::init_logging;
use pathfork_bench::runner::HarnessRunner;

/// Scenario harness comparing path-choice strategies.
#[derive(Debug, Parser)]
#[command(
    name = "pathfork-bench",
    author,
    version,
    about = "Deterministic strategy-accuracy simulation harness"
)]
struct Cli {
    /// Path to the YAML scenario file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/scenario.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of trials to run.
    #[arg(long, value_name = "TRIALS")]
    trials: Option<u64>,

    /// Override the RNG seed for batch generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the number of paths at the fork.
    #[arg(long, value_name = "COUNT")]
    paths: Option<u32>,

    /// Override the signal accuracies (comma-separated, ascending).
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    signals: Option<Vec<f64>>,

    /// Exit after validating the scenario (no simulation is run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(trials) = cli.trials {
        config.scenario.trials = trials;
    }

    if let Some(seed) = cli.seed {
        config.scenario.seed = Some(seed);
    }

    if let Some(paths) = cli.paths {
        config.scenario.paths = paths;
    }

    if let Some(signals) = cli.signals {
        config.scenario.signals = signals;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let signal_count = config.scenario.signals.len();
    let paths = config.scenario.paths;
    let trials = config.scenario.trials;

    println!(
        "Loaded scenario '{run_id}' with {signal_count} signal{} ({paths} paths, {trials} trials)",
        if signal_count == 1 { "" } else { "s" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = HarnessRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Simulation complete for '{run_id}': {} trials in {} batches → {} rows at {}",
        summary.trials_run,
        summary.batches,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Convergence plot: {}", plot_path.display());
    }

    Ok(())
}
