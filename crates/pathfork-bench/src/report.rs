use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use pathfork_sim::Tally;

use crate::config::BenchConfig;

const CONFIDENCE_Z: f64 = 1.96; // 95% CI

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

/// Cumulative accuracy of each strategy after a given number of trials.
#[derive(Debug, Clone, Copy)]
pub struct ConvergencePoint {
    pub trials: u64,
    pub majority: f64,
    pub best_signal: f64,
    pub random: f64,
}

#[derive(Debug, Clone)]
pub struct StrategyReport {
    pub name: &'static str,
    pub correct: u64,
    pub accuracy: f64,
    pub ci95: (f64, f64),
}

impl StrategyReport {
    fn new(name: &'static str, correct: u64, trials: u64) -> StrategyReport {
        let accuracy = if trials == 0 {
            0.0
        } else {
            correct as f64 / trials as f64
        };

        StrategyReport {
            name,
            correct,
            accuracy,
            ci95: proportion_ci(correct, trials),
        }
    }
}

/// Final per-run report: accuracy table plus the majority-vs-best
/// comparison the scenario exists to answer.
#[derive(Debug, Clone)]
pub struct SimReport {
    pub run_id: String,
    pub paths: u32,
    pub signals: usize,
    pub trials: u64,
    pub tolerance: f64,
    pub strategies: Vec<StrategyReport>,
    pub delta_majority_vs_best: f64,
    pub p_value: f64,
    pub within_tolerance: bool,
}

impl SimReport {
    pub fn build(config: &BenchConfig, totals: Tally, trials: u64) -> SimReport {
        let strategies = vec![
            StrategyReport::new("majority", totals.majority, trials),
            StrategyReport::new("best_signal", totals.best_signal, trials),
            StrategyReport::new("random", totals.random, trials),
        ];

        let delta = strategies[0].accuracy - strategies[1].accuracy;
        let tolerance = config.report.tolerance;

        SimReport {
            run_id: config.run_id.clone(),
            paths: config.scenario.paths,
            signals: config.scenario.signals.len(),
            trials,
            tolerance,
            strategies,
            delta_majority_vs_best: delta,
            p_value: two_proportion_p_value(totals.majority, totals.best_signal, trials),
            within_tolerance: delta.abs() <= tolerance,
        }
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        let mut rows = String::new();
        rows.push_str("# Simulation Summary\n\n");
        rows.push_str(&format!(
            "Run `{}`: {} trials over {} paths with {} signal{}.\n\n",
            self.run_id,
            self.trials,
            self.paths,
            self.signals,
            if self.signals == 1 { "" } else { "s" }
        ));
        rows.push_str("| Strategy | Correct | Accuracy | 95% CI |\n");
        rows.push_str("|----------|---------|----------|--------|\n");

        for strategy in &self.strategies {
            rows.push_str(&format!(
                "| {name} | {correct} | {accuracy:.4} | [{ci_low:.4}, {ci_high:.4}] |\n",
                name = strategy.name,
                correct = strategy.correct,
                accuracy = strategy.accuracy,
                ci_low = strategy.ci95.0,
                ci_high = strategy.ci95.1,
            ));
        }

        rows.push_str("\n## Majority vs best signal\n\n");
        rows.push_str(&format!(
            "- accuracy delta: {:+.4}\n",
            self.delta_majority_vs_best
        ));
        rows.push_str(&format!(
            "- two-proportion z-test p-value: {:.3}\n",
            self.p_value
        ));
        let verdict = if self.within_tolerance { "" } else { "NOT " };
        rows.push_str(&format!(
            "- with a tolerance of {}, following the majority is {}equal to following the single best signal\n",
            self.tolerance, verdict
        ));

        fs::write(path.as_ref(), rows).map_err(|e| ReportError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn render_plot(
        &self,
        dir: impl AsRef<Path>,
        curve: &[ConvergencePoint],
    ) -> Result<PathBuf, ReportError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| ReportError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("convergence.png");
        let result_path = output_path.clone();
        let total_trials = self.trials.max(1);
        let points = curve.to_vec();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || -> Result<(), ReportError> {
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption("Running accuracy by strategy", ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(0u64..total_trials, 0f64..1f64)
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Accuracy")
                .x_desc("Trials")
                .draw()
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            let series: [(&str, &RGBColor, Vec<(u64, f64)>); 3] = [
                (
                    "majority",
                    &RED,
                    points.iter().map(|p| (p.trials, p.majority)).collect(),
                ),
                (
                    "best_signal",
                    &BLUE,
                    points.iter().map(|p| (p.trials, p.best_signal)).collect(),
                ),
                (
                    "random",
                    &GREEN,
                    points.iter().map(|p| (p.trials, p.random)).collect(),
                ),
            ];

            for (label, color, line) in series {
                chart
                    .draw_series(LineSeries::new(line, color))
                    .map_err(|e| ReportError::Plot(e.to_string()))?
                    .label(label)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }

            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(|e| ReportError::Plot(e.to_string()))?;

            root.present().map_err(|e| ReportError::Plot(e.to_string()))?;
            Ok(())
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(Ok(())) => Ok(result_path),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ReportError::Plot("plot rendering panicked".to_string())),
        }
    }
}

fn proportion_ci(correct: u64, trials: u64) -> (f64, f64) {
    if trials == 0 {
        return (0.0, 0.0);
    }

    let p = correct as f64 / trials as f64;
    let half = CONFIDENCE_Z * (p * (1.0 - p) / trials as f64).sqrt();
    ((p - half).max(0.0), (p + half).min(1.0))
}

fn two_proportion_p_value(correct_a: u64, correct_b: u64, trials: u64) -> f64 {
    if trials == 0 {
        return 1.0;
    }

    let n = trials as f64;
    let p_a = correct_a as f64 / n;
    let p_b = correct_b as f64 / n;
    let pooled = (correct_a + correct_b) as f64 / (2.0 * n);
    let variance = pooled * (1.0 - pooled) * (2.0 / n);
    if variance <= 0.0 {
        return 1.0;
    }

    let z = (p_a - p_b).abs() / variance.sqrt();
    let normal = Normal::new(0.0, 1.0).unwrap();
    let p = 2.0 * (1.0 - normal.cdf(z));
    p.min(1.0).max(0.0)
}
