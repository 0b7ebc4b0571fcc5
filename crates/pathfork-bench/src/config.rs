use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_PATHS: u32 = 2;
const DEFAULT_TRIALS: u64 = 100_000;
const DEFAULT_BATCH_SIZE: u64 = 1_000;
const DEFAULT_TOLERANCE: f64 = 0.005;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root harness configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchConfig {
    pub run_id: String,
    pub scenario: ScenarioConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.scenario.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.report.validate()?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

/// Scenario block: the fork, the signals, and the trial budget.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    #[serde(default = "default_paths")]
    pub paths: u32,
    /// Signal accuracies in non-decreasing order.
    pub signals: Vec<f64>,
    #[serde(default = "default_trials")]
    pub trials: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ScenarioConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.paths < 2 {
            return Err(ValidationError::InvalidField {
                field: "scenario.paths".to_string(),
                message: "at least 2 paths are required".to_string(),
            });
        }

        if self.signals.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "scenario.signals".to_string(),
                message: "at least one signal accuracy must be given".to_string(),
            });
        }

        for (index, &value) in self.signals.iter().enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::InvalidField {
                    field: format!("scenario.signals[{index}]"),
                    message: "each accuracy must be between 0 and 1".to_string(),
                });
            }
            if index > 0 && value < self.signals[index - 1] {
                return Err(ValidationError::InvalidField {
                    field: format!("scenario.signals[{index}]"),
                    message: "accuracies must be in non-decreasing order".to_string(),
                });
            }
        }

        if self.trials == 0 {
            return Err(ValidationError::InvalidField {
                field: "scenario.trials".to_string(),
                message: "number of trials must be greater than zero".to_string(),
            });
        }

        if self.batch_size == 0 {
            return Err(ValidationError::InvalidField {
                field: "scenario.batch_size".to_string(),
                message: "batch size must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn default_paths() -> u32 {
    DEFAULT_PATHS
}

fn default_trials() -> u64 {
    DEFAULT_TRIALS
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Reporting block: the equivalence tolerance between the majority and
/// best-signal accuracies.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReportConfig {
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ReportConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(ValidationError::InvalidField {
                field: "report.tolerance".to_string(),
                message: "tolerance must lie strictly between 0 and 1".to_string(),
            });
        }
        Ok(())
    }
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "fork_smoke"
scenario:
  paths: 2
  signals: [0.5, 0.7, 0.9]
  trials: 5000
  batch_size: 500
  seed: 123
outputs:
  jsonl: "bench/out/{run_id}/batches.jsonl"
  summary_md: "bench/out/{run_id}/summary.md"
  plots_dir: "bench/out/{run_id}/plots"
report:
  tolerance: 0.01
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg: BenchConfig = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.scenario.trials, 5000);
        assert_eq!(cfg.scenario.batch_size, 500);
        assert_eq!(cfg.report.tolerance, 0.01);
        assert!(cfg.logging.enable_structured);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("bench/out/fork_smoke/batches.jsonl")
        );
    }

    #[test]
    fn omitted_blocks_take_defaults() {
        let yaml = r#"
run_id: "defaults"
scenario:
  signals: [0.8]
outputs:
  jsonl: "out/batches.jsonl"
  summary_md: "out/summary.md"
  plots_dir: "out/plots"
"#;
        let mut cfg: BenchConfig = serde_yaml::from_str(yaml).expect("parse yaml");
        cfg.validate().expect("validate");

        assert_eq!(cfg.scenario.paths, DEFAULT_PATHS);
        assert_eq!(cfg.scenario.trials, DEFAULT_TRIALS);
        assert_eq!(cfg.scenario.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(cfg.scenario.seed, None);
        assert_eq!(cfg.report.tolerance, DEFAULT_TOLERANCE);
        assert!(!cfg.logging.enable_structured);
    }

    #[test]
    fn rejects_single_path() {
        let yaml = BASIC_YAML.replace("paths: 2", "paths: 1");
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "scenario.paths"
        ));
    }

    #[test]
    fn rejects_non_ascending_signals() {
        let yaml = BASIC_YAML.replace("[0.5, 0.7, 0.9]", "[0.6, 0.3]");
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "scenario.signals[1]"
        ));
    }

    #[test]
    fn rejects_out_of_range_signal() {
        let yaml = BASIC_YAML.replace("[0.5, 0.7, 0.9]", "[0.5, 1.7]");
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "scenario.signals[1]"
        ));
    }

    #[test]
    fn rejects_zero_trials() {
        let yaml = BASIC_YAML.replace("trials: 5000", "trials: 0");
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("should fail");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "scenario.trials"
        ));
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("fork_smoke", "fork smoke");
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        let err = cfg.validate().expect_err("invalid run id");
        assert!(matches!(
            err,
            ValidationError::InvalidField { field, .. } if field == "run_id"
        ));
    }

    #[test]
    fn outputs_resolve_template_multiple_occurrences() {
        let yaml = BASIC_YAML.replace(
            "bench/out/{run_id}/plots",
            "bench/out/{run_id}/{run_id}/plots",
        );
        let mut cfg: BenchConfig = serde_yaml::from_str(&yaml).expect("parse");
        cfg.validate().expect("valid");
        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.plots_dir,
            PathBuf::from("bench/out/fork_smoke/fork_smoke/plots")
        );
    }
}
