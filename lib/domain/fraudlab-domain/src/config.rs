use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactPaths;
use crate::error::{PipelineError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FraudlabConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub etl: EtlConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    #[serde(default = "default_raw_dir")]
    pub raw: PathBuf,
    pub processed: PathBuf,
    pub reports: PathBuf,
    pub models: PathBuf,
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EtlConfig {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.3,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    /// Inverse L2 regularization strength.
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
    /// Probability at or above which a transaction is predicted fraudulent.
    pub threshold: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tolerance: 1e-8,
            threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnomalyConfig {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_samples: 256,
            contamination: 0.025,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Every exclusion-list column must be present.
    #[default]
    Strict,
    /// Missing exclusion-list columns are ignored with a warning.
    Lenient,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FeaturesConfig {
    pub policy: SelectionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    pub retries: u32,
    pub retry_delay_secs: u64,
    /// Directory holding the job binaries. Defaults to the directory of the
    /// running executable.
    pub bin_dir: Option<PathBuf>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            retries: 1,
            retry_delay_secs: 300,
            bin_dir: None,
        }
    }
}

impl FraudlabConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| PipelineError::Config(format!("invalid config YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Config rooted at `base`, with every other section left at its default.
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            paths: PathsConfig {
                raw: base.join("data/raw"),
                processed: base.join("data/processed"),
                reports: base.join("reports"),
                models: base.join("models"),
            },
            etl: EtlConfig::default(),
            training: TrainingConfig::default(),
            anomaly: AnomalyConfig::default(),
            features: FeaturesConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.etl.test_fraction > 0.0 && self.etl.test_fraction < 1.0) {
            return Err(PipelineError::Config(format!(
                "etl.test_fraction must be in (0, 1), got {}",
                self.etl.test_fraction
            )));
        }
        if !(self.anomaly.contamination > 0.0 && self.anomaly.contamination <= 0.5) {
            return Err(PipelineError::Config(format!(
                "anomaly.contamination must be in (0, 0.5], got {}",
                self.anomaly.contamination
            )));
        }
        if self.anomaly.n_estimators == 0 || self.anomaly.max_samples == 0 {
            return Err(PipelineError::Config(
                "anomaly.n_estimators and anomaly.max_samples must be positive".to_string(),
            ));
        }
        if !(self.training.c > 0.0) || self.training.max_iter == 0 {
            return Err(PipelineError::Config(
                "training.c and training.max_iter must be positive".to_string(),
            ));
        }
        if !(self.training.threshold > 0.0 && self.training.threshold < 1.0) {
            return Err(PipelineError::Config(format!(
                "training.threshold must be in (0, 1), got {}",
                self.training.threshold
            )));
        }
        Ok(())
    }

    pub fn artifacts(&self) -> ArtifactPaths {
        ArtifactPaths::from_paths(&self.paths)
    }
}
