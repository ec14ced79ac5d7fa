use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use fraudlab_domain::{ArtifactPaths, PipelineError, Result};

use crate::writer;

const FEATURE_LIST_HEADER: &str = "feature";

/// Fitted-parameter blob plus its sibling ordered feature list. Neither is
/// usable without the other.
#[derive(Debug, Clone)]
pub struct ModelStore {
    blob: PathBuf,
    feature_list: PathBuf,
}

impl ModelStore {
    pub fn new(paths: &ArtifactPaths) -> Self {
        Self {
            blob: paths.model_blob(),
            feature_list: paths.feature_list(),
        }
    }

    pub fn blob_path(&self) -> &Path {
        &self.blob
    }

    pub fn save<M: Serialize>(&self, model: &M, features: &[String]) -> Result<()> {
        writer::write_json(&self.blob, model)?;
        writer::write_lines(&self.feature_list, FEATURE_LIST_HEADER, features)?;
        tracing::info!(
            model = %self.blob.display(),
            features = features.len(),
            "model artifact saved"
        );
        Ok(())
    }

    pub fn load<M: DeserializeOwned>(&self) -> Result<(M, Vec<String>)> {
        let blob = read(&self.blob)?;
        let model = serde_json::from_str(&blob)?;
        let listing = read(&self.feature_list)?;
        let mut lines = listing.lines();
        if lines.next() != Some(FEATURE_LIST_HEADER) {
            return Err(PipelineError::schema(format!(
                "{} does not start with a `{FEATURE_LIST_HEADER}` header",
                self.feature_list.display()
            )));
        }
        let features = lines
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Ok((model, features))
    }
}

fn read(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(PipelineError::InputNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraudlab_domain::FraudlabConfig;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Params {
        weights: Vec<f64>,
    }

    #[test]
    fn save_then_load_keeps_feature_order() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        let store = ModelStore::new(&config.artifacts());
        let features = vec!["txn_count_24h".to_string(), "amount".to_string()];
        let params = Params {
            weights: vec![0.5, -1.25],
        };
        store.save(&params, &features).unwrap();

        let (loaded, loaded_features): (Params, Vec<String>) = store.load().unwrap();
        assert_eq!(loaded, params);
        assert_eq!(loaded_features, features);
    }

    #[test]
    fn missing_feature_list_is_input_not_found() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        let store = ModelStore::new(&config.artifacts());
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(store.blob_path(), r#"{"weights":[1.0]}"#).unwrap();
        let err = store.load::<Params>().unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound { ref path } if path.ends_with("features.txt")));
    }
}
