//! The feature-selection rule shared by the trainer and the anomaly scorer.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use fraudlab_domain::schema::EXCLUDED_COLUMNS;
use fraudlab_domain::{PipelineError, Result, SelectionPolicy};

/// Ordered model input columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    names: Vec<String>,
}

impl FeatureSet {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Fails unless `other` names exactly the same columns.
    ///
    /// Order is not compared: matrices are always built in this set's order.
    pub fn ensure_matches(&self, other: &FeatureSet) -> Result<()> {
        let ours: BTreeSet<&str> = self.names.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = other.names.iter().map(String::as_str).collect();
        if ours == theirs {
            return Ok(());
        }
        let missing: Vec<&str> = ours.difference(&theirs).copied().collect();
        let unexpected: Vec<&str> = theirs.difference(&ours).copied().collect();
        Err(PipelineError::schema(format!(
            "feature set drift: missing {missing:?}, unexpected {unexpected:?}"
        )))
    }
}

/// Drops the fixed non-feature columns from `columns`, keeping input order.
///
/// Under [`SelectionPolicy::Strict`] every exclusion-list column must be
/// present; otherwise the absent ones are reported and simply not excluded.
pub fn select_features<S: AsRef<str>>(
    columns: &[S],
    policy: SelectionPolicy,
) -> Result<FeatureSet> {
    let absent: Vec<&str> = EXCLUDED_COLUMNS
        .iter()
        .copied()
        .filter(|excluded| !columns.iter().any(|c| c.as_ref() == *excluded))
        .collect();

    if !absent.is_empty() {
        match policy {
            SelectionPolicy::Strict => {
                return Err(PipelineError::schema(format!(
                    "expected non-feature columns are absent: {absent:?}"
                )));
            }
            SelectionPolicy::Lenient => {
                tracing::warn!(?absent, "non-feature columns absent, continuing");
            }
        }
    }

    let names = columns
        .iter()
        .map(AsRef::as_ref)
        .filter(|c| !EXCLUDED_COLUMNS.contains(c))
        .map(str::to_string)
        .collect();
    Ok(FeatureSet::new(names))
}
