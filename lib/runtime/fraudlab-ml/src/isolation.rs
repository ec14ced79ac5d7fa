//! Isolation forest anomaly detector.
//!
//! Trees are grown on random subsamples by splitting a random non-constant
//! feature at a uniform threshold between its node-local min and max.
//! Shorter average path lengths mean easier isolation, i.e. more anomalous.

use linfa::DatasetBase;
use linfa::traits::Fit;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fraudlab_domain::AnomalyConfig;

use crate::error::MlError;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, PartialEq)]
pub struct IsolationForestParams {
    n_estimators: usize,
    max_samples: usize,
    contamination: f64,
    seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self::from(&AnomalyConfig::default())
    }
}

impl From<&AnomalyConfig> for IsolationForestParams {
    fn from(config: &AnomalyConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_samples: config.max_samples,
            contamination: config.contamination,
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(data: &ArrayView2<f64>, sample: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build(data, sample, 0, max_depth, rng);
        tree
    }

    fn build(
        &mut self,
        data: &ArrayView2<f64>,
        rows: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });
        if depth >= max_depth || rows.len() <= 1 {
            return id;
        }

        let candidates: Vec<(usize, f64, f64)> = (0..data.ncols())
            .filter_map(|feature| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let v = data[[r, feature]];
                    (lo.min(v), hi.max(v))
                });
                (lo < hi).then_some((feature, lo, hi))
            })
            .collect();
        if candidates.is_empty() {
            return id;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = split_point(lo, hi, rng);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| data[[r, feature]] <= threshold);

        let left = self.build(data, left_rows, depth + 1, max_depth, rng);
        let right = self.build(data, right_rows, depth + 1, max_depth, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn path_length(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search among `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        n => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    n_features: usize,
    offset: f64,
}

impl<T> Fit<Array2<f64>, T, MlError> for IsolationForestParams {
    type Object = IsolationForest;

    fn fit(&self, dataset: &DatasetBase<Array2<f64>, T>) -> Result<Self::Object, MlError> {
        let data = dataset.records.view();
        let (n, d) = data.dim();
        if n == 0 {
            return Err(MlError::EmptyDataset);
        }
        if d == 0 {
            return Err(MlError::NoFeatures);
        }

        let sample_size = self.max_samples.min(n);
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let trees = (0..self.n_estimators)
            .map(|_| {
                let sample = rand::seq::index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::grow(&data, sample, max_depth, &mut rng)
            })
            .collect();

        let mut forest = IsolationForest {
            trees,
            sample_size,
            n_features: d,
            offset: 0.0,
        };
        let scores = forest.score_samples(data)?;
        forest.offset = percentile(scores.to_vec(), self.contamination);
        tracing::debug!(
            n_estimators = self.n_estimators,
            sample_size,
            offset = forest.offset,
            "isolation forest fitted"
        );
        Ok(forest)
    }
}

impl IsolationForest {
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Raw normality score in `[-1, 0)`: lower is more anomalous.
    pub fn score_samples(&self, records: ArrayView2<f64>) -> Result<Array1<f64>, MlError> {
        if records.ncols() != self.n_features {
            return Err(MlError::FeatureCount {
                expected: self.n_features,
                actual: records.ncols(),
            });
        }
        let norm = average_path_length(self.sample_size).max(f64::MIN_POSITIVE);
        let trees = self.trees.len().max(1) as f64;
        Ok(records
            .rows()
            .into_iter()
            .map(|row| {
                let mean_depth =
                    self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / trees;
                -(2f64.powf(-mean_depth / norm))
            })
            .collect())
    }

    /// Normality score shifted so the contamination quantile sits at zero.
    /// Negative values are outliers.
    pub fn decision_function(&self, records: ArrayView2<f64>) -> Result<Array1<f64>, MlError> {
        Ok(self.score_samples(records)? - self.offset)
    }

    /// Flags (1 = outlier) and anomaly scores (larger = more anomalous).
    pub fn flag_and_score(&self, records: ArrayView2<f64>) -> Result<AnomalyScores, MlError> {
        let decision = self.decision_function(records)?;
        Ok(AnomalyScores {
            flags: decision.iter().map(|&d| u8::from(d < 0.0)).collect(),
            scores: decision.iter().map(|&d| -d).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyScores {
    pub flags: Vec<u8>,
    pub scores: Vec<f64>,
}

impl AnomalyScores {
    pub fn flagged(&self) -> usize {
        self.flags.iter().filter(|&&f| f == 1).count()
    }
}

/// Uniform draw in `[lo, hi]`. Mixing the endpoints keeps the result finite
/// even when `hi - lo` overflows.
fn split_point(lo: f64, hi: f64, rng: &mut StdRng) -> f64 {
    let u: f64 = rng.gen_range(0.0..1.0);
    (lo * (1.0 - u) + hi * u).clamp(lo, hi)
}

/// Linearly interpolated quantile, `q` in `[0, 1]`.
fn percentile(mut values: Vec<f64>, q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let rank = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use linfa::DatasetBase;
    use ndarray::array;

    /// 1000 rows: 975 in a tight blob, 25 far away.
    fn contaminated() -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(7);
        Array2::from_shape_fn((1000, 3), |(i, _)| {
            if i % 40 == 39 {
                rng.gen_range(80.0..120.0)
            } else {
                rng.gen_range(-1.0..1.0)
            }
        })
    }

    fn fit(records: Array2<f64>) -> (IsolationForest, Array2<f64>) {
        let dataset = DatasetBase::new(records, ());
        let forest = IsolationForestParams::default().fit(&dataset).unwrap();
        (forest, dataset.records)
    }

    #[test]
    fn path_length_normalizer() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.244).abs() < 0.01, "{c256}");
    }

    #[test]
    fn percentile_interpolates() {
        assert_eq!(percentile(vec![4.0, 1.0, 3.0, 2.0], 0.5), 2.5);
        assert_eq!(percentile(vec![1.0, 2.0, 3.0], 0.0), 1.0);
    }

    #[test]
    fn flags_about_the_contamination_fraction() {
        let (forest, records) = fit(contaminated());
        let scores = forest.flag_and_score(records.view()).unwrap();
        let fraction = scores.flagged() as f64 / records.nrows() as f64;
        assert!((0.01..=0.05).contains(&fraction), "flagged {fraction}");
        for i in (39..1000).step_by(40) {
            assert_eq!(scores.flags[i], 1, "outlier row {i} not flagged");
        }
    }

    #[test]
    fn extreme_point_scores_above_inlier() {
        let (forest, _) = fit(contaminated());
        let points = array![[500.0, 500.0, 500.0], [0.0, 0.0, 0.0]];
        let scores = forest.flag_and_score(points.view()).unwrap();
        assert!(scores.scores[0] > scores.scores[1]);
        assert_eq!(scores.flags[1], 0);
    }

    #[test]
    fn same_seed_same_scores() {
        let (a, records) = fit(contaminated());
        let (b, _) = fit(contaminated());
        assert_eq!(
            a.flag_and_score(records.view()).unwrap(),
            b.flag_and_score(records.view()).unwrap()
        );
    }

    #[test]
    fn constant_data_is_isolated_at_the_root() {
        let (forest, records) = fit(Array2::from_elem((50, 2), 3.0));
        let scores = forest.score_samples(records.view()).unwrap();
        assert!(scores.iter().all(|&s| (s - scores[0]).abs() < 1e-12));
    }

    #[test]
    fn span_wider_than_f64_range_still_fits() {
        let records = Array2::from_shape_fn((64, 1), |(i, _)| match i {
            0 => -1.5e308,
            1 => 1.5e308,
            _ => i as f64,
        });
        let (forest, records) = fit(records);
        let scores = forest.flag_and_score(records.view()).unwrap();
        assert!(scores.scores.iter().all(|s| s.is_finite()));
        assert!(scores.scores[0] > scores.scores[10]);
    }

    #[test]
    fn split_point_stays_inside_the_span() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let t = split_point(-f64::MAX, f64::MAX, &mut rng);
            assert!(t.is_finite());
            let t = split_point(2.0, 2.5, &mut rng);
            assert!((2.0..=2.5).contains(&t));
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let dataset = DatasetBase::new(Array2::<f64>::zeros((0, 3)), ());
        assert!(matches!(
            IsolationForestParams::default().fit(&dataset),
            Err(MlError::EmptyDataset)
        ));
    }
}
