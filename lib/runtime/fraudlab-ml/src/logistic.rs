//! Class-balanced, L2-regularized logistic regression.
//!
//! Each class is weighted by `n_samples / (2 * n_class)`, so the rare fraud
//! class contributes as much total weight to the loss as the common class.
//! Features are standardized internally for conditioning; the fitted means
//! and scales travel with the model so scoring applies the identical
//! transform. The L2 penalty is charged on the raw-scale coefficients
//! (`coefficient / scale`), so the optimum is the one an unscaled fit
//! would reach.

use linfa::DatasetBase;
use linfa::traits::Fit;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use fraudlab_domain::TrainingConfig;

use crate::error::MlError;
use crate::linalg;

const ARMIJO: f64 = 1e-4;
const MIN_STEP: f64 = 1e-10;
const SCALE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticParams {
    c: f64,
    max_iter: usize,
    tolerance: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for LogisticParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            c: config.c,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    /// Coefficients on the standardized features.
    pub coefficients: Vec<f64>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub n_iter: usize,
}

/// `(negative_weight, positive_weight)` for the "balanced" scheme.
pub fn balanced_class_weights(labels: &[bool]) -> Result<(f64, f64), MlError> {
    let n = labels.len();
    if n == 0 {
        return Err(MlError::EmptyDataset);
    }
    let positives = labels.iter().filter(|&&y| y).count();
    let negatives = n - positives;
    if positives == 0 {
        return Err(MlError::SingleClass(false));
    }
    if negatives == 0 {
        return Err(MlError::SingleClass(true));
    }
    let n = n as f64;
    Ok((n / (2.0 * negatives as f64), n / (2.0 * positives as f64)))
}

impl Fit<Array2<f64>, Array1<bool>, MlError> for LogisticParams {
    type Object = LogisticModel;

    fn fit(
        &self,
        dataset: &DatasetBase<Array2<f64>, Array1<bool>>,
    ) -> Result<Self::Object, MlError> {
        let records = &dataset.records;
        let labels = &dataset.targets;
        let (n, d) = records.dim();
        if d == 0 {
            return Err(MlError::NoFeatures);
        }
        if labels.len() != n {
            return Err(MlError::LengthMismatch {
                expected: n,
                actual: labels.len(),
            });
        }
        let labels = labels.to_vec();
        let (w_neg, w_pos) = balanced_class_weights(&labels)?;

        let means = records.mean_axis(Axis(0)).ok_or(MlError::EmptyDataset)?;
        let scales = records
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > SCALE_EPS { s } else { 1.0 });

        // Design matrix with a leading intercept column.
        let mut design = Array2::<f64>::ones((n, d + 1));
        design
            .slice_mut(ndarray::s![.., 1..])
            .assign(&((records - &means) / &scales));

        let y: Array1<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        let sample_weight: Array1<f64> = labels
            .iter()
            .map(|&l| if l { w_pos } else { w_neg })
            .collect();
        let lambda = 1.0 / self.c;
        // Penalty on raw coefficient `b_j / s_j` is `lambda / s_j^2` per standardized one.
        let ridge: Array1<f64> = scales.mapv(|s| lambda / (s * s));

        let objective = |beta: &Array1<f64>| -> f64 {
            let z = design.dot(beta);
            let loss: f64 = z
                .iter()
                .zip(y.iter())
                .zip(sample_weight.iter())
                .map(|((&z, &y), &w)| w * (log1p_exp(z) - y * z))
                .sum();
            let penalty: f64 = beta
                .iter()
                .skip(1)
                .zip(ridge.iter())
                .map(|(b, r)| r * b * b)
                .sum();
            loss + 0.5 * penalty
        };

        let mut beta = Array1::<f64>::zeros(d + 1);
        let mut n_iter = 0;
        while n_iter < self.max_iter {
            n_iter += 1;
            let p = design.dot(&beta).mapv(sigmoid);
            let residual = (&p - &y) * &sample_weight;
            let mut grad = design.t().dot(&residual);
            for j in 1..=d {
                grad[j] += ridge[j - 1] * beta[j];
            }
            if max_abs(&grad) < self.tolerance {
                break;
            }

            let curvature = p.mapv(|p| p * (1.0 - p)) * &sample_weight;
            let weighted = &design * &curvature.view().insert_axis(Axis(1));
            let mut hessian = design.t().dot(&weighted);
            for j in 1..=d {
                hessian[[j, j]] += ridge[j - 1];
            }
            hessian[[0, 0]] += SCALE_EPS;

            let step = linalg::solve(&hessian, &grad)?;
            let current = objective(&beta);
            let slope = grad.dot(&step);
            let mut t = 1.0;
            let mut candidate = &beta - &step;
            while objective(&candidate) > current - ARMIJO * t * slope && t > MIN_STEP {
                t *= 0.5;
                candidate = &beta - &(&step * t);
            }
            let moved = max_abs(&(&step * t));
            beta = candidate;
            if moved < self.tolerance {
                break;
            }
        }
        tracing::debug!(n_iter, n_samples = n, n_features = d, "logistic regression fitted");

        Ok(LogisticModel {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
            means: means.to_vec(),
            scales: scales.to_vec(),
            n_iter,
        })
    }
}

impl LogisticModel {
    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Positive-class probability for every row.
    pub fn predict_proba(&self, records: ArrayView2<f64>) -> Result<Array1<f64>, MlError> {
        if records.ncols() != self.n_features() {
            return Err(MlError::FeatureCount {
                expected: self.n_features(),
                actual: records.ncols(),
            });
        }
        Ok(records
            .rows()
            .into_iter()
            .map(|row| {
                let z = row
                    .iter()
                    .zip(&self.coefficients)
                    .zip(self.means.iter().zip(&self.scales))
                    .fold(self.intercept, |acc, ((&x, &w), (&m, &s))| {
                        acc + w * (x - m) / s
                    });
                sigmoid(z)
            })
            .collect())
    }

    pub fn predict(&self, records: ArrayView2<f64>, threshold: f64) -> Result<Array1<bool>, MlError> {
        Ok(self.predict_proba(records)?.mapv(|p| p >= threshold))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn log1p_exp(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn max_abs(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()))
}
