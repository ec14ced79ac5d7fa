//! Binary classification metrics at a threshold and over the full ranking.

use crate::error::MlError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub tn: u64,
    pub fp: u64,
    pub fn_count: u64,
    pub tp: u64,
}

impl ConfusionMatrix {
    pub fn from_predictions(labels: &[bool], predictions: &[bool]) -> Self {
        let mut cm = Self::default();
        for (&label, &pred) in labels.iter().zip(predictions) {
            match (label, pred) {
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_count += 1,
                (true, true) => cm.tp += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> u64 {
        self.tn + self.fp + self.fn_count + self.tp
    }

    /// Row-major `[[tn, fp], [fn, tp]]`.
    pub fn to_rows(&self) -> [[u64; 2]; 2] {
        [[self.tn, self.fp], [self.fn_count, self.tp]]
    }

    /// Zero when nothing was predicted positive.
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Zero when there are no positive labels.
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_count)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 }
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMetrics {
    pub confusion: ConfusionMatrix,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
    pub pr_auc: f64,
    pub positive_rate: f64,
}

/// Evaluates positive-class probabilities against the true labels.
pub fn evaluate(labels: &[bool], scores: &[f64], threshold: f64) -> Result<BinaryMetrics, MlError> {
    check_lengths(labels, scores)?;
    let predictions: Vec<bool> = scores.iter().map(|&s| s >= threshold).collect();
    let confusion = ConfusionMatrix::from_predictions(labels, &predictions);
    let positives = labels.iter().filter(|&&l| l).count();
    Ok(BinaryMetrics {
        confusion,
        precision: confusion.precision(),
        recall: confusion.recall(),
        f1: confusion.f1(),
        roc_auc: roc_auc(labels, scores)?,
        pr_auc: average_precision(labels, scores)?,
        positive_rate: positives as f64 / labels.len().max(1) as f64,
    })
}

/// Area under the ROC curve via the rank-sum statistic; tied scores share
/// their average rank.
pub fn roc_auc(labels: &[bool], scores: &[f64]) -> Result<f64, MlError> {
    check_lengths(labels, scores)?;
    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(MlError::UndefinedMetric { metric: "roc_auc" });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie group spans ranks start+1 ..= end+1.
        let average_rank = (start + end) as f64 / 2.0 + 1.0;
        let tied_positives = order[start..=end].iter().filter(|&&i| labels[i]).count();
        positive_rank_sum += average_rank * tied_positives as f64;
        start = end + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Average precision: precision at each distinct threshold, weighted by the
/// recall gained there.
pub fn average_precision(labels: &[bool], scores: &[f64]) -> Result<f64, MlError> {
    check_lengths(labels, scores)?;
    let positives = labels.iter().filter(|&&l| l).count();
    if positives == 0 {
        return Err(MlError::UndefinedMetric { metric: "pr_auc" });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let (mut tp, mut fp) = (0usize, 0usize);
    let mut previous_recall = 0.0;
    let mut ap = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        for &i in &order[start..=end] {
            if labels[i] { tp += 1 } else { fp += 1 }
        }
        let recall = tp as f64 / positives as f64;
        let precision = tp as f64 / (tp + fp) as f64;
        ap += (recall - previous_recall) * precision;
        previous_recall = recall;
        start = end + 1;
    }
    Ok(ap)
}

fn check_lengths(labels: &[bool], scores: &[f64]) -> Result<(), MlError> {
    if labels.len() != scores.len() {
        return Err(MlError::LengthMismatch {
            expected: labels.len(),
            actual: scores.len(),
        });
    }
    Ok(())
}
