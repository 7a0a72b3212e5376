//! Gradient-boosted decision trees with second-order approximation
//!
//! Multiclass classifier trained with softmax loss: each boosting round fits
//! one regression tree per class on the gradient/hessian of that class's
//! margin. Leaf weights are regularized, `w* = -G / (H + lambda)` with L1
//! soft-thresholding, and splits are scored with the gain formula
//! `0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)]` against a `gamma`
//! threshold.
//!
//! Trained ensembles serialize to JSON; that file is the model artifact the
//! inference service loads.

use std::path::Path;

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PenguinError, Result};

/// Boosting hyperparameters. Defaults mirror the offline training script:
/// 100 rounds of depth-3 trees, no subsampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 3,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(42),
        }
    }
}

/// A single node in a boosted tree
#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, sample: &[f64]) -> f64 {
        match self {
            TreeNode::Leaf { weight } => *weight,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    if alpha > 0.0 {
        // Soft-threshold for L1
        let g_adj = if g_sum > alpha {
            g_sum - alpha
        } else if g_sum < -alpha {
            g_sum + alpha
        } else {
            return 0.0;
        };
        -g_adj / (h_sum + lambda)
    } else {
        -g_sum / (h_sum + lambda)
    }
}

/// Best split for one feature, found by exact greedy scan over sorted values.
/// Returns `(threshold, gain)` or `None` when no admissible split exists.
fn best_split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature: usize,
    config: &BoostingConfig,
) -> Option<(f64, f64)> {
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let g_total: f64 = sorted.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = sorted.iter().map(|&i| hess[i]).sum();

    let lambda = config.reg_lambda;
    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<(f64, f64)> = None;

    for (pos, &idx) in sorted.iter().enumerate() {
        g_left += grad[idx];
        h_left += hess[idx];

        let Some(&next_idx) = sorted.get(pos + 1) else {
            break;
        };
        // Identical adjacent values cannot be separated
        if (x[[idx, feature]] - x[[next_idx, feature]]).abs() < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * ((g_left * g_left) / (h_left + lambda)
                + (g_right * g_right) / (h_right + lambda)
                - (g_total * g_total) / (h_total + lambda));

        if best.map_or(true, |(_, g)| gain > g) {
            let threshold = (x[[idx, feature]] + x[[next_idx, feature]]) / 2.0;
            best = Some((threshold, gain));
        }
    }

    best
}

/// Grow one tree on the given gradient/hessian statistics. Split search is
/// parallelized across candidate features.
fn build_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &BoostingConfig,
) -> TreeNode {
    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();
    let weight = leaf_weight(g_sum, h_sum, config.reg_lambda, config.reg_alpha);

    if depth >= config.max_depth || indices.len() < 2 || h_sum < config.min_child_weight {
        return TreeNode::Leaf { weight };
    }

    let best_split = feature_indices
        .par_iter()
        .filter_map(|&f| best_split_for_feature(x, grad, hess, indices, f, config).map(|(t, g)| (f, t, g)))
        .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

    match best_split {
        Some((feature, threshold, gain)) if gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return TreeNode::Leaf { weight };
            }

            let left = build_tree(x, grad, hess, &left_idx, feature_indices, depth + 1, config);
            let right = build_tree(x, grad, hess, &right_idx, feature_indices, depth + 1, config);

            TreeNode::Split {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => TreeNode::Leaf { weight },
    }
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil() as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort();
    indices
}

fn softmax_row(raw: &[f64]) -> Vec<f64> {
    let max = raw.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = raw.iter().map(|&v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|&e| e / sum).collect()
}

/// Multiclass gradient-boosted-tree classifier.
///
/// `trees[round][class]` holds the tree fitted for one class in one boosting
/// round. Prediction sums the per-class tree outputs into raw margins,
/// applies softmax, and takes the argmax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenguinClassifier {
    config: BoostingConfig,
    trees: Vec<Vec<TreeNode>>,
    base_scores: Vec<f64>,
    n_classes: usize,
    n_features: usize,
}

impl PenguinClassifier {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_scores: Vec::new(),
            n_classes: 0,
            n_features: 0,
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Fit on a design matrix and integer class targets in `0..n_classes`.
    pub fn fit(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        let n_samples = x.nrows();
        if y.len() != n_samples {
            return Err(PenguinError::Training(format!(
                "target length {} does not match {} samples",
                y.len(),
                n_samples
            )));
        }
        if n_classes < 2 {
            return Err(PenguinError::Training(
                "need at least two classes".to_string(),
            ));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(PenguinError::Training(format!(
                "class label {bad} outside 0..{n_classes}"
            )));
        }

        self.n_classes = n_classes;
        self.n_features = x.ncols();

        // Initialize raw margins with log class priors
        let mut counts = vec![0usize; n_classes];
        for &c in y {
            counts[c] += 1;
        }
        self.base_scores = counts
            .iter()
            .map(|&c| {
                let p = (c as f64 / n_samples as f64).clamp(1e-7, 1.0 - 1e-7);
                p.ln()
            })
            .collect();

        let mut raw = Array2::<f64>::zeros((n_samples, n_classes));
        for i in 0..n_samples {
            for k in 0..n_classes {
                raw[[i, k]] = self.base_scores[k];
            }
        }

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();

        for _ in 0..self.config.n_estimators {
            // Softmax loss: grad_k = p_k - 1[y = k], hess_k = p_k * (1 - p_k)
            let probs: Vec<Vec<f64>> = (0..n_samples)
                .map(|i| softmax_row(raw.row(i).as_slice().expect("row is contiguous")))
                .collect();

            let mut round_trees = Vec::with_capacity(n_classes);
            for k in 0..n_classes {
                let grad: Array1<f64> = (0..n_samples)
                    .map(|i| probs[i][k] - if y[i] == k { 1.0 } else { 0.0 })
                    .collect();
                let hess: Array1<f64> = (0..n_samples)
                    .map(|i| (probs[i][k] * (1.0 - probs[i][k])).max(1e-7))
                    .collect();

                let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
                let col_indices = subsample(&mut rng, self.n_features, self.config.colsample_bytree);

                let tree = build_tree(x, &grad, &hess, &row_indices, &col_indices, 0, &self.config);

                for &i in &row_indices {
                    let row = x.row(i);
                    let sample = row.as_slice().expect("row is contiguous");
                    raw[[i, k]] += self.config.learning_rate * tree.predict(sample);
                }

                round_trees.push(tree);
            }
            self.trees.push(round_trees);
        }

        Ok(())
    }

    fn raw_margins(&self, sample: &[f64]) -> Vec<f64> {
        let mut raw = self.base_scores.clone();
        for round in &self.trees {
            for (k, tree) in round.iter().enumerate() {
                raw[k] += self.config.learning_rate * tree.predict(sample);
            }
        }
        raw
    }

    /// Predict the class index for a single feature vector.
    pub fn predict_one(&self, sample: &[f64]) -> Result<usize> {
        if !self.is_fitted() {
            return Err(PenguinError::Inference("model not fitted".to_string()));
        }
        if sample.len() != self.n_features {
            return Err(PenguinError::Inference(format!(
                "expected {} features, got {}",
                self.n_features,
                sample.len()
            )));
        }
        let raw = self.raw_margins(sample);
        let (argmax, _) = raw
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .expect("at least two classes after fit");
        Ok(argmax)
    }

    /// Predict class indices for every row of a matrix.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        (0..x.nrows())
            .map(|i| {
                let row = x.row(i);
                self.predict_one(row.as_slice().expect("row is contiguous"))
            })
            .collect()
    }

    /// Per-class probabilities for every row of a matrix.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(PenguinError::Inference("model not fitted".to_string()));
        }
        let n = x.nrows();
        let mut out = Array2::<f64>::zeros((n, self.n_classes));
        for i in 0..n {
            let row = x.row(i);
            let raw = self.raw_margins(row.as_slice().expect("row is contiguous"));
            for (k, p) in softmax_row(&raw).into_iter().enumerate() {
                out[[i, k]] = p;
            }
        }
        Ok(out)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&json)?;
        Ok(model)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        let model: Self = serde_json::from_slice(bytes)?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three well-separated clusters in two dimensions
    fn three_class_data() -> (Array2<f64>, Vec<usize>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        let centers = [(0.0, 0.0), (5.0, 5.0), (10.0, 0.0)];
        for (class, &(cx, cy)) in centers.iter().enumerate() {
            for i in 0..30 {
                let jitter = (i as f64) * 0.02;
                rows.push([cx + jitter, cy - jitter]);
                y.push(class);
            }
        }
        let flat: Vec<f64> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        (Array2::from_shape_vec((90, 2), flat).unwrap(), y)
    }

    fn fast_config() -> BoostingConfig {
        BoostingConfig {
            n_estimators: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_fit_and_predict_separable() {
        let (x, y) = three_class_data();
        let mut model = PenguinClassifier::new(fast_config());
        model.fit(&x, &y, 3).unwrap();

        let preds = model.predict(&x).unwrap();
        let correct = preds.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        assert!(correct as f64 / y.len() as f64 > 0.95);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = three_class_data();
        let mut model = PenguinClassifier::new(fast_config());
        model.fit(&x, &y, 3).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (90, 3));
        for row in proba.rows() {
            let sum: f64 = row.sum();
            assert!((sum - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let (x, y) = three_class_data();
        let mut a = PenguinClassifier::new(fast_config());
        let mut b = PenguinClassifier::new(fast_config());
        a.fit(&x, &y, 3).unwrap();
        b.fit(&x, &y, 3).unwrap();

        let sample = [5.1, 4.9];
        assert_eq!(a.predict_one(&sample).unwrap(), b.predict_one(&sample).unwrap());
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_save_load_roundtrip() {
        let (x, y) = three_class_data();
        let mut model = PenguinClassifier::new(fast_config());
        model.fit(&x, &y, 3).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        model.save(&path).unwrap();
        let loaded = PenguinClassifier::load(&path).unwrap();

        let preds_before = model.predict(&x).unwrap();
        let preds_after = loaded.predict(&x).unwrap();
        assert_eq!(preds_before, preds_after);
    }

    #[test]
    fn test_predict_one_feature_count_mismatch() {
        let (x, y) = three_class_data();
        let mut model = PenguinClassifier::new(fast_config());
        model.fit(&x, &y, 3).unwrap();

        let err = model.predict_one(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, PenguinError::Inference(_)));
    }

    #[test]
    fn test_unfitted_model_errors() {
        let model = PenguinClassifier::new(BoostingConfig::default());
        assert!(model.predict_one(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_bad_targets_rejected() {
        let (x, mut y) = three_class_data();
        y[0] = 7; // outside 0..3
        let mut model = PenguinClassifier::new(fast_config());
        assert!(matches!(
            model.fit(&x, &y, 3).unwrap_err(),
            PenguinError::Training(_)
        ));
    }
}
