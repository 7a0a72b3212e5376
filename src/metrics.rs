//! Multiclass evaluation metrics for the offline trainer

use crate::features::LabelTable;

/// Precision/recall/F1 for one class
#[derive(Debug, Clone)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Evaluation summary over one split
#[derive(Debug, Clone)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub macro_f1: f64,
    pub per_class: Vec<ClassMetrics>,
    pub n_samples: usize,
}

impl ClassificationReport {
    /// Compute accuracy plus per-class and macro-averaged precision/recall/F1.
    pub fn compute(y_true: &[usize], y_pred: &[usize], labels: &LabelTable) -> Self {
        assert_eq!(y_true.len(), y_pred.len());
        let n_classes = labels.len();
        let n_samples = y_true.len();

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| t == p)
            .count();
        let accuracy = if n_samples > 0 {
            correct as f64 / n_samples as f64
        } else {
            0.0
        };

        let mut per_class = Vec::with_capacity(n_classes);
        for k in 0..n_classes {
            let tp = y_true
                .iter()
                .zip(y_pred.iter())
                .filter(|(&t, &p)| t == k && p == k)
                .count();
            let fp = y_true
                .iter()
                .zip(y_pred.iter())
                .filter(|(&t, &p)| t != k && p == k)
                .count();
            let fn_ = y_true
                .iter()
                .zip(y_pred.iter())
                .filter(|(&t, &p)| t == k && p != k)
                .count();
            let support = y_true.iter().filter(|&&t| t == k).count();

            let precision = if tp + fp > 0 {
                tp as f64 / (tp + fp) as f64
            } else {
                0.0
            };
            let recall = if tp + fn_ > 0 {
                tp as f64 / (tp + fn_) as f64
            } else {
                0.0
            };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            per_class.push(ClassMetrics {
                label: labels.classes()[k].clone(),
                precision,
                recall,
                f1,
                support,
            });
        }

        let macro_f1 = if n_classes > 0 {
            per_class.iter().map(|m| m.f1).sum::<f64>() / n_classes as f64
        } else {
            0.0
        };

        Self {
            accuracy,
            macro_f1,
            per_class,
            n_samples,
        }
    }

    /// Render a text report in the style of a classification report table.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<12} {:>10} {:>10} {:>10} {:>10}\n",
            "", "precision", "recall", "f1-score", "support"
        ));
        for m in &self.per_class {
            out.push_str(&format!(
                "{:<12} {:>10.4} {:>10.4} {:>10.4} {:>10}\n",
                m.label, m.precision, m.recall, m.f1, m.support
            ));
        }
        out.push('\n');
        out.push_str(&format!(
            "{:<12} {:>10.4}  (n = {})\n",
            "accuracy", self.accuracy, self.n_samples
        ));
        out.push_str(&format!("{:<12} {:>10.4}\n", "macro f1", self.macro_f1));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelTable {
        LabelTable::new(vec![
            "Adelie".to_string(),
            "Chinstrap".to_string(),
            "Gentoo".to_string(),
        ])
    }

    #[test]
    fn test_perfect_predictions() {
        let y = vec![0, 1, 2, 0, 1, 2];
        let report = ClassificationReport::compute(&y, &y, &labels());
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.macro_f1, 1.0);
        assert!(report.per_class.iter().all(|m| m.f1 == 1.0));
    }

    #[test]
    fn test_all_wrong_predictions() {
        let y_true = vec![0, 0, 0];
        let y_pred = vec![1, 1, 1];
        let report = ClassificationReport::compute(&y_true, &y_pred, &labels());
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(report.macro_f1, 0.0);
    }

    #[test]
    fn test_mixed_predictions() {
        let y_true = vec![0, 0, 1, 1];
        let y_pred = vec![0, 1, 1, 1];
        let report = ClassificationReport::compute(&y_true, &y_pred, &labels());
        assert_eq!(report.accuracy, 0.75);
        // Class 0: precision 1.0, recall 0.5 -> f1 = 2/3
        let adelie = &report.per_class[0];
        assert!((adelie.f1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_render_includes_labels() {
        let y = vec![0, 1, 2];
        let report = ClassificationReport::compute(&y, &y, &labels());
        let text = report.render();
        assert!(text.contains("Adelie"));
        assert!(text.contains("macro f1"));
    }
}
