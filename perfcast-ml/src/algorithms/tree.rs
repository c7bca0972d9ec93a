//! CART decision tree classifier.

use super::{
    Classifier, ParamSet, check_params, param_opt_usize, param_str, param_usize,
    validate_predict_input, validate_training_set,
};
use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// Impurity measure used to score candidate splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    Gini,
    Entropy,
}

impl Criterion {
    fn parse(s: &str) -> Result<Self, MlError> {
        match s {
            "gini" => Ok(Self::Gini),
            "entropy" => Ok(Self::Entropy),
            other => Err(MlError::invalid_input(format!(
                "criterion must be 'gini' or 'entropy', got '{other}'"
            ))),
        }
    }

    fn impurity(&self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        match self {
            Self::Gini => 1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>(),
            Self::Entropy => counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    -p * p.log2()
                })
                .sum(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Binary tree grown greedily on axis-aligned thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    criterion: Criterion,
    n_features: Option<usize>,
    root: Option<Node>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
            n_features: None,
            root: None,
        }
    }
}

impl DecisionTree {
    pub fn from_params(params: &ParamSet) -> Result<Self, MlError> {
        check_params(
            params,
            &["max_depth", "min_samples_split", "min_samples_leaf", "criterion"],
            "DecisionTree",
        )?;
        let min_samples_split = param_usize(params, "min_samples_split", 2)?;
        let min_samples_leaf = param_usize(params, "min_samples_leaf", 1)?;
        if min_samples_split < 2 {
            return Err(MlError::invalid_input("min_samples_split must be at least 2"));
        }
        if min_samples_leaf < 1 {
            return Err(MlError::invalid_input("min_samples_leaf must be at least 1"));
        }
        Ok(Self {
            max_depth: param_opt_usize(params, "max_depth", None)?,
            min_samples_split,
            min_samples_leaf,
            criterion: Criterion::parse(param_str(params, "criterion", "gini")?)?,
            n_features: None,
            root: None,
        })
    }

    /// Depth of the fitted tree; a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        self.root.as_ref().map(walk).unwrap_or(0)
    }

    fn grow(&self, x: &[Vec<f64>], y: &[usize], n_labels: usize, idx: &mut [usize], depth: usize) -> Node {
        let counts = class_counts(y, idx, n_labels);
        let majority = majority(&counts);
        let total = idx.len();

        let depth_reached = self.max_depth.is_some_and(|d| depth >= d);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if depth_reached || pure || total < self.min_samples_split {
            return Node::Leaf { class: majority };
        }

        let parent = self.criterion.impurity(&counts, total);
        let Some(split) = self.best_split(x, y, n_labels, idx, parent) else {
            return Node::Leaf { class: majority };
        };

        idx.sort_by(|&a, &b| x[a][split.feature].total_cmp(&x[b][split.feature]));
        let cut = idx.partition_point(|&i| x[i][split.feature] <= split.threshold);
        let (left_idx, right_idx) = idx.split_at_mut(cut);
        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.grow(x, y, n_labels, left_idx, depth + 1)),
            right: Box::new(self.grow(x, y, n_labels, right_idx, depth + 1)),
        }
    }

    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[usize],
        n_labels: usize,
        idx: &[usize],
        parent: f64,
    ) -> Option<Candidate> {
        let total = idx.len();
        let width = x[idx[0]].len();
        let mut best: Option<Candidate> = None;
        let mut order = idx.to_vec();

        for feature in 0..width {
            order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));
            let mut left = vec![0usize; n_labels];
            let mut right = class_counts(y, &order, n_labels);

            for pos in 1..total {
                let moved = order[pos - 1];
                left[y[moved]] += 1;
                right[y[moved]] -= 1;

                let lo = x[moved][feature];
                let hi = x[order[pos]][feature];
                if lo == hi || pos < self.min_samples_leaf || total - pos < self.min_samples_leaf {
                    continue;
                }

                let weighted = (pos as f64 * self.criterion.impurity(&left, pos)
                    + (total - pos) as f64 * self.criterion.impurity(&right, total - pos))
                    / total as f64;
                if weighted >= parent - 1e-12 {
                    continue;
                }
                if best.as_ref().is_none_or(|b| weighted < b.impurity) {
                    best = Some(Candidate {
                        feature,
                        threshold: (lo + hi) / 2.0,
                        impurity: weighted,
                    });
                }
            }
        }
        best
    }

    fn classify(&self, row: &[f64]) -> usize {
        let mut node = match &self.root {
            Some(root) => root,
            None => return 0,
        };
        loop {
            match node {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn class_counts(y: &[usize], idx: &[usize], n_labels: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_labels];
    for &i in idx {
        counts[y[i]] += 1;
    }
    counts
}

/// Most frequent label; ties resolve to the smallest label.
fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (label, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = label;
        }
    }
    best
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<(), MlError> {
        let (width, n_labels) = validate_training_set(x, y)?;
        let mut idx: Vec<usize> = (0..x.len()).collect();
        self.root = Some(self.grow(x, y, n_labels, &mut idx, 0));
        self.n_features = Some(width);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, MlError> {
        validate_predict_input(x, self.n_features)?;
        Ok(x.iter().map(|row| self.classify(row)).collect())
    }
}
