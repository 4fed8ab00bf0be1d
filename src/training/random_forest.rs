//! Bagged Gini trees voting by majority

use ndarray::{Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::decision_tree::{majority, DecisionTree};
use crate::error::{InsightsError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    /// Seed for bootstrap draws and per-split feature sampling.
    pub random_state: u64,
    n_features: usize,
    n_classes: usize,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            random_state: 42,
            n_features: 0,
            n_classes: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Square root of the feature count, rounded up.
    fn max_features(n_features: usize) -> usize {
        ((n_features as f64).sqrt().ceil() as usize).max(1)
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(InsightsError::MalformedInput(format!(
                "feature matrix has {} rows but {} labels",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(InsightsError::InsufficientData { needed: 1, got: 0 });
        }
        if self.n_estimators == 0 {
            return Err(InsightsError::Config(
                "a forest needs at least one tree".to_string(),
            ));
        }

        self.n_features = x.ncols();
        self.n_classes = y.iter().copied().max().map_or(0, |m| m + 1);
        let max_features = Self::max_features(self.n_features);

        let mut trees = Vec::with_capacity(self.n_estimators);
        for tree_idx in 0..self.n_estimators {
            let seed = self.random_state.wrapping_add(tree_idx as u64);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            let sample_indices: Vec<usize> = (0..n_samples)
                .map(|_| rng.gen_range(0..n_samples))
                .collect();

            let mut tree = DecisionTree::new()
                .with_max_depth(self.max_depth)
                .with_max_features(max_features);
            tree.fit(x, y, &sample_indices, &mut rng)?;
            trees.push(tree);
        }
        self.trees = trees;
        self.compute_feature_importances();

        tracing::debug!(
            "Fitted {} trees on {} samples ({} features, {} per split)",
            self.trees.len(),
            n_samples,
            self.n_features,
            max_features
        );
        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, &val) in total.iter_mut().zip(tree.feature_importances()) {
                *acc += val;
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }
        self.feature_importances = total;
    }

    fn votes(&self, sample: ArrayView1<f64>) -> Result<Vec<usize>> {
        if self.trees.is_empty() {
            return Err(InsightsError::ModelNotTrained);
        }
        if sample.len() != self.n_features {
            return Err(InsightsError::MalformedInput(format!(
                "expected {} features, got {}",
                self.n_features,
                sample.len()
            )));
        }
        let mut votes = vec![0usize; self.n_classes.max(1)];
        for tree in &self.trees {
            let class = tree.predict_one(sample)?;
            votes[class] += 1;
        }
        Ok(votes)
    }

    /// Majority vote over all trees; ties go to the lowest class.
    pub fn predict_one(&self, sample: ArrayView1<f64>) -> Result<usize> {
        Ok(majority(&self.votes(sample)?))
    }

    /// Fraction of trees voting for each class.
    pub fn predict_proba_one(&self, sample: ArrayView1<f64>) -> Result<Vec<f64>> {
        let votes = self.votes(sample)?;
        let n = self.trees.len() as f64;
        Ok(votes.into_iter().map(|v| v as f64 / n).collect())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        x.rows().into_iter().map(|row| self.predict_one(row)).collect()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn clusters() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        (x, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_classifier() {
        let (x, y) = clusters();
        let mut rf = RandomForest::new_classifier(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(&y)
            .filter(|(p, a)| p == a)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy >= 0.8, "Accuracy too low: {}", accuracy);
        assert_eq!(rf.n_trees(), 10);
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = clusters();
        let probe = array![0.55, 0.6];

        let mut a = RandomForest::new_classifier(25).with_random_state(3);
        let mut b = RandomForest::new_classifier(25).with_random_state(3);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(
            a.predict_proba_one(probe.view()).unwrap(),
            b.predict_proba_one(probe.view()).unwrap()
        );
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (x, y) = clusters();
        let mut rf = RandomForest::new_classifier(10);
        rf.fit(&x, &y).unwrap();
        for row in x.rows() {
            let proba = rf.predict_proba_one(row).unwrap();
            assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn unfitted_forest_refuses_to_predict() {
        let rf = RandomForest::new_classifier(10);
        let sample = array![1.0, 2.0];
        assert!(matches!(
            rf.predict_one(sample.view()),
            Err(InsightsError::ModelNotTrained)
        ));
    }
}
