//! Repeated-split training with grid search, aggregation and final fit.

use crate::algorithms::evaluation::CrossValidation;
use crate::algorithms::{Classifier, ModelProvider, ParamGrid, ParamSet};
use crate::data::table::FeatureTable;
use crate::error::MlError;
use crate::features::enhance::enhance;
use crate::features::transforms::TransformMetadata;
use crate::training::metrics::{ClassificationMetrics, MetricSummary};
use crate::training::stats::{TTestResult, confidence_level, paired_t_test};
use crate::training::sweep::grid_search;
use perfcast_core::TrainingConfig;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// What one iteration selected and how it scored on its test partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationResult {
    pub iteration: usize,
    pub seed: u64,
    pub params: ParamSet,
    pub cv_score: Option<f64>,
    pub metrics: ClassificationMetrics,
}

/// Aggregate statistics across iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub accuracy: MetricSummary,
    pub f1_score: MetricSummary,
    pub precision: MetricSummary,
    pub recall: MetricSummary,
    /// Accuracy paired against F1.
    pub t_test_accuracy: TTestResult,
    /// F1 paired against precision.
    pub t_test_f1_score: TTestResult,
    pub confidence_level_accuracy: f64,
    pub confidence_level_f1_score: f64,
    pub selected_params: ParamSet,
}

/// A finished training run: the final model, the transform it was fitted
/// behind, and the evidence for choosing it.
#[derive(Debug, Clone)]
pub struct TrainingOutcome<M> {
    pub model: M,
    pub metadata: TransformMetadata,
    pub iterations: Vec<IterationResult>,
    pub summary: TrainingSummary,
    pub num_samples: usize,
    pub num_features: usize,
    pub num_classes: usize,
    pub test_samples: usize,
    pub test_fraction: f64,
}

/// Runs the repeated-split protocol for any [`ModelProvider`].
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.config.iterations = iterations;
        self
    }

    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.config.test_fraction = test_fraction;
        self
    }

    fn cross_validation(&self, seed: u64) -> CrossValidation {
        CrossValidation {
            n_folds: self.config.cv_folds,
            random_state: Some(seed),
            ..Default::default()
        }
    }

    /// Train `provider` on `table` against the continuous `target`.
    ///
    /// Every iteration draws its own split from `seed + i`, tunes on the
    /// training partition and scores on the test partition. The parameter
    /// set with the best mean accuracy across iterations is refitted on the
    /// base-seed training partition and returned.
    pub fn train<P: ModelProvider>(
        &self,
        provider: &P,
        table: &FeatureTable,
        target: &[f64],
        num_classes: usize,
        grid: &ParamGrid,
    ) -> Result<TrainingOutcome<P::Model>, MlError> {
        let n = self.config.iterations;
        if n == 0 {
            return Err(MlError::invalid_input("iterations must be at least 1"));
        }
        tracing::info!(
            architecture = provider.label(),
            iterations = n,
            rows = table.row_count(),
            parallel = self.config.parallel,
            "Starting training"
        );

        let run = |i: usize| self.run_iteration(provider, table, target, num_classes, grid, i);
        let iterations: Vec<IterationResult> = if self.config.parallel {
            (0..n).into_par_iter().map(run).collect::<Result<_, _>>()?
        } else {
            (0..n).map(run).collect::<Result<_, _>>()?
        };

        let summary = summarize(&iterations);
        tracing::info!(
            accuracy = summary.accuracy.mean,
            f1 = summary.f1_score.mean,
            params = ?summary.selected_params,
            "Selected final hyperparameters"
        );

        let final_split = enhance(
            table,
            target,
            num_classes,
            self.config.test_fraction,
            self.config.seed,
        )?;
        let mut model = provider.instantiate(&summary.selected_params)?;
        model.fit(&final_split.train_x.rows, &final_split.train_y)?;

        Ok(TrainingOutcome {
            model,
            metadata: final_split.metadata,
            iterations,
            summary,
            num_samples: table.row_count(),
            num_features: table.column_count(),
            num_classes,
            test_samples: final_split.test_rows.len(),
            test_fraction: self.config.test_fraction,
        })
    }

    fn run_iteration<P: ModelProvider>(
        &self,
        provider: &P,
        table: &FeatureTable,
        target: &[f64],
        num_classes: usize,
        grid: &ParamGrid,
        iteration: usize,
    ) -> Result<IterationResult, MlError> {
        let seed = self.config.seed.wrapping_add(iteration as u64);
        let data = enhance(table, target, num_classes, self.config.test_fraction, seed)?;

        let search = grid_search(
            provider,
            grid,
            &data.train_x.rows,
            &data.train_y,
            &self.cross_validation(seed),
        )?;
        let mut model = provider.instantiate(&search.best_params)?;
        model.fit(&data.train_x.rows, &data.train_y)?;
        let predicted = model.predict(&data.test_x.rows)?;
        let metrics = ClassificationMetrics::compute(&data.test_y, &predicted);

        tracing::info!(
            iteration,
            seed,
            accuracy = metrics.accuracy,
            f1 = metrics.f1_score,
            "Iteration finished"
        );
        Ok(IterationResult {
            iteration,
            seed,
            params: search.best_params,
            cv_score: search.best_score,
            metrics,
        })
    }
}

fn summarize(iterations: &[IterationResult]) -> TrainingSummary {
    let series = |f: fn(&ClassificationMetrics) -> f64| -> Vec<f64> {
        iterations.iter().map(|r| f(&r.metrics)).collect()
    };
    let accuracy = series(|m| m.accuracy);
    let f1 = series(|m| m.f1_score);
    let precision = series(|m| m.precision);
    let recall = series(|m| m.recall);

    let t_test_accuracy = paired_t_test(&accuracy, &f1);
    let t_test_f1_score = paired_t_test(&f1, &precision);

    TrainingSummary {
        accuracy: MetricSummary::from_values(&accuracy),
        f1_score: MetricSummary::from_values(&f1),
        precision: MetricSummary::from_values(&precision),
        recall: MetricSummary::from_values(&recall),
        confidence_level_accuracy: confidence_level(t_test_accuracy.p_value),
        confidence_level_f1_score: confidence_level(t_test_f1_score.p_value),
        t_test_accuracy,
        t_test_f1_score,
        selected_params: select_params(iterations),
    }
}

/// Group iterations by identical parameter sets and return the set with
/// the highest mean accuracy. Earlier groups win ties.
pub fn select_params(iterations: &[IterationResult]) -> ParamSet {
    // key -> (params, accuracies), in first-seen order
    let mut groups: Vec<(String, &ParamSet, Vec<f64>)> = Vec::new();
    for result in iterations {
        let key = serde_json::to_string(&result.params).unwrap_or_default();
        match groups.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, _, accs)) => accs.push(result.metrics.accuracy),
            None => groups.push((key, &result.params, vec![result.metrics.accuracy])),
        }
    }

    let mut best: Option<(&ParamSet, f64)> = None;
    for (_, params, accs) in &groups {
        let mean = accs.iter().sum::<f64>() / accs.len() as f64;
        if best.is_none_or(|(_, m)| mean > m) {
            best = Some((params, mean));
        }
    }
    best.map(|(p, _)| p.clone()).unwrap_or_default()
}
