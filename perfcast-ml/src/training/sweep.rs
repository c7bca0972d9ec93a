//! Hyperparameter grid search.

use crate::algorithms::evaluation::{CrossValidation, cross_validate};
use crate::algorithms::{ModelProvider, ParamGrid, ParamSet};
use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// A single sweep trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepTrial {
    pub trial_number: usize,
    pub params: ParamSet,
    pub metric: Option<f64>,
}

/// Outcome of a grid search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub best_params: ParamSet,
    pub best_score: Option<f64>,
    pub trials: Vec<SweepTrial>,
}

/// Cartesian product of the grid, in key order then value order.
///
/// An empty grid yields one empty parameter set. A key with no candidate
/// values yields no combinations at all.
pub fn expand_grid(grid: &ParamGrid) -> Vec<ParamSet> {
    let mut configs = vec![ParamSet::new()];
    for (key, values) in grid {
        let mut new_configs = Vec::with_capacity(configs.len() * values.len());
        for config in &configs {
            for value in values {
                let mut c = config.clone();
                c.insert(key.clone(), value.clone());
                new_configs.push(c);
            }
        }
        configs = new_configs;
    }
    configs
}

/// Pick the combination with the best mean held-out accuracy.
///
/// An empty grid selects the empty parameter set without scoring. When the
/// data is too small for two folds the first combination is selected
/// unscored. Ties keep the earliest combination.
pub fn grid_search<P: ModelProvider>(
    provider: &P,
    grid: &ParamGrid,
    x: &[Vec<f64>],
    y: &[usize],
    cv: &CrossValidation,
) -> Result<GridSearchResult, MlError> {
    let combos = expand_grid(grid);
    let Some(first) = combos.first().cloned() else {
        return Err(MlError::invalid_input(
            "hyperparameter grid has a parameter with no candidate values",
        ));
    };

    if grid.is_empty() || cv.n_folds.min(y.len()) < 2 {
        if !grid.is_empty() {
            tracing::warn!(
                samples = y.len(),
                "Too few samples for cross-validation, using first grid combination"
            );
        }
        return Ok(GridSearchResult {
            best_params: first,
            best_score: None,
            trials: Vec::new(),
        });
    }

    let mut trials = Vec::with_capacity(combos.len());
    let mut best: Option<(usize, f64)> = None;
    for (trial_number, params) in combos.into_iter().enumerate() {
        let score = cross_validate(provider, &params, x, y, cv)?.mean_score;
        tracing::debug!(trial = trial_number, score, params = ?params, "Grid trial scored");
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((trial_number, score));
        }
        trials.push(SweepTrial {
            trial_number,
            params,
            metric: Some(score),
        });
    }

    let (best_idx, best_score) = best.unwrap_or((0, 0.0));
    Ok(GridSearchResult {
        best_params: trials[best_idx].params.clone(),
        best_score: Some(best_score),
        trials,
    })
}
