//! Dataset enhancement: discretize the target, split once, fit the
//! transform on the training partition and encode both partitions.

use crate::data::table::{FeatureMatrix, FeatureTable};
use crate::error::MlError;
use crate::features::discretize::discretize;
use crate::features::transforms::TransformMetadata;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Output of [`enhance`].
#[derive(Debug, Clone)]
pub struct EnhancedDataset {
    pub train_x: FeatureMatrix,
    pub test_x: FeatureMatrix,
    pub train_y: Vec<usize>,
    pub test_y: Vec<usize>,
    /// Source-table row of each training row, in frame order.
    pub train_rows: Vec<usize>,
    /// Source-table row of each test row, in frame order.
    pub test_rows: Vec<usize>,
    pub metadata: TransformMetadata,
}

/// Shuffle `0..n` with `seed` and cut it into `(train, test)`.
///
/// The test partition takes `ceil(test_fraction * n)` rows; both partitions
/// must end up non-empty.
pub fn split_indices(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), MlError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(MlError::invalid_input(format!(
            "test fraction must lie in (0, 1), got {test_fraction}"
        )));
    }
    // the epsilon absorbs products like 0.3 * 10 = 3.0000000000000004
    let n_test = (test_fraction * n as f64 - 1e-9).ceil().max(0.0) as usize;
    if n_test == 0 || n_test >= n {
        return Err(MlError::invalid_input(format!(
            "cannot split {n} rows with test fraction {test_fraction} into two non-empty partitions"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let train = order.split_off(n_test);
    Ok((train, order))
}

/// Discretize `target`, split the rows and apply a transform fitted on the
/// training partition to both partitions.
pub fn enhance(
    table: &FeatureTable,
    target: &[f64],
    num_classes: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<EnhancedDataset, MlError> {
    if table.row_count() == 0 {
        return Err(MlError::invalid_input("feature table has no rows"));
    }
    if table.column_count() == 0 {
        return Err(MlError::invalid_input("feature table has no columns"));
    }
    if table.row_count() != target.len() {
        return Err(MlError::invalid_input(format!(
            "feature table has {} rows but target has {} values",
            table.row_count(),
            target.len()
        )));
    }

    let labels = discretize(target, num_classes)?;
    let (train_rows, test_rows) = split_indices(table.row_count(), test_fraction, seed)?;
    let metadata = TransformMetadata::fit(table, &train_rows)?;

    let train_x = metadata.transform(table, &train_rows);
    let test_x = metadata.transform(table, &test_rows);
    let train_y = train_rows.iter().map(|&i| labels[i]).collect();
    let test_y = test_rows.iter().map(|&i| labels[i]).collect();

    tracing::debug!(
        seed,
        train = train_rows.len(),
        test = test_rows.len(),
        features = metadata.feature_count(),
        "Enhanced dataset"
    );

    Ok(EnhancedDataset {
        train_x,
        test_x,
        train_y,
        test_y,
        train_rows,
        test_rows,
        metadata,
    })
}
