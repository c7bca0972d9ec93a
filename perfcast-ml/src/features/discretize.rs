//! Continuous score → ordinal class buckets.

use crate::error::MlError;

/// Map scores in `[0, 100]` into `num_classes` equal-width buckets.
///
/// `class = floor(value * num_classes / 100)`, with exactly 100 folded into
/// the last class. Scores outside `[0, 100]` (or NaN) are rejected.
pub fn discretize(values: &[f64], num_classes: usize) -> Result<Vec<usize>, MlError> {
    if num_classes == 0 {
        return Err(MlError::invalid_input("num_classes must be at least 1"));
    }
    values
        .iter()
        .enumerate()
        .map(|(row, &value)| {
            if !(0.0..=100.0).contains(&value) {
                return Err(MlError::invalid_input(format!(
                    "target value {value} at row {row} is outside [0, 100]"
                )));
            }
            let class = (value * num_classes as f64 / 100.0).floor() as usize;
            Ok(class.min(num_classes - 1))
        })
        .collect()
}
