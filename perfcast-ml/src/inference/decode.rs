//! Turn a predicted class index back into a score range.

use crate::error::MlError;
use serde_json::Value;

/// Something a classifier returned that should hold exactly one class index.
pub trait ClassPrediction {
    fn class_index(&self) -> Result<usize, MlError>;
}

impl ClassPrediction for usize {
    fn class_index(&self) -> Result<usize, MlError> {
        Ok(*self)
    }
}

impl ClassPrediction for u32 {
    fn class_index(&self) -> Result<usize, MlError> {
        Ok(*self as usize)
    }
}

impl ClassPrediction for i64 {
    fn class_index(&self) -> Result<usize, MlError> {
        usize::try_from(*self)
            .map_err(|_| MlError::invalid_input(format!("class index {self} is negative")))
    }
}

impl<T: ClassPrediction> ClassPrediction for [T] {
    fn class_index(&self) -> Result<usize, MlError> {
        match self {
            [single] => single.class_index(),
            other => Err(MlError::invalid_input(format!(
                "expected a single prediction, got {} values",
                other.len()
            ))),
        }
    }
}

impl<T: ClassPrediction> ClassPrediction for Vec<T> {
    fn class_index(&self) -> Result<usize, MlError> {
        self.as_slice().class_index()
    }
}

impl<T: ClassPrediction, const N: usize> ClassPrediction for [T; N] {
    fn class_index(&self) -> Result<usize, MlError> {
        self.as_slice().class_index()
    }
}

impl ClassPrediction for Value {
    fn class_index(&self) -> Result<usize, MlError> {
        match self {
            Value::Number(n) => n
                .as_u64()
                .map(|v| v as usize)
                .ok_or_else(|| MlError::invalid_input(format!("{n} is not a class index"))),
            Value::Array(items) => items.as_slice().class_index(),
            other => Err(MlError::invalid_input(format!("{other} is not a class index"))),
        }
    }
}

/// `"{lower} to {upper}"` for class `c` of `n`, with `lower = c * 100 / n`
/// and `upper = (c + 1) * 100 / n`, both rounded to whole numbers.
pub fn decode<P: ClassPrediction + ?Sized>(num_classes: usize, prediction: &P) -> Result<String, MlError> {
    if num_classes == 0 {
        return Err(MlError::invalid_input("number of classes must be at least 1"));
    }
    let class = prediction.class_index()?;
    if class >= num_classes {
        return Err(MlError::invalid_input(format!(
            "class {class} is out of range for {num_classes} classes"
        )));
    }
    let width = 100.0 / num_classes as f64;
    let lower = class as f64 * width;
    let upper = (class + 1) as f64 * width;
    Ok(format!("{lower:.0} to {upper:.0}"))
}
