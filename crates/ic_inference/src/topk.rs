use ic_core::{Error, Prediction, Result};
use ndarray::ArrayD;

use crate::labels::label_for;

/// Rank the scores of a single-image output, highest first.
///
/// Ties keep class index order. NaN scores are dropped.
pub fn top_k(output: &ArrayD<f32>, class_names: &[String], k: usize) -> Result<Vec<Prediction>> {
    if output.ndim() > 1 && output.shape()[0] != 1 {
        return Err(Error::Inference(format!(
            "expected a batch of one, got output shape {:?}",
            output.shape()
        )));
    }
    if output.is_empty() {
        return Err(Error::Inference("model returned an empty tensor".to_string()));
    }
    if !class_names.is_empty() && class_names.len() != output.len() {
        tracing::warn!(
            "Model has {} outputs but {} class names",
            output.len(),
            class_names.len()
        );
    }

    let mut ranked: Vec<(usize, f32)> = output
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| !score.is_nan())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);

    Ok(ranked
        .into_iter()
        .map(|(index, confidence)| Prediction {
            label: label_for(class_names, index),
            confidence,
        })
        .collect())
}
