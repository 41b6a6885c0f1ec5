//! Scores a fitted model against a set of known ratings (the training set
//! or a held-out split).

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::dataset::{ItemId, UserId};
use crate::error::Result;
use crate::metrics;
use crate::model::ItemKnnModel;
use crate::predict::predict;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub predictions: Vec<f64>,
    pub targets: Vec<f64>,
    pub mse: f64,
}

impl Evaluation {
    pub fn rmse(&self) -> f64 {
        self.mse.sqrt()
    }
}

/// Predicts every `(user, item, target)` row and reports the MSE.
///
/// Rows keep their input order. Any out-of-range id aborts the run.
pub fn evaluate(
    model: &ItemKnnModel,
    label: &str,
    ratings: &[(UserId, ItemId, f64)],
) -> Result<Evaluation> {
    let predictions = ratings
        .par_iter()
        .map(|&(user, item, _)| predict(model, user, item))
        .collect::<Result<Vec<_>>>()?;
    let targets: Vec<f64> = ratings.iter().map(|&(_, _, r)| r).collect();
    let mse = metrics::mse(&predictions, &targets)?;

    info!(set = label, rows = ratings.len(), mse, "evaluation finished");
    Ok(Evaluation {
        predictions,
        targets,
        mse,
    })
}
