//! Rating prediction from a fitted item-item model.
//!
//! prediction = avg(item) + Σ w·dev(neighbor, user) / Σ |w|
//!
//! over the neighbors the user actually rated, clamped to the rating
//! scale. Neighbors the user never rated contribute nothing; with no
//! contributing neighbor the item's average is returned.

use ahash::AHashMap;
use rayon::prelude::*;

use crate::config::KnnConfig;
use crate::dataset::{ItemId, UserId};
use crate::error::{KnnError, Result};
use crate::model::ItemKnnModel;
use crate::neighbors::Neighbor;

/// Predicts `user`'s rating of `item`.
pub fn predict(model: &ItemKnnModel, user: UserId, item: ItemId) -> Result<f64> {
    model.dimensions().check_user(user)?;
    predict_parts(
        user,
        item,
        model.neighbor_lists(),
        model.averages(),
        model.deviation_maps(),
        model.config(),
    )
}

/// Slice-level form for callers holding the three per-item tables
/// separately. The tables must have one entry per item and every
/// neighbor id must index them; otherwise the model is corrupt.
pub fn predict_parts(
    user: UserId,
    item: ItemId,
    neighbors: &[Vec<Neighbor>],
    averages: &[f64],
    deviations: &[AHashMap<UserId, f64>],
    config: &KnnConfig,
) -> Result<f64> {
    let items = averages.len();
    if neighbors.len() != items || deviations.len() != items {
        return Err(KnnError::CorruptModel(format!(
            "per-item tables disagree: {} neighbor lists, {items} averages, {} deviation maps",
            neighbors.len(),
            deviations.len()
        )));
    }
    if item as usize >= items {
        return Err(KnnError::ItemOutOfRange { item, items });
    }

    let average = averages[item as usize];
    let list = &neighbors[item as usize];
    if list.is_empty() {
        return Ok(average);
    }

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for n in list {
        let Some(devs) = deviations.get(n.item as usize) else {
            return Err(KnnError::CorruptModel(format!(
                "item {item} lists neighbor {} outside 0..{items}",
                n.item
            )));
        };
        if let Some(dev) = devs.get(&user) {
            numerator += n.weight * dev;
            denominator += n.weight.abs();
        }
    }

    let raw = if denominator == 0.0 {
        average
    } else {
        average + numerator / denominator
    };
    Ok(config.clamp_rating(raw))
}

/// Predicts every `(user, item)` query in parallel. The first
/// out-of-range query fails the whole batch.
pub fn predict_batch(model: &ItemKnnModel, queries: &[(UserId, ItemId)]) -> Result<Vec<f64>> {
    queries
        .par_iter()
        .map(|&(user, item)| predict(model, user, item))
        .collect()
}
