//! Per-item rating profile: mean, mean-centered deviations and their norm.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::dataset::{ItemId, RatingMatrix, UserId};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProfile {
    pub average: f64,
    /// rating − average, keyed only by users who rated the item.
    pub deviations: AHashMap<UserId, f64>,
    /// The same deviations sorted by user id; every sum over raters walks
    /// this so results do not depend on hash or insertion order.
    pub ordered: Vec<(UserId, f64)>,
    /// Euclidean norm of the deviation values.
    pub sigma: f64,
}

impl ItemProfile {
    /// Profile of `item` over its raters. Items nobody rated get
    /// `fallback_average`, no deviations and a zero sigma.
    pub fn compute(matrix: &RatingMatrix, item: ItemId, fallback_average: f64) -> Result<Self> {
        let raters = matrix.raters(item)?;
        if raters.is_empty() {
            return Ok(Self {
                average: fallback_average,
                deviations: AHashMap::new(),
                ordered: Vec::new(),
                sigma: 0.0,
            });
        }

        let mut ratings: Vec<(UserId, f64)> = raters
            .iter()
            .filter_map(|&user| matrix.rating(user, item).map(|r| (user, r)))
            .collect();
        ratings.sort_unstable_by_key(|&(user, _)| user);
        let average = crate::metrics::mean(ratings.iter().map(|&(_, r)| r));

        let ordered: Vec<(UserId, f64)> = ratings
            .into_iter()
            .map(|(user, rating)| (user, rating - average))
            .collect();
        let sigma = ordered.iter().map(|&(_, d)| d * d).sum::<f64>().sqrt();

        Ok(Self {
            average,
            deviations: ordered.iter().copied().collect(),
            ordered,
            sigma,
        })
    }

    pub fn rater_count(&self) -> usize {
        self.deviations.len()
    }

    /// Correlation is undefined against a zero-variance item.
    pub fn is_degenerate(&self) -> bool {
        self.sigma == 0.0
    }

    #[inline]
    pub fn deviation(&self, user: UserId) -> Option<f64> {
        self.deviations.get(&user).copied()
    }
}
