//! Item neighbor discovery.
//!
//! For every item: mean-center its ratings, then correlate it against
//! every other item over their common raters and keep the K strongest
//! correlations. The correlation is the cosine of the two deviation
//! vectors restricted to co-raters, i.e. Pearson on mean-centered ratings.
//!
//! The batch pass ([`find_all`]) is embarrassingly parallel: every item
//! reads the shared immutable profiles and writes only its own slot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::KnnConfig;
use crate::dataset::{ItemId, RatingMatrix};
use crate::error::{KnnError, Result};
use crate::model::ItemKnnModel;
use crate::profile::ItemProfile;
use crate::topk::TopK;

/// One entry of an item's neighbor list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Correlation in [-1, 1].
    pub weight: f64,
    pub item: ItemId,
}

/// Everything neighbor discovery produces for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemNeighborhood {
    pub profile: ItemProfile,
    /// At most K entries, strongest first.
    pub neighbors: Vec<Neighbor>,
}

/// Correlation between two item profiles over their common raters.
///
/// `None` when they share `min_common` or fewer raters, or when either
/// profile has zero deviation magnitude.
pub fn correlate(a: &ItemProfile, b: &ItemProfile, min_common: usize) -> Option<f64> {
    let (small, large) = if a.rater_count() <= b.rater_count() {
        (a, b)
    } else {
        (b, a)
    };
    if small.rater_count() <= min_common {
        return None;
    }

    // Ascending user order: the sum is identical for (a, b) and (b, a).
    let mut common = 0usize;
    let mut numerator = 0.0;
    for &(user, dev) in &small.ordered {
        if let Some(other) = large.deviation(user) {
            common += 1;
            numerator += dev * other;
        }
    }
    if common <= min_common {
        return None;
    }
    if a.is_degenerate() || b.is_degenerate() {
        return None;
    }
    Some(numerator / (a.sigma * b.sigma))
}

/// Number of users who rated both items.
fn common_raters(matrix: &RatingMatrix, item: ItemId, candidate: ItemId) -> Result<usize> {
    Ok(matrix
        .raters(candidate)?
        .iter()
        .filter(|&&user| matrix.has_rated(user, item))
        .count())
}

/// Average, deviation map and top-K neighbor list for a single item.
///
/// Candidate profiles are derived on the fly; use [`find_all`] for the
/// whole catalogue, which computes each profile once.
pub fn compute_neighbors(
    item: ItemId,
    matrix: &RatingMatrix,
    config: &KnnConfig,
) -> Result<ItemNeighborhood> {
    config.validate()?;
    let fallback = matrix.global_mean();
    let profile = ItemProfile::compute(matrix, item, fallback)?;

    let mut top = TopK::new(config.k);
    for candidate in 0..matrix.item_count() as ItemId {
        if candidate == item {
            continue;
        }
        if common_raters(matrix, item, candidate)? <= config.min_common {
            continue;
        }
        let other = ItemProfile::compute(matrix, candidate, fallback)?;
        match correlate(&profile, &other, config.min_common) {
            Some(weight) => {
                top.push(weight, candidate);
            }
            None => trace!(item, candidate, "degenerate pair skipped"),
        }
    }

    Ok(ItemNeighborhood {
        profile,
        neighbors: into_neighbors(top),
    })
}

/// Runs neighbor discovery for every item in `0..matrix.item_count()`.
///
/// Uses a dedicated rayon pool when `config.threads` is set, the global
/// pool otherwise.
pub fn find_all(matrix: &RatingMatrix, config: &KnnConfig) -> Result<ItemKnnModel> {
    config.validate()?;
    match config.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|err| KnnError::InvalidConfig(format!("thread pool: {err}")))?;
            pool.install(|| find_all_inner(matrix, config))
        }
        None => find_all_inner(matrix, config),
    }
}

fn find_all_inner(matrix: &RatingMatrix, config: &KnnConfig) -> Result<ItemKnnModel> {
    let started = Instant::now();
    let items = matrix.item_count();
    let fallback = matrix.global_mean();
    info!(
        items,
        users = matrix.user_count(),
        ratings = matrix.len(),
        k = config.k,
        min_common = config.min_common,
        "neighbor search started"
    );

    let profiles = (0..items as ItemId)
        .into_par_iter()
        .map(|item| ItemProfile::compute(matrix, item, fallback))
        .collect::<Result<Vec<_>>>()?;

    let done = AtomicUsize::new(0);
    let neighbors: Vec<Vec<Neighbor>> = (0..items)
        .into_par_iter()
        .map(|item| {
            let list = scan(item, &profiles, config);
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if config.progress_every > 0 && finished % config.progress_every == 0 {
                info!(finished, items, "neighbor search progress");
            }
            list
        })
        .collect();

    let empty = neighbors.iter().filter(|list| list.is_empty()).count();
    info!(
        items,
        without_neighbors = empty,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "neighbor search finished"
    );

    let (averages, deviations): (Vec<f64>, Vec<_>) = profiles
        .into_iter()
        .map(|p| (p.average, p.deviations))
        .unzip();
    ItemKnnModel::from_parts(
        neighbors,
        averages,
        deviations,
        matrix.dimensions(),
        config.clone(),
    )
}

fn scan(item: usize, profiles: &[ItemProfile], config: &KnnConfig) -> Vec<Neighbor> {
    let profile = &profiles[item];
    if profile.rater_count() <= config.min_common || profile.is_degenerate() {
        debug!(item, raters = profile.rater_count(), "item cannot have neighbors");
        return Vec::new();
    }

    let mut top = TopK::new(config.k);
    for (candidate, other) in profiles.iter().enumerate() {
        if candidate == item {
            continue;
        }
        if let Some(weight) = correlate(profile, other, config.min_common) {
            top.push(weight, candidate as ItemId);
        }
    }
    into_neighbors(top)
}

fn into_neighbors(top: TopK<ItemId>) -> Vec<Neighbor> {
    top.into_sorted_vec()
        .into_iter()
        .map(|(weight, item)| Neighbor { weight, item })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn matrix(triples: &[(u32, u32, f64)]) -> RatingMatrix {
        RatingMatrix::from_triples(triples, &KnnConfig::default()).unwrap()
    }

    /// Four users, four items with varied co-rating patterns.
    fn small_catalogue() -> RatingMatrix {
        matrix(&[
            (0, 0, 5.0),
            (1, 0, 3.0),
            (2, 0, 4.0),
            (3, 0, 1.0),
            (0, 1, 4.5),
            (1, 1, 2.5),
            (2, 1, 4.0),
            (3, 1, 1.5),
            (0, 2, 1.0),
            (1, 2, 4.0),
            (2, 2, 2.0),
            (3, 2, 5.0),
            (0, 3, 3.0),
            (1, 3, 3.0),
            (2, 3, 3.5),
        ])
    }

    #[test]
    fn zero_sigma_pair_is_skipped() {
        let m = matrix(&[(0, 0, 5.0), (1, 0, 3.0), (0, 1, 4.0), (1, 1, 4.0)]);
        let hood = compute_neighbors(0, &m, &KnnConfig::new(25, 0)).unwrap();

        assert_relative_eq!(hood.profile.average, 4.0);
        assert_relative_eq!(hood.profile.deviation(0).unwrap(), 1.0);
        assert_relative_eq!(hood.profile.deviation(1).unwrap(), -1.0);
        assert_relative_eq!(hood.profile.sigma, 2f64.sqrt());
        assert!(hood.neighbors.is_empty());
    }

    #[test]
    fn correlated_items_find_each_other() {
        let m = small_catalogue();
        let hood = compute_neighbors(0, &m, &KnnConfig::new(25, 2)).unwrap();

        let ids: Vec<ItemId> = hood.neighbors.iter().map(|n| n.item).collect();
        assert_eq!(ids[0], 1);
        assert!(ids.contains(&2));
        let anti = hood.neighbors.iter().find(|n| n.item == 2).unwrap();
        assert!(anti.weight < 0.0);
        for pair in hood.neighbors.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }
    }

    #[test]
    fn min_common_is_strict() {
        let m = small_catalogue();
        // Items 0 and 3 share exactly three raters.
        let a = ItemProfile::compute(&m, 0, 0.0).unwrap();
        let b = ItemProfile::compute(&m, 3, 0.0).unwrap();
        assert!(correlate(&a, &b, 2).is_some());
        assert!(correlate(&a, &b, 3).is_none());
    }

    #[test]
    fn k_caps_the_list() {
        let m = small_catalogue();
        let hood = compute_neighbors(0, &m, &KnnConfig::new(1, 0)).unwrap();
        assert_eq!(hood.neighbors.len(), 1);
        assert_eq!(hood.neighbors[0].item, 1);
    }

    #[test]
    fn out_of_range_item_is_an_error() {
        let m = small_catalogue();
        let err = compute_neighbors(9, &m, &KnnConfig::default()).unwrap_err();
        assert!(matches!(err, KnnError::ItemOutOfRange { item: 9, items: 4 }));
        assert!(compute_neighbors(0, &m, &KnnConfig::new(0, 0)).is_err());
    }

    #[test]
    fn batch_matches_single_item() {
        let m = small_catalogue();
        let cfg = KnnConfig::new(2, 1);
        let model = find_all(&m, &cfg).unwrap();

        for item in 0..m.item_count() as ItemId {
            let hood = compute_neighbors(item, &m, &cfg).unwrap();
            let batch = model.neighbors(item).unwrap();
            assert_eq!(batch.len(), hood.neighbors.len());
            assert_eq!(batch, hood.neighbors.as_slice());
            assert_eq!(model.average(item).unwrap(), hood.profile.average);
        }
    }

    /// Item 0 has 40 raters; items 1 and 2 carry the same ratings, with
    /// item 2's rows inserted in reverse order.
    fn twin_triples() -> Vec<(u32, u32, f64)> {
        let mut triples = Vec::new();
        for user in 0..40u32 {
            triples.push((user, 0, 0.5 + ((user * 7) % 10) as f64 * 0.5));
        }
        let twin: Vec<(u32, f64)> = (0..40u32)
            .map(|user| (user, 0.5 + ((user * 3 + 1) % 10) as f64 * 0.5))
            .collect();
        for &(user, rating) in &twin {
            triples.push((user, 1, rating));
        }
        for &(user, rating) in twin.iter().rev() {
            triples.push((user, 2, rating));
        }
        triples
    }

    fn twin_candidates() -> RatingMatrix {
        matrix(&twin_triples())
    }

    #[test]
    fn identical_candidates_tie_exactly_and_keep_lower_id() {
        let m = twin_candidates();

        let both = compute_neighbors(0, &m, &KnnConfig::new(2, 5)).unwrap();
        assert_eq!(both.neighbors.len(), 2);
        assert_eq!(both.neighbors[0].weight, both.neighbors[1].weight);

        for _ in 0..20 {
            let single = compute_neighbors(0, &m, &KnnConfig::new(1, 5)).unwrap();
            assert_eq!(single.neighbors[0].item, 1);
            let model = find_all(&m, &KnnConfig::new(1, 5)).unwrap();
            assert_eq!(model.neighbors(0).unwrap()[0].item, 1);
        }
    }

    #[test]
    fn refitting_gives_an_identical_model() {
        let m = twin_candidates();
        let cfg = KnnConfig::new(2, 5);
        let first = find_all(&m, &cfg).unwrap();
        for _ in 0..10 {
            assert_eq!(find_all(&m, &cfg).unwrap(), first);
        }

        let mut shuffled = twin_triples();
        shuffled.reverse();
        let rebuilt = matrix(&shuffled);
        assert_eq!(find_all(&rebuilt, &cfg).unwrap(), first);
    }

    #[test]
    fn dedicated_pool_gives_same_result() {
        let m = small_catalogue();
        let global = find_all(&m, &KnnConfig::new(3, 1)).unwrap();
        let pooled = find_all(
            &m,
            &KnnConfig {
                threads: Some(2),
                ..KnnConfig::new(3, 1)
            },
        )
        .unwrap();
        for item in 0..4 {
            let a = global.neighbors(item).unwrap();
            let b = pooled.neighbors(item).unwrap();
            assert_eq!(
                a.iter().map(|n| n.item).collect::<Vec<_>>(),
                b.iter().map(|n| n.item).collect::<Vec<_>>()
            );
        }
    }

    fn ratings_strategy() -> impl Strategy<Value = Vec<(u32, u32, f64)>> {
        prop::collection::vec((0u32..12, 0u32..8, 1u32..=10), 1..80).prop_map(|rows| {
            rows.into_iter()
                .map(|(u, i, half_stars)| (u, i, half_stars as f64 * 0.5))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn weights_bounded_and_lists_capped(triples in ratings_strategy(), k in 1usize..5) {
            let m = matrix(&triples);
            let model = find_all(&m, &KnnConfig::new(k, 0)).unwrap();
            for item in 0..m.item_count() as ItemId {
                let list = model.neighbors(item).unwrap();
                prop_assert!(list.len() <= k);
                for n in list {
                    prop_assert!(n.item != item);
                    prop_assert!(n.weight >= -1.0 - 1e-9 && n.weight <= 1.0 + 1e-9);
                }
            }
        }

        #[test]
        fn numerator_is_symmetric(triples in ratings_strategy()) {
            let m = matrix(&triples);
            let profiles: Vec<ItemProfile> = (0..m.item_count() as ItemId)
                .map(|i| ItemProfile::compute(&m, i, 0.0).unwrap())
                .collect();
            for a in &profiles {
                for b in &profiles {
                    let ab = correlate(a, b, 0);
                    let ba = correlate(b, a, 0);
                    match (ab, ba) {
                        (Some(x), Some(y)) => prop_assert_eq!(x, y),
                        (None, None) => {}
                        _ => prop_assert!(false, "asymmetric skip"),
                    }
                }
            }
        }
    }
}
