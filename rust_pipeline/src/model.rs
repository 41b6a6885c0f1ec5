//! The fitted item-item model: per-item neighbor lists, averages and
//! deviation maps, plus the dimensions and config they were built with.
//!
//! Built once by [`ItemKnnModel::fit`] and read-only afterwards. Loading a
//! saved model is an explicit step returning an owned value, so several
//! models can coexist in one process.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::config::KnnConfig;
use crate::dataset::{Dimensions, ItemId, RatingMatrix, UserId};
use crate::error::{KnnError, Result};
use crate::neighbors::{self, Neighbor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemKnnModel {
    neighbors: Vec<Vec<Neighbor>>,
    averages: Vec<f64>,
    deviations: Vec<AHashMap<UserId, f64>>,
    dimensions: Dimensions,
    config: KnnConfig,
}

impl ItemKnnModel {
    /// Runs the neighbor search over every item of `matrix`.
    pub fn fit(matrix: &RatingMatrix, config: &KnnConfig) -> Result<Self> {
        neighbors::find_all(matrix, config)
    }

    /// Assembles a model from its per-item tables, checking that they agree.
    pub fn from_parts(
        neighbors: Vec<Vec<Neighbor>>,
        averages: Vec<f64>,
        deviations: Vec<AHashMap<UserId, f64>>,
        dimensions: Dimensions,
        config: KnnConfig,
    ) -> Result<Self> {
        let model = Self {
            neighbors,
            averages,
            deviations,
            dimensions,
            config,
        };
        model.check_consistency()?;
        Ok(model)
    }

    pub(crate) fn check_consistency(&self) -> Result<()> {
        self.config.validate()?;
        let items = self.dimensions.items;
        if self.neighbors.len() != items
            || self.averages.len() != items
            || self.deviations.len() != items
        {
            return Err(KnnError::CorruptModel(format!(
                "expected {items} items, found {} neighbor lists, {} averages, {} deviation maps",
                self.neighbors.len(),
                self.averages.len(),
                self.deviations.len()
            )));
        }
        for (item, list) in self.neighbors.iter().enumerate() {
            if list.len() > self.config.k {
                return Err(KnnError::CorruptModel(format!(
                    "item {item} has {} neighbors, more than k = {}",
                    list.len(),
                    self.config.k
                )));
            }
            if let Some(bad) = list.iter().find(|n| n.item as usize >= items) {
                return Err(KnnError::CorruptModel(format!(
                    "item {item} lists neighbor {} outside 0..{items}",
                    bad.item
                )));
            }
        }
        if let Some((item, user)) = self.deviations.iter().enumerate().find_map(|(item, devs)| {
            devs.keys()
                .find(|&&user| user as usize >= self.dimensions.users)
                .map(|&user| (item, user))
        }) {
            return Err(KnnError::CorruptModel(format!(
                "item {item} has a deviation for user {user} outside 0..{}",
                self.dimensions.users
            )));
        }
        Ok(())
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn config(&self) -> &KnnConfig {
        &self.config
    }

    pub fn item_count(&self) -> usize {
        self.dimensions.items
    }

    pub fn user_count(&self) -> usize {
        self.dimensions.users
    }

    /// Neighbor list of `item`, strongest first.
    pub fn neighbors(&self, item: ItemId) -> Result<&[Neighbor]> {
        self.dimensions.check_item(item)?;
        Ok(&self.neighbors[item as usize])
    }

    pub fn average(&self, item: ItemId) -> Result<f64> {
        self.dimensions.check_item(item)?;
        Ok(self.averages[item as usize])
    }

    pub fn deviations(&self, item: ItemId) -> Result<&AHashMap<UserId, f64>> {
        self.dimensions.check_item(item)?;
        Ok(&self.deviations[item as usize])
    }

    pub fn neighbor_lists(&self) -> &[Vec<Neighbor>] {
        &self.neighbors
    }

    pub fn averages(&self) -> &[f64] {
        &self.averages
    }

    pub fn deviation_maps(&self) -> &[AHashMap<UserId, f64>] {
        &self.deviations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> ItemKnnModel {
        let matrix = RatingMatrix::from_triples(
            &[(0, 0, 5.0), (1, 0, 3.0), (0, 1, 4.0), (1, 1, 2.0)],
            &KnnConfig::default(),
        )
        .unwrap();
        ItemKnnModel::fit(&matrix, &KnnConfig::new(5, 0)).unwrap()
    }

    #[test]
    fn fit_fills_every_item() {
        let model = tiny();
        assert_eq!(model.item_count(), 2);
        assert_eq!(model.average(0).unwrap(), 4.0);
        assert_eq!(model.average(1).unwrap(), 3.0);
        assert_eq!(model.neighbors(0).unwrap()[0].item, 1);
        assert_eq!(model.deviations(1).unwrap().get(&1), Some(&-1.0));
        assert!(model.average(2).is_err());
    }

    #[test]
    fn from_parts_rejects_mismatched_tables() {
        let model = tiny();
        let err = ItemKnnModel::from_parts(
            model.neighbor_lists().to_vec(),
            vec![4.0],
            model.deviation_maps().to_vec(),
            model.dimensions(),
            model.config().clone(),
        )
        .unwrap_err();
        assert!(matches!(err, KnnError::CorruptModel(_)));
    }

    #[test]
    fn from_parts_rejects_dangling_neighbor() {
        let model = tiny();
        let mut lists = model.neighbor_lists().to_vec();
        lists[0] = vec![Neighbor {
            weight: 0.5,
            item: 7,
        }];
        let err = ItemKnnModel::from_parts(
            lists,
            model.averages().to_vec(),
            model.deviation_maps().to_vec(),
            model.dimensions(),
            model.config().clone(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("neighbor 7"));
    }
}
