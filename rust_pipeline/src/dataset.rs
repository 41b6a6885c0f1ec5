//! In-memory sparse rating matrix.
//!
//! Holds the three structures neighbor discovery reads:
//!   - ratings: (user, item) → rating
//!   - item index: item → users who rated it (dense over item ids, sparse lists)
//!   - user index: user → items rated (membership tests)
//!
//! Memory is proportional to the number of ratings, never users × items.

use ahash::{AHashMap, AHashSet};

use crate::config::KnnConfig;
use crate::error::{KnnError, Result};

pub type UserId = u32;
pub type ItemId = u32;

/// Dense id ranges: valid ids are `0..users` and `0..items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub users: usize,
    pub items: usize,
}

impl Dimensions {
    /// Smallest dimensions covering every id in `triples` (max id + 1).
    pub fn covering(triples: &[(UserId, ItemId, f64)]) -> Self {
        triples
            .iter()
            .fold(Dimensions::default(), |dims, &(user, item, _)| Dimensions {
                users: dims.users.max(user as usize + 1),
                items: dims.items.max(item as usize + 1),
            })
    }

    #[inline]
    pub fn check_user(&self, user: UserId) -> Result<()> {
        if (user as usize) < self.users {
            Ok(())
        } else {
            Err(KnnError::UserOutOfRange {
                user,
                users: self.users,
            })
        }
    }

    #[inline]
    pub fn check_item(&self, item: ItemId) -> Result<()> {
        if (item as usize) < self.items {
            Ok(())
        } else {
            Err(KnnError::ItemOutOfRange {
                item,
                items: self.items,
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct RatingMatrix {
    ratings: AHashMap<(UserId, ItemId), f64>,
    users_by_item: Vec<Vec<UserId>>,
    items_by_user: Vec<AHashSet<ItemId>>,
    dims: Dimensions,
}

impl RatingMatrix {
    /// Builds the matrix from `(user, item, rating)` triples with
    /// dimensions derived from the largest ids seen.
    ///
    /// Ratings outside `[config.rating_min, config.rating_max]` are rejected.
    /// A repeated `(user, item)` pair keeps its last rating.
    pub fn from_triples(triples: &[(UserId, ItemId, f64)], config: &KnnConfig) -> Result<Self> {
        Self::with_dimensions(triples, Dimensions::covering(triples), config)
    }

    /// Like [`RatingMatrix::from_triples`] but with caller-chosen
    /// dimensions, e.g. wide enough to also cover a held-out set.
    pub fn with_dimensions(
        triples: &[(UserId, ItemId, f64)],
        dims: Dimensions,
        config: &KnnConfig,
    ) -> Result<Self> {
        let mut ratings = AHashMap::with_capacity(triples.len());
        let mut users_by_item = vec![Vec::new(); dims.items];
        let mut items_by_user = vec![AHashSet::new(); dims.users];

        for &(user, item, rating) in triples {
            dims.check_user(user)?;
            dims.check_item(item)?;
            if !config.accepts_rating(rating) {
                return Err(KnnError::InvalidRating { user, item, rating });
            }
            if ratings.insert((user, item), rating).is_none() {
                users_by_item[item as usize].push(user);
                items_by_user[user as usize].insert(item);
            }
        }

        tracing::debug!(
            users = dims.users,
            items = dims.items,
            ratings = ratings.len(),
            "rating matrix built"
        );

        Ok(Self {
            ratings,
            users_by_item,
            items_by_user,
            dims,
        })
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn item_count(&self) -> usize {
        self.dims.items
    }

    pub fn user_count(&self) -> usize {
        self.dims.users
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn rating(&self, user: UserId, item: ItemId) -> Option<f64> {
        self.ratings.get(&(user, item)).copied()
    }

    /// Users who rated `item`, in insertion order.
    pub fn raters(&self, item: ItemId) -> Result<&[UserId]> {
        self.dims.check_item(item)?;
        Ok(&self.users_by_item[item as usize])
    }

    pub fn has_rated(&self, user: UserId, item: ItemId) -> bool {
        self.items_by_user
            .get(user as usize)
            .is_some_and(|items| items.contains(&item))
    }

    /// Mean of all ratings; the fallback average for items nobody rated.
    pub fn global_mean(&self) -> f64 {
        if self.ratings.is_empty() {
            return 0.0;
        }
        // Walk the item index rather than the hash map so the sum is reproducible.
        let total: f64 = self
            .users_by_item
            .iter()
            .enumerate()
            .flat_map(|(item, users)| {
                users
                    .iter()
                    .filter_map(move |&user| self.rating(user, item as ItemId))
            })
            .sum();
        total / self.ratings.len() as f64
    }
}
