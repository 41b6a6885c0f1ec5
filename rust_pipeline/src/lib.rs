//! Item-based k-NN collaborative filtering.
//!
//! Two stages, consumed in sequence:
//!   - neighbors: per item, average rating, per-user deviations and the K
//!     most correlated other items (Pearson over co-raters)
//!   - predict: item average plus the |w|-weighted mean of the user's
//!     deviations on those neighbors, clamped to the rating scale
//!
//! The batch neighbor pass and batch prediction run on rayon. Everything
//! operates on an in-memory sparse rating matrix with dense zero-based ids.
//!
//! ```
//! use fast_itemknn::{ItemKnnModel, KnnConfig, RatingMatrix};
//!
//! let config = KnnConfig::new(25, 0);
//! let matrix = RatingMatrix::from_triples(
//!     &[(0, 0, 5.0), (1, 0, 3.0), (0, 1, 4.5), (1, 1, 2.5), (1, 2, 4.0)],
//!     &config,
//! )
//! .unwrap();
//! let model = ItemKnnModel::fit(&matrix, &config).unwrap();
//!
//! let rating = fast_itemknn::predict(&model, 0, 1).unwrap();
//! assert!((0.5..=5.0).contains(&rating));
//! ```
//!
//! Python: build with `maturin develop --release`, then `import fast_itemknn`.

pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod metrics;
pub mod model;
pub mod neighbors;
mod persist;
pub mod predict;
pub mod profile;
pub mod telemetry;
pub mod topk;

#[cfg(feature = "python")]
mod python;

pub use config::KnnConfig;
pub use dataset::{Dimensions, ItemId, RatingMatrix, UserId};
pub use error::{KnnError, Result};
pub use evaluate::{evaluate, Evaluation};
pub use metrics::{mse, rmse};
pub use model::ItemKnnModel;
pub use neighbors::{compute_neighbors, find_all, ItemNeighborhood, Neighbor};
pub use predict::{predict, predict_batch, predict_parts};
pub use profile::ItemProfile;
