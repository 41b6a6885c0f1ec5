//! Error type shared by every stage of the item-item pipeline.
//!
//! Only index and input-shape problems are errors. Sparse-data cases
//! (zero-variance items, users without a rating on a neighbor, items with
//! no qualifying neighbors) are handled by fallback rules and never
//! surface here.

use crate::dataset::{ItemId, UserId};

/// Errors surfaced by neighbor discovery, prediction and persistence.
#[derive(Debug, thiserror::Error)]
pub enum KnnError {
    /// Item id outside the model/dataset dimension.
    #[error("item {item} is out of range (dataset has {items} items)")]
    ItemOutOfRange { item: ItemId, items: usize },

    /// User id outside the model/dataset dimension.
    #[error("user {user} is out of range (dataset has {users} users)")]
    UserOutOfRange { user: UserId, users: usize },

    #[error("rating {rating} for (user {user}, item {item}) is outside the configured bounds")]
    InvalidRating {
        user: UserId,
        item: ItemId,
        rating: f64,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("length mismatch: {predictions} predictions vs {targets} targets")]
    LengthMismatch { predictions: usize, targets: usize },

    /// A persisted model whose per-item tables disagree with each other.
    #[error("corrupt model: {0}")]
    CorruptModel(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenient result alias for the pipeline.
pub type Result<T> = std::result::Result<T, KnnError>;

impl KnnError {
    /// True for the out-of-range family, the only errors a single
    /// prediction request can hit.
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            KnnError::ItemOutOfRange { .. } | KnnError::UserOutOfRange { .. }
        )
    }
}
