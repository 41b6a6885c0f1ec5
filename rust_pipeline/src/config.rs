//! Neighbor-search and prediction parameters.
//!
//! Defaults follow the item-item pipeline this crate accelerates:
//! 25 neighbors per item, more than 5 co-raters required, ratings on the
//! 0.5..=5.0 star scale. Every field can be overridden from a JSON
//! document (missing fields keep their defaults) or from
//! `FAST_ITEMKNN_*` environment variables.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KnnError, Result};

const ENV_PREFIX: &str = "FAST_ITEMKNN_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    /// Maximum neighbors kept per item.
    pub k: usize,
    /// Two items are related only if they share strictly more co-raters.
    pub min_common: usize,
    /// Lower clamp for predictions and lower bound for accepted ratings.
    pub rating_min: f64,
    /// Upper clamp for predictions and upper bound for accepted ratings.
    pub rating_max: f64,
    /// Log batch progress every this many items (0 disables).
    pub progress_every: usize,
    /// Dedicated rayon pool size for the batch pass; `None` uses the global pool.
    pub threads: Option<usize>,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            k: 25,
            min_common: 5,
            rating_min: 0.5,
            rating_max: 5.0,
            progress_every: 100,
            threads: None,
        }
    }
}

impl KnnConfig {
    pub fn new(k: usize, min_common: usize) -> Self {
        Self {
            k,
            min_common,
            ..Self::default()
        }
    }

    /// Defaults overridden by any `FAST_ITEMKNN_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Parses a (possibly partial) JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(k) = env_value("K")? {
            self.k = k;
        }
        if let Some(min_common) = env_value("MIN_COMMON")? {
            self.min_common = min_common;
        }
        if let Some(rating_min) = env_value("RATING_MIN")? {
            self.rating_min = rating_min;
        }
        if let Some(rating_max) = env_value("RATING_MAX")? {
            self.rating_max = rating_max;
        }
        if let Some(progress_every) = env_value("PROGRESS_EVERY")? {
            self.progress_every = progress_every;
        }
        if let Some(threads) = env_value("THREADS")? {
            self.threads = Some(threads);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(KnnError::InvalidConfig("k must be at least 1".into()));
        }
        if !self.rating_min.is_finite() || !self.rating_max.is_finite() {
            return Err(KnnError::InvalidConfig(
                "rating bounds must be finite".into(),
            ));
        }
        if self.rating_min >= self.rating_max {
            return Err(KnnError::InvalidConfig(format!(
                "rating_min ({}) must be below rating_max ({})",
                self.rating_min, self.rating_max
            )));
        }
        if self.threads == Some(0) {
            return Err(KnnError::InvalidConfig(
                "threads must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn clamp_rating(&self, value: f64) -> f64 {
        value.clamp(self.rating_min, self.rating_max)
    }

    #[inline]
    pub fn accepts_rating(&self, rating: f64) -> bool {
        rating.is_finite() && rating >= self.rating_min && rating <= self.rating_max
    }
}

fn env_value<T: FromStr>(name: &str) -> Result<Option<T>> {
    let key = format!("{ENV_PREFIX}{name}");
    match std::env::var(&key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| KnnError::InvalidConfig(format!("{key}={raw} cannot be parsed"))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(KnnError::InvalidConfig(format!("{key}: {err}"))),
    }
}
