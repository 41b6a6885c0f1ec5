//! Python bindings (`fast_itemknn` module).
//!
//! Build: `maturin develop --release` (enables the `python` feature).
//!
//! Python usage:
//!   model = ItemKnn(k=25, min_common=5)
//!   model.fit(train_triples)                 # [(user, item, rating), ...]
//!   model.predict(user_id=42, item_id=120)
//!   report = model.evaluate(test_triples)    # (predictions, targets, mse)
//!   model.evaluate(test_triples, report_path="test_eval.json")
//!   model.save("item_item_model.json")
//!   model = ItemKnn.load("item_item_model.json")

use std::collections::HashMap;

use pyo3::exceptions::{PyIOError, PyIndexError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::KnnConfig;
use crate::dataset::{Dimensions, ItemId, RatingMatrix, UserId};
use crate::error::KnnError;
use crate::evaluate::evaluate;
use crate::metrics;
use crate::model::ItemKnnModel;
use crate::predict::{predict, predict_batch};

fn knn_err_to_py(err: KnnError) -> PyErr {
    if err.is_out_of_range() {
        return PyIndexError::new_err(err.to_string());
    }
    match err {
        KnnError::Io(_) => PyIOError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

/// Item-item collaborative filtering model.
#[pyclass(name = "ItemKnn")]
pub struct PyItemKnn {
    config: KnnConfig,
    model: Option<ItemKnnModel>,
}

impl PyItemKnn {
    fn fitted(&self) -> PyResult<&ItemKnnModel> {
        self.model
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("model is not fitted; call fit() or load()"))
    }
}

#[pymethods]
impl PyItemKnn {
    /// Create an unfitted model.
    ///
    /// Args:
    ///     k: neighbors kept per item (default 25)
    ///     min_common: co-raters required, strictly more than this (default 5)
    ///     rating_min / rating_max: rating scale used for validation and clamping
    #[new]
    #[pyo3(signature = (k=25, min_common=5, rating_min=0.5, rating_max=5.0))]
    fn new(k: usize, min_common: usize, rating_min: f64, rating_max: f64) -> PyResult<Self> {
        let config = KnnConfig {
            k,
            min_common,
            rating_min,
            rating_max,
            ..KnnConfig::default()
        };
        config.validate().map_err(knn_err_to_py)?;
        Ok(Self {
            config,
            model: None,
        })
    }

    /// Fit on (user, item, rating) triples with dense zero-based ids.
    ///
    /// Args:
    ///     triples: training ratings
    ///     users / items: optional dimensions, to keep held-out ids in range
    #[pyo3(signature = (triples, users=None, items=None))]
    fn fit(
        &mut self,
        py: Python<'_>,
        triples: Vec<(UserId, ItemId, f64)>,
        users: Option<usize>,
        items: Option<usize>,
    ) -> PyResult<()> {
        let config = self.config.clone();
        let model = py
            .allow_threads(|| {
                let covering = Dimensions::covering(&triples);
                let dims = Dimensions {
                    users: users.unwrap_or(covering.users),
                    items: items.unwrap_or(covering.items),
                };
                let matrix = RatingMatrix::with_dimensions(&triples, dims, &config)?;
                ItemKnnModel::fit(&matrix, &config)
            })
            .map_err(knn_err_to_py)?;
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, user_id: UserId, item_id: ItemId) -> PyResult<f64> {
        predict(self.fitted()?, user_id, item_id).map_err(knn_err_to_py)
    }

    /// Predict many (user, item) pairs in parallel.
    fn predict_batch(&self, py: Python<'_>, pairs: Vec<(UserId, ItemId)>) -> PyResult<Vec<f64>> {
        let model = self.fitted()?;
        py.allow_threads(|| predict_batch(model, &pairs))
            .map_err(knn_err_to_py)
    }

    /// Returns:
    ///     (predictions, targets, mse)
    ///
    /// With `report_path` the same report is also written there as JSON.
    #[pyo3(signature = (triples, label="eval", report_path=None))]
    fn evaluate(
        &self,
        py: Python<'_>,
        triples: Vec<(UserId, ItemId, f64)>,
        label: &str,
        report_path: Option<&str>,
    ) -> PyResult<(Vec<f64>, Vec<f64>, f64)> {
        let model = self.fitted()?;
        let report = py
            .allow_threads(|| evaluate(model, label, &triples))
            .map_err(knn_err_to_py)?;
        if let Some(path) = report_path {
            report.save(path).map_err(knn_err_to_py)?;
        }
        Ok((report.predictions, report.targets, report.mse))
    }

    /// Neighbor list of an item as [(weight, neighbor_id), ...], strongest first.
    fn neighbors(&self, item_id: ItemId) -> PyResult<Vec<(f64, ItemId)>> {
        let list = self.fitted()?.neighbors(item_id).map_err(knn_err_to_py)?;
        Ok(list.iter().map(|n| (n.weight, n.item)).collect())
    }

    fn average(&self, item_id: ItemId) -> PyResult<f64> {
        self.fitted()?.average(item_id).map_err(knn_err_to_py)
    }

    /// {user_id: rating - average} for the users who rated the item.
    fn deviations(&self, item_id: ItemId) -> PyResult<HashMap<UserId, f64>> {
        let devs = self.fitted()?.deviations(item_id).map_err(knn_err_to_py)?;
        Ok(devs.iter().map(|(&u, &d)| (u, d)).collect())
    }

    fn save(&self, path: &str) -> PyResult<()> {
        self.fitted()?.save(path).map_err(knn_err_to_py)
    }

    #[staticmethod]
    fn load(path: &str) -> PyResult<Self> {
        let model = ItemKnnModel::load(path).map_err(knn_err_to_py)?;
        Ok(Self {
            config: model.config().clone(),
            model: Some(model),
        })
    }

    fn __repr__(&self) -> String {
        match &self.model {
            Some(model) => format!(
                "ItemKnn(k={}, min_common={}, users={}, items={})",
                self.config.k,
                self.config.min_common,
                model.user_count(),
                model.item_count()
            ),
            None => format!(
                "ItemKnn(k={}, min_common={}, unfitted)",
                self.config.k, self.config.min_common
            ),
        }
    }
}

/// Mean squared error of two equal-length sequences (NaN when empty).
#[pyfunction]
#[pyo3(name = "mse")]
fn py_mse(predictions: Vec<f64>, targets: Vec<f64>) -> PyResult<f64> {
    metrics::mse(&predictions, &targets).map_err(knn_err_to_py)
}

#[pyfunction]
#[pyo3(name = "rmse")]
fn py_rmse(predictions: Vec<f64>, targets: Vec<f64>) -> PyResult<f64> {
    metrics::rmse(&predictions, &targets).map_err(knn_err_to_py)
}

/// Route the crate's tracing output to stderr, filtered by RUST_LOG.
///
/// Returns False if logging was already initialised.
#[pyfunction]
#[pyo3(signature = (default_filter="info"))]
fn init_logging(default_filter: &str) -> bool {
    crate::telemetry::init_tracing(default_filter).is_ok()
}

/// fast_itemknn — Rust-accelerated item-item collaborative filtering.
#[pymodule]
fn fast_itemknn(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyItemKnn>()?;
    m.add_function(wrap_pyfunction!(py_mse, m)?)?;
    m.add_function(wrap_pyfunction!(py_rmse, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    Ok(())
}
