//! JSON snapshots of a fitted model and of evaluation reports.
//!
//! Floats round-trip exactly (`serde_json/float_roundtrip`) and deviation
//! maps keep their sparse key sets.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::evaluate::Evaluation;
use crate::model::ItemKnnModel;

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

impl ItemKnnModel {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        write_json(path, self)?;
        info!(path = %path.display(), items = self.item_count(), "model saved");
        Ok(())
    }

    /// Reads a snapshot written by [`ItemKnnModel::save`] and checks that
    /// its tables are consistent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let model: Self = serde_json::from_reader(reader)?;
        model.check_consistency()?;
        info!(path = %path.display(), items = model.item_count(), "model loaded");
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(raw)?;
        model.check_consistency()?;
        Ok(model)
    }
}

impl Evaluation {
    /// Writes predictions, targets and MSE as one JSON object. An empty
    /// run's NaN MSE is written as `null`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        write_json(path, self)?;
        info!(
            path = %path.display(),
            rows = self.predictions.len(),
            mse = self.mse,
            "evaluation saved"
        );
        Ok(())
    }
}
