use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SimError;

/// The fixed six-column parameter record shared with the persistence
/// collaborator. Column names are part of the file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredParams {
    #[serde(rename = "Distance")]
    pub distance: f64,
    #[serde(rename = "Battery")]
    pub battery: f64,
    #[serde(rename = "BrakeCounter")]
    pub brake_counter: u32,
    #[serde(rename = "BatteryHealth")]
    pub battery_health: f64,
    #[serde(rename = "TyreHealth")]
    pub tyre_health: f64,
    #[serde(rename = "BrakePads")]
    pub brake_pads: f64,
}

impl Default for StoredParams {
    /// Factory values for a vehicle without a parameter file.
    fn default() -> Self {
        Self {
            distance: 0.0,
            battery: 80.0,
            brake_counter: 0,
            battery_health: 100.0,
            tyre_health: 100.0,
            brake_pads: 100.0,
        }
    }
}

/// Boundary with the persistence collaborator: one load at startup, one
/// save at the end of every tick plus a final save on shutdown.
pub trait ParameterStore {
    fn load(&self) -> Result<StoredParams, SimError>;
    fn save(&self, params: &StoredParams) -> Result<(), SimError>;
}

/// Header-plus-one-row CSV file implementation.
#[derive(Debug, Clone)]
pub struct CsvParameterStore {
    path: PathBuf,
}

impl CsvParameterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ParameterStore for CsvParameterStore {
    fn load(&self) -> Result<StoredParams, SimError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no parameter file, starting from factory values");
            return Ok(StoredParams::default());
        }
        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| SimError::Persistence(format!("cannot open parameter file: {e}")))?;
        reader
            .deserialize()
            .next()
            .transpose()
            .map_err(|e| SimError::Persistence(format!("bad parameter record: {e}")))?
            .ok_or_else(|| SimError::Persistence("parameter file has no data row".to_owned()))
    }

    fn save(&self, params: &StoredParams) -> Result<(), SimError> {
        let mut writer = csv::Writer::from_path(&self.path)
            .map_err(|e| SimError::Persistence(format!("cannot write parameter file: {e}")))?;
        writer
            .serialize(params)
            .map_err(|e| SimError::Persistence(format!("cannot serialize parameters: {e}")))?;
        writer
            .flush()
            .map_err(|e| SimError::Persistence(format!("cannot flush parameter file: {e}")))
    }
}
