//! Run properties and on-disk layout of runs and backups.

use crate::error::{AetherError, Result};
use crate::traits::Quantity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const AUTOMATON_NAME: &str = "Aether";
pub const GRID_FOLDER_NAME: &str = "grid";
pub const PROPERTIES_FILE_NAME: &str = "properties.json";
pub const PROPERTIES_FORMAT_VERSION: u32 = 1;

/// Scalar state of a run, persisted next to its grid blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "Q: Quantity"))]
pub struct RunProperties<Q> {
    pub format_version: u32,
    pub automaton: String,
    pub dimension: usize,
    pub quantity: String,
    pub seed: Q,
    pub step: u64,
    pub max_outer: i64,
    /// Largest canonical coordinate of any non-zero cell, per axis.
    pub extents: Vec<i64>,
    /// Budget the run was written with. Informational: a restored run uses the
    /// budget of the settings it is restored with.
    pub memory_budget_bytes: u64,
}

impl<Q: Quantity> RunProperties<Q> {
    pub fn read(folder: &Path) -> Result<Self> {
        let path = folder.join(PROPERTIES_FILE_NAME);
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write(&self, folder: &Path) -> Result<()> {
        fs::create_dir_all(folder)?;
        let text = serde_json::to_string_pretty(self)?;
        fs::write(folder.join(PROPERTIES_FILE_NAME), text)?;
        Ok(())
    }

    /// Checks the properties describe a run of this dimension and quantity type.
    pub fn check(&self, dimension: usize) -> Result<()> {
        if self.format_version != PROPERTIES_FORMAT_VERSION {
            return Err(AetherError::Serialization(format!(
                "Unsupported run properties version {}",
                self.format_version
            )));
        }
        if self.automaton != AUTOMATON_NAME {
            return Err(AetherError::Serialization(format!(
                "Backup belongs to a {} run",
                self.automaton
            )));
        }
        if self.dimension != dimension || self.extents.len() != dimension {
            return Err(AetherError::Serialization(format!(
                "Backup holds a {}D grid, expected {dimension}D",
                self.dimension
            )));
        }
        if self.quantity != Q::TYPE_NAME {
            return Err(AetherError::Serialization(format!(
                "Backup holds {} values, expected {}",
                self.quantity,
                Q::TYPE_NAME
            )));
        }
        Ok(())
    }
}

/// `<root>/Aether/<N>D/<seed>/asymmetric_section`
pub fn run_folder<Q: Quantity>(root: &Path, dimension: usize, seed: &Q) -> PathBuf {
    // rational seeds print as `p/q`
    let seed = seed.to_string().replace('/', "_over_");
    root.join(AUTOMATON_NAME)
        .join(format!("{dimension}D"))
        .join(seed)
        .join("asymmetric_section")
}

pub fn grid_folder<Q: Quantity>(root: &Path, dimension: usize, seed: &Q) -> PathBuf {
    run_folder(root, dimension, seed).join(GRID_FOLDER_NAME)
}
