//! On-disk format of the approximation store.
//!
//! A store file is one bincode-encoded [`StoreFile`]: a magic tag, a format
//! version and the entries. Loading validates everything before any entry
//! is handed back, so a bad file never yields a partial store.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use planforge_core::{ConstraintSignature, PlanForgeError, Result};
use serde::{Deserialize, Serialize};

use super::graph::ManifoldGraph;
use super::{ApproximationKey, BuildMetadata, ConstraintApproximation};

pub(crate) const MAGIC: [u8; 8] = *b"PFCAPPRX";
pub(crate) const VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoreFile {
    pub magic: [u8; 8],
    pub version: u32,
    pub entries: Vec<ApproximationRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApproximationRecord {
    /// Canonical signature string; re-parsed on load.
    pub signature: String,
    pub group: String,
    pub dimension: u32,
    /// Row-major state coordinates.
    pub states: Vec<f64>,
    pub edges: Vec<(u32, u32)>,
    pub storage_path: String,
    pub metadata: BuildMetadata,
}

impl From<&ConstraintApproximation> for ApproximationRecord {
    fn from(approximation: &ConstraintApproximation) -> Self {
        let graph = approximation.graph();
        Self {
            signature: approximation.signature().to_string(),
            group: approximation.group().to_string(),
            dimension: graph.dimension() as u32,
            states: graph.raw_states().to_vec(),
            edges: graph.edges().to_vec(),
            storage_path: approximation.storage_path().to_string(),
            metadata: approximation.metadata().clone(),
        }
    }
}

impl ApproximationRecord {
    fn into_approximation(self) -> Result<ConstraintApproximation> {
        let signature: ConstraintSignature = self.signature.parse()?;
        if self.group.is_empty() {
            return Err(corrupt("entry with empty group"));
        }
        let graph = ManifoldGraph::from_parts(self.dimension as usize, self.states, self.edges)
            .map_err(|defect| corrupt(format!("entry for group '{}': {defect}", self.group)))?;
        if self.metadata.tolerances.iter().any(|t| !t.is_finite()) {
            return Err(corrupt(format!(
                "entry for group '{}' records a non-finite tolerance",
                self.group
            )));
        }
        Ok(ConstraintApproximation::new(
            ApproximationKey::new(signature, self.group),
            graph,
            self.storage_path,
            self.metadata,
        ))
    }
}

pub(crate) fn write_store(path: &Path, entries: &[Arc<ConstraintApproximation>]) -> Result<()> {
    let file = StoreFile {
        magic: MAGIC,
        version: VERSION,
        entries: entries
            .iter()
            .map(|e| ApproximationRecord::from(e.as_ref()))
            .collect(),
    };
    let bytes = bincode::serialize(&file)
        .map_err(|e| PlanForgeError::Io(std::io::Error::other(e.to_string())))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    fs::write(&temp, &bytes)?;
    fs::rename(&temp, path)?;
    Ok(())
}

pub(crate) fn read_store(path: &Path) -> Result<Vec<ConstraintApproximation>> {
    let bytes = fs::read(path)?;
    decode(&bytes)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Vec<ConstraintApproximation>> {
    let file: StoreFile =
        bincode::deserialize(bytes).map_err(|e| corrupt(format!("undecodable: {e}")))?;
    if file.magic != MAGIC {
        return Err(corrupt("bad magic"));
    }
    if file.version != VERSION {
        return Err(corrupt(format!(
            "unsupported version {} (expected {VERSION})",
            file.version
        )));
    }

    let mut seen = HashSet::with_capacity(file.entries.len());
    let mut loaded = Vec::with_capacity(file.entries.len());
    for record in file.entries {
        let approximation = record.into_approximation()?;
        if !seen.insert(approximation.key().clone()) {
            return Err(corrupt(format!(
                "duplicate entry for group '{}'",
                approximation.group()
            )));
        }
        loaded.push(approximation);
    }
    Ok(loaded)
}

fn corrupt(reason: impl Into<String>) -> PlanForgeError {
    PlanForgeError::CorruptStore(reason.into())
}
