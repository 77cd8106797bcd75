//! Observer reports and their per-node merge.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::Path;

use node_controls_core::{NodeControls, WireCodec, WireNodeControls};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// One observer's node controls, keyed by node identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(BTreeMap<String, WireNodeControls>);

impl Report {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `controls` for `node`, replacing anything recorded before.
    pub fn insert(&mut self, node: impl Into<String>, controls: NodeControls) {
        self.0.insert(node.into(), WireNodeControls(controls));
    }

    /// Get the controls recorded for `node`.
    #[must_use]
    pub fn get(&self, node: &str) -> Option<&NodeControls> {
        self.0.get(node).map(|wire| &wire.0)
    }

    /// Number of nodes in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the report has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the node identifiers in sorted order.
    pub fn nodes(&self) -> btree_map::Keys<'_, String, WireNodeControls> {
        self.0.keys()
    }

    /// Merge `other` into a copy of `self`, per node.
    ///
    /// Nodes present in both keep whichever snapshot is newer, with ties
    /// going to `self`. Nodes only in `other` are taken as they are.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (node, WireNodeControls(incoming)) in &other.0 {
            match merged.0.entry(node.clone()) {
                btree_map::Entry::Vacant(entry) => {
                    entry.insert(WireNodeControls(incoming.clone()));
                }
                btree_map::Entry::Occupied(mut entry) => {
                    let current = &mut entry.get_mut().0;
                    *current = current.merge(incoming);
                }
            }
        }
        merged
    }
}

/// Read and decode one report file.
///
/// # Errors
///
/// Returns `CliError::Io` if the file cannot be read and
/// `CliError::InvalidReport` if it does not decode.
pub fn load_report(path: &Path, codec: &WireCodec) -> Result<Report> {
    let bytes = std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let report: Report = codec
        .decode_value(&bytes)
        .map_err(|source| CliError::InvalidReport {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), nodes = report.len(), "loaded report");
    Ok(report)
}

/// Load every report in order and merge them per node.
///
/// # Errors
///
/// Returns the first load error encountered.
pub fn merge_files<P: AsRef<Path>>(paths: &[P], codec: &WireCodec) -> Result<Report> {
    paths.iter().try_fold(Report::new(), |merged, path| {
        let report = load_report(path.as_ref(), codec)?;
        Ok(merged.merge(&report))
    })
}

/// Re-encode a single node controls payload from one format to another.
///
/// # Errors
///
/// Returns `CliError::Codec` if the payload does not decode or encode.
pub fn convert(bytes: &[u8], from: &WireCodec, to: &WireCodec) -> Result<Vec<u8>> {
    let controls = from.decode(bytes)?;
    Ok(to.encode(&controls)?)
}
