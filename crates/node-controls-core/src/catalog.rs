//! Control metadata and the catalog that indexes it.
//!
//! A [`Control`] describes one remotely invocable action. [`Controls`] maps
//! control identifiers to their metadata and is merged with right-biased
//! overwrite as metadata arrives from different sources.

use std::collections::hash_map;
use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Metadata describing one remotely invocable action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Control {
    /// Identifier, unique within a catalog.
    pub id: String,
    /// Label shown to operators.
    pub human: String,
    /// Icon name used when rendering the control.
    pub icon: String,
    /// Ordering rank; lower ranks render first.
    pub rank: i32,
}

impl Control {
    /// Create a new control.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        human: impl Into<String>,
        icon: impl Into<String>,
        rank: i32,
    ) -> Self {
        Self {
            id: id.into(),
            human: human.into(),
            icon: icon.into(),
            rank,
        }
    }
}

/// A catalog of control metadata keyed by control identifier.
///
/// Everything except [`Controls::add_control`] and [`Controls::add_controls`]
/// leaves the receiver untouched. Those two mutate in place; a catalog shared
/// between writers must be guarded, for example with [`SharedControls`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Controls(HashMap<String, Control>);

impl Controls {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `other` into a copy of `self`, returning the fresh catalog.
    ///
    /// On an identifier present in both, the entry from `other` wins.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut result = self.copy();
        for (id, control) in &other.0 {
            result.0.insert(id.clone(), control.clone());
        }
        result
    }

    /// Copy the catalog into independent storage.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Insert `control`, replacing any entry with the same identifier.
    ///
    /// This mutates the catalog in place.
    pub fn add_control(&mut self, control: Control) {
        self.0.insert(control.id.clone(), control);
    }

    /// Insert each control in order; later duplicates win.
    ///
    /// This mutates the catalog in place.
    pub fn add_controls<I>(&mut self, controls: I)
    where
        I: IntoIterator<Item = Control>,
    {
        for control in controls {
            self.add_control(control);
        }
    }

    /// Look up a control by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Control> {
        self.0.get(id)
    }

    /// Check whether the catalog has an entry for `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the entries in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, Control> {
        self.0.iter()
    }

    /// Return the controls in display order: by rank, then by identifier.
    #[must_use]
    pub fn ranked(&self) -> Vec<&Control> {
        let mut controls: Vec<_> = self.0.values().collect();
        controls.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.id.cmp(&b.id)));
        controls
    }
}

impl FromIterator<Control> for Controls {
    fn from_iter<I: IntoIterator<Item = Control>>(iter: I) -> Self {
        let mut controls = Self::new();
        controls.add_controls(iter);
        controls
    }
}

/// A catalog shared between concurrent writers.
///
/// Writes take an exclusive lock; readers get independent snapshots.
#[derive(Debug, Default)]
pub struct SharedControls {
    catalog: RwLock<Controls>,
}

impl SharedControls {
    /// Create an empty shared catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing catalog.
    #[must_use]
    pub fn from_controls(controls: Controls) -> Self {
        Self {
            catalog: RwLock::new(controls),
        }
    }

    /// Insert `control`, replacing any entry with the same identifier.
    pub fn add_control(&self, control: Control) {
        self.catalog.write().add_control(control);
    }

    /// Insert each control in order; later duplicates win.
    pub fn add_controls<I>(&self, controls: I)
    where
        I: IntoIterator<Item = Control>,
    {
        self.catalog.write().add_controls(controls);
    }

    /// Merge `other` into the shared catalog; entries from `other` win.
    pub fn merge_from(&self, other: &Controls) {
        let mut catalog = self.catalog.write();
        let merged = catalog.merge(other);
        *catalog = merged;
    }

    /// Look up a control by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Control> {
        self.catalog.read().get(id).cloned()
    }

    /// Copy the current catalog.
    #[must_use]
    pub fn snapshot(&self) -> Controls {
        self.catalog.read().copy()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.catalog.read().len()
    }

    /// Check whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalog.read().is_empty()
    }
}
