//! Per-node control snapshots.
//!
//! A [`NodeControls`] records which control identifiers were valid on a node
//! at the moment an observer looked. Snapshots are immutable values: merging
//! and growing return new snapshots, so copies can be read concurrently
//! without locking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::set::StringSet;

/// The control identifiers valid on one node at one point in time.
///
/// An unset timestamp means no observation has been recorded; see
/// [`NodeControls::make_empty`].
///
/// This type has no generic serde representation. Its `Serialize` and
/// `Deserialize` impls always fail; encode it through [`crate::wire`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeControls {
    timestamp: Option<DateTime<Utc>>,
    controls: StringSet,
}

impl NodeControls {
    /// Return the unset snapshot.
    #[must_use]
    pub fn make_empty() -> Self {
        Self::default()
    }

    /// Create a snapshot from its parts.
    #[must_use]
    pub fn new(timestamp: Option<DateTime<Utc>>, controls: StringSet) -> Self {
        Self {
            timestamp,
            controls,
        }
    }

    /// When the snapshot was taken, or `None` for the unset snapshot.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// The control identifiers in the snapshot.
    #[must_use]
    pub fn controls(&self) -> &StringSet {
        &self.controls
    }

    /// Check whether `id` is one of the snapshot's controls.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.controls.contains(id)
    }

    /// Check whether this is the unset snapshot.
    #[must_use]
    pub fn is_empty_state(&self) -> bool {
        self.timestamp.is_none()
    }

    /// Return the newer of the two snapshots.
    ///
    /// The control sets are never combined: a node's controls are exactly
    /// those of its most recent observation. If the timestamps are equal,
    /// `self` is kept, so the merge is not commutative.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        if self.timestamp < other.timestamp {
            tracing::trace!(
                from = ?self.timestamp,
                to = ?other.timestamp,
                "newer node controls replace snapshot"
            );
            other.clone()
        } else {
            self.clone()
        }
    }

    /// Add `ids` to the snapshot, stamping it with the system clock.
    #[must_use]
    pub fn add<I, S>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_with_clock(ids, &SystemClock)
    }

    /// Add `ids` to the snapshot, stamping it with `clock`.
    #[must_use]
    pub fn add_with_clock<I, S>(&self, ids: I, clock: &dyn Clock) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            timestamp: Some(clock.now()),
            controls: self.controls.add(ids),
        }
    }
}

/// Liveness of a control, carried as a value by the node's control data map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeControlData {
    /// Whether the control is no longer available.
    pub dead: bool,
}
