//! Core types for tracking which controls are valid on a node.
//!
//! This crate provides the value types observers exchange about node controls:
//!
//! - **Catalog**: [`Controls`], metadata for every known [`Control`], merged
//!   with right-biased overwrite
//! - **Node state**: [`NodeControls`], a timestamped snapshot of the control
//!   identifiers valid on one node, merged last-writer-wins
//! - **Wire codec**: the dedicated encoding for [`NodeControls`], see [`wire`]
//!
//! # Example
//!
//! ```
//! use chrono::{DateTime, Duration};
//! use node_controls_core::{ManualClock, NodeControls, WireCodec};
//!
//! let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
//! let first = NodeControls::make_empty().add_with_clock(["restart"], &clock);
//! clock.advance(Duration::seconds(5));
//! let second = NodeControls::make_empty().add_with_clock(["pause", "resume"], &clock);
//!
//! // The newer snapshot replaces the older one outright.
//! let merged = first.merge(&second);
//! assert!(!merged.contains("restart"));
//!
//! let codec = WireCodec::default();
//! let bytes = codec.encode(&merged).unwrap();
//! assert_eq!(codec.decode(&bytes).unwrap(), merged);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod clock;
pub mod error;
pub mod node;
pub mod set;
pub mod time;
pub mod wire;

pub use catalog::{Control, Controls, SharedControls};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CodecError, Result, TimeError};
pub use node::{NodeControlData, NodeControls};
pub use set::StringSet;
pub use wire::{CodecConfig, WireCodec, WireFormat, WireNodeControls, GENERIC_CODEC_UNSUPPORTED};
