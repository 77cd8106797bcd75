//! Merging and conversion of node control reports.
//!
//! A report is one observer's view of a set of nodes: a map from node
//! identifier to that node's [`NodeControls`] in wire form. Reports from
//! several observers are merged per node, newest snapshot winning.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod report;

pub use config::load_codec_config;
pub use error::{CliError, Result};
pub use report::{convert, load_report, merge_files, Report};
