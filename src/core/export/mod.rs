//! Export orchestration
//!
//! This module wires a job together from configuration:
//! - [`ExportCoordinator`] builds collaborators and runs whole or segmented jobs
//! - [`segments`] splits an input into ranges and merges segment outcomes

pub mod coordinator;
pub mod segments;

pub use coordinator::{build_lookup, build_storage, ExportCoordinator};
pub use segments::{merge_outcomes, plan_segments, SegmentRange};
