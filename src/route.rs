//! Orthogonal path construction for edges.
//!
//! `step` holds the shared right-angle routing routine; `strategy` decides
//! where on each symbol the path starts and ends before handing the adjusted
//! points to it.

pub mod step;
pub mod strategy;

pub use step::{StepOptions, StepPath, step_path};
pub use strategy::{EdgePathStrategy, FlushOffsets, RoutedPath};
