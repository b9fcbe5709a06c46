//! File-classifier plugin for R_PIPELINE.
//!
//! Classifies a file by its extension and recommends a destination folder.

pub mod classifier;
pub mod plugin;

pub use classifier::{Classification, classify};
pub use plugin::{ENTRY_POINT, FileClassifierPlugin};
