//! `.bsproject` file I/O.
//!
//! A `.bsproject` file is the pretty-printed JSON form of
//! [`crate::models::Project`]. This module provides:
//!
//! - [`serialization`]: atomic save and load functions

pub mod serialization;

/// Extension used for saved projects.
pub const PROJECT_EXTENSION: &str = "bsproject";
