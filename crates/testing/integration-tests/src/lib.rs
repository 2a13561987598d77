//! Integration test utilities for phpack
//!
//! [`multi_file`] builds throwaway multi-module PHP workspaces in a temporary
//! directory and runs them through the build driver. [`fixtures`] runs the
//! checked-in projects under `test-projects/` and compares their outputs with
//! the expected bundles stored next to them.

pub mod fixtures;
pub mod multi_file;
