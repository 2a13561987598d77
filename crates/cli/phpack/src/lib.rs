//! phpack - PHP source bundler
//!
//! Reads a `phpack.toml` manifest describing libraries and projects and
//! bundles each of them into a single PHP file.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "CLI tool needs to print to stdout/stderr"
)]

pub mod commands;
pub mod manifest;
