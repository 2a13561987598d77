//! Indexed arena storage for symbols and build units
//!
//! Re-exports `la-arena` so downstream crates share a single arena type.

pub use la_arena::{Arena, ArenaMap, Idx};
