//! Shared building blocks for the pathlock workspace.
//!
//! Currently this is the deduplicating [`KeyedSet`] used to hold rule lists.

pub mod keyed_set;

pub use keyed_set::{Keyed, KeyedSet};
