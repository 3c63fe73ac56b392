pub mod avl_map;

pub use avl_map::AvlMap;

pub mod avl_set;

pub use avl_set::AvlSet;

pub mod seq_list;

pub use seq_list::{Rope, SeqList};

pub mod sum_set;

pub use sum_set::SumSet;

pub mod splay_map;

pub use splay_map::SplayMap;

use std::fmt;

/// The error type for fallible tree operations.
///
/// Failing operations leave the collection structurally untouched: an error
/// is always reported before any links are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// The requested key is not present in the collection.
    NotFound,
    /// The collection has no entries.
    Empty,
    /// The index or rank lies outside `0..len`.
    OutOfRange,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            TreeError::NotFound => "key not found",
            TreeError::Empty => "collection is empty",
            TreeError::OutOfRange => "index out of range",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for TreeError {}
