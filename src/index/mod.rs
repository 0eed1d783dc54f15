//! Completion indexes over the dirty sorted trie

pub mod frozen;
pub mod mutable;

pub use frozen::FrozenIndex;
pub use mutable::MutableIndex;
