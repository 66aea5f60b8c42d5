//! Domain pattern matching shared by static hosts and per-server routing.

pub mod group;
pub mod suffix_trie;

pub use group::{DomainMatcherGroup, DomainMatcherGroupBuilder};
pub use suffix_trie::{MatchIds, SuffixTrie};
