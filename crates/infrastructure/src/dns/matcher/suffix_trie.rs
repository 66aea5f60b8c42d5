use compact_str::CompactString;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::collections::HashMap;

pub type MatchIds = SmallVec<[u32; 4]>;

#[derive(Default)]
struct TrieNode {
    children: HashMap<CompactString, TrieNode, FxBuildHasher>,
    /// Ids of `domain:` patterns ending at this node.
    ids: SmallVec<[u32; 1]>,
}

/// Reversed-label trie for `domain:` patterns.
///
/// `domain:ads.com` is stored along ["com", "ads"]. A lookup for
/// `x.ads.com` walks ["com", "ads", "x"] and collects ids on the way, so
/// the pattern matches both the name itself and every subdomain.
#[derive(Default)]
pub struct SuffixTrie {
    root: TrieNode,
    len: usize,
}

impl SuffixTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// `domain` is expected lowercase without the trailing dot.
    pub fn insert(&mut self, domain: &str, id: u32) {
        let mut node = &mut self.root;
        for label in domain.split('.').rev() {
            node = node.children.entry(CompactString::new(label)).or_default();
        }
        node.ids.push(id);
        self.len += 1;
    }

    /// Append the ids of every pattern that is `domain` or a parent of it.
    #[inline]
    pub fn lookup_into(&self, domain: &str, out: &mut MatchIds) {
        let mut node = &self.root;
        for label in domain.split('.').rev() {
            match node.children.get(label) {
                Some(child) => {
                    out.extend_from_slice(&child.ids);
                    node = child;
                }
                None => break,
            }
        }
    }

    pub fn lookup(&self, domain: &str) -> MatchIds {
        let mut out = MatchIds::new();
        self.lookup_into(domain, &mut out);
        out
    }
}
