use super::suffix_trie::{MatchIds, SuffixTrie};
use aho_corasick::AhoCorasick;
use compact_str::CompactString;
use fancy_regex::Regex;
use ferrous_resolver_domain::config::{normalize_domain, DomainMatchType, DomainPattern};
use ferrous_resolver_domain::ConfigError;
use rustc_hash::FxBuildHasher;
use std::collections::HashMap;
use tracing::warn;

/// Mutable side of a [`DomainMatcherGroup`]. Ids are handed out in
/// insertion order starting at 1.
#[derive(Default)]
pub struct DomainMatcherGroupBuilder {
    full: HashMap<CompactString, MatchIds, FxBuildHasher>,
    suffix: SuffixTrie,
    keywords: Vec<(String, u32)>,
    regexes: Vec<(Regex, u32)>,
    next_id: u32,
}

impl DomainMatcherGroupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: &DomainPattern) -> Result<u32, ConfigError> {
        let value = pattern.value.as_str();
        if value.is_empty() {
            return Err(ConfigError::InvalidDomainPattern(pattern.to_string()));
        }

        let id = self.next_id + 1;
        match pattern.match_type {
            DomainMatchType::Full => {
                self.full
                    .entry(CompactString::new(value))
                    .or_default()
                    .push(id);
            }
            DomainMatchType::Domain => self.suffix.insert(value, id),
            DomainMatchType::Keyword => self.keywords.push((value.to_string(), id)),
            DomainMatchType::Regexp => {
                let regex = Regex::new(value).map_err(|e| {
                    ConfigError::InvalidDomainPattern(format!("{}: {}", pattern, e))
                })?;
                self.regexes.push((regex, id));
            }
        }
        self.next_id = id;
        Ok(id)
    }

    pub fn build(self) -> Result<DomainMatcherGroup, ConfigError> {
        let (keyword_automaton, keyword_ids) = if self.keywords.is_empty() {
            (None, Vec::new())
        } else {
            let (patterns, ids): (Vec<String>, Vec<u32>) = self.keywords.into_iter().unzip();
            let ac = AhoCorasick::builder()
                .ascii_case_insensitive(true)
                .build(&patterns)
                .map_err(|e| ConfigError::InvalidDomainPattern(e.to_string()))?;
            (Some(ac), ids)
        };

        Ok(DomainMatcherGroup {
            full: self.full,
            suffix: self.suffix,
            keyword_automaton,
            keyword_ids,
            regexes: self.regexes,
            size: self.next_id as usize,
        })
    }
}

/// Read-only set of domain patterns.
///
/// Full matches use a hash map, `domain:` patterns a reversed-label trie,
/// keywords one Aho-Corasick automaton and regexps are tried in order.
pub struct DomainMatcherGroup {
    full: HashMap<CompactString, MatchIds, FxBuildHasher>,
    suffix: SuffixTrie,
    keyword_automaton: Option<AhoCorasick>,
    keyword_ids: Vec<u32>,
    regexes: Vec<(Regex, u32)>,
    size: usize,
}

impl Default for DomainMatcherGroup {
    fn default() -> Self {
        Self {
            full: HashMap::with_hasher(FxBuildHasher),
            suffix: SuffixTrie::new(),
            keyword_automaton: None,
            keyword_ids: Vec::new(),
            regexes: Vec::new(),
            size: 0,
        }
    }
}

impl DomainMatcherGroup {
    pub fn builder() -> DomainMatcherGroupBuilder {
        DomainMatcherGroupBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Ids of every pattern matching `domain`, unordered.
    pub fn matches(&self, domain: &str) -> MatchIds {
        let domain = normalize_domain(domain);
        let mut out = MatchIds::new();

        if let Some(ids) = self.full.get(domain.as_str()) {
            out.extend_from_slice(ids);
        }
        self.suffix.lookup_into(&domain, &mut out);

        if let Some(ac) = &self.keyword_automaton {
            for m in ac.find_overlapping_iter(domain.as_str()) {
                out.push(self.keyword_ids[m.pattern().as_usize()]);
            }
        }

        for (regex, id) in &self.regexes {
            match regex.is_match(&domain) {
                Ok(true) => out.push(*id),
                Ok(false) => {}
                Err(e) => warn!(domain = %domain, error = %e, "Regex evaluation failed"),
            }
        }

        out
    }

    /// The matching pattern added last, if any.
    pub fn best_match(&self, domain: &str) -> Option<u32> {
        self.matches(domain).into_iter().max()
    }
}
