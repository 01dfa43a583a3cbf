//! PostingAccumulator — in-memory term→doc→{freq,positions,meta} builder
//! (spec.md §4.4).

use crate::document::MetaMask;
use rustc_hash::FxHashMap;

/// Per-(term, doc) state being built up while the tokenizer streams a file.
#[derive(Debug, Clone, Default)]
pub struct PostingBuilder {
    pub freq: u32,
    pub positions: Vec<u32>,
    pub meta: MetaMask,
}

/// Maps `term -> doc_id -> PostingBuilder`. Memory footprint is proportional
/// to total token occurrences; no spill-to-disk.
#[derive(Default)]
pub struct PostingAccumulator {
    terms: FxHashMap<Box<str>, FxHashMap<u32, PostingBuilder>>,
}

impl PostingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one `(term, line, meta)` occurrence for `doc_id`.
    pub fn record(&mut self, term: &str, doc_id: u32, line: u32, meta: MetaMask) {
        let by_doc = self
            .terms
            .entry(Box::from(term))
            .or_insert_with(FxHashMap::default);
        let entry = by_doc.entry(doc_id).or_default();
        entry.freq += 1;
        entry.positions.push(line);
        entry.meta |= meta;
    }

    /// Terms in ascending byte-lex order, as required by the lexicon layout
    /// (spec.md §4.5).
    pub fn terms_sorted(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self.terms.keys().map(|t| t.as_ref()).collect();
        terms.sort_unstable();
        terms
    }

    /// Doc ids (ascending) and their posting builders for `term`.
    pub fn postings_for(&self, term: &str) -> Vec<(u32, &PostingBuilder)> {
        let mut postings: Vec<(u32, &PostingBuilder)> = self
            .terms
            .get(term)
            .map(|by_doc| by_doc.iter().map(|(&id, p)| (id, p)).collect())
            .unwrap_or_default();
        postings.sort_unstable_by_key(|(id, _)| *id);
        postings
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}
