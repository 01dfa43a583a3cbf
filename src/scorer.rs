//! Scorer — TF·IDF with metadata boosts, AND-conjunction reduction, and a
//! stable top-10 ranking (spec.md §4.8).

use crate::document::{Document, MetaMask};
use crate::error::SearchError;
use crate::query::{LevelFilter, Query};
use crate::reader::{LexEntry, PostingsFile};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedHit {
    pub doc_id: u32,
    pub path: String,
    pub score: f64,
}

/// Run the query against the opened lexicon/documents/postings, applying
/// filters, scoring, AND-reducing, and returning at most the top 10 hits.
pub fn score_query(
    query: &Query,
    lexicon: &FxHashMap<String, LexEntry>,
    documents: &FxHashMap<u32, Document>,
    postings_file: &mut PostingsFile,
) -> Result<Vec<RankedHit>, SearchError> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let total_docs = documents.len() as f64;
    let mut scores: FxHashMap<u32, f64> = FxHashMap::default();
    let mut matches: FxHashMap<u32, u32> = FxHashMap::default();

    for term in &query.terms {
        let Some(entry) = lexicon.get(term) else {
            // UnknownTerm: contributes nothing, disqualifying every doc under
            // AND semantics. Not an error (spec.md §7).
            continue;
        };
        let idf = idf(total_docs, entry.df as f64);
        let postings = postings_file.fetch(entry.offset, entry.df)?;

        for posting in postings {
            let Some(doc) = documents.get(&posting.doc_id) else {
                continue;
            };

            if let Some(ext) = &query.ext {
                if !doc.path.to_ascii_lowercase().ends_with(ext.as_str()) {
                    continue;
                }
            }
            if matches!(query.level, Some(LevelFilter::Error))
                && !posting.meta.contains(MetaMask::LOG_ERROR)
            {
                continue;
            }

            let contribution = term_contribution(posting.freq as f64, idf, posting.meta);
            *scores.entry(posting.doc_id).or_insert(0.0) += contribution;
            *matches.entry(posting.doc_id).or_insert(0) += 1;
        }
    }

    Ok(rank(&matches, &scores, documents, query.terms.len() as u32))
}

fn idf(total_docs: f64, df: f64) -> f64 {
    (total_docs / (df + 1.0)).log10()
}

fn term_contribution(freq: f64, idf: f64, meta: MetaMask) -> f64 {
    let mut contribution = freq * idf;
    if meta.contains(MetaMask::IN_FILENAME) {
        contribution += 5.0;
    }
    if meta.contains(MetaMask::IN_FUNCNAME) {
        contribution += 3.0;
    }
    if meta.contains(MetaMask::LOG_ERROR) {
        contribution += 2.0;
    }
    contribution
}

/// AND-reduce and sort: a doc qualifies iff it matched every query term.
/// Ties break by ascending doc_id — an explicit sort key, not incidental
/// iteration-order stability (spec.md §8 invariant 6).
fn rank(
    matches: &FxHashMap<u32, u32>,
    scores: &FxHashMap<u32, f64>,
    documents: &FxHashMap<u32, Document>,
    required: u32,
) -> Vec<RankedHit> {
    let mut qualifying: Vec<RankedHit> = matches
        .iter()
        .filter(|(_, &count)| count == required)
        .filter_map(|(doc_id, _)| {
            documents.get(doc_id).map(|doc| RankedHit {
                doc_id: *doc_id,
                path: doc.path.clone(),
                score: scores.get(doc_id).copied().unwrap_or(0.0),
            })
        })
        .collect();

    qualifying.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    qualifying.truncate(10);
    qualifying
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: u32, path: &str) -> Document {
        Document::new(id, crate::document::DocType::Code, path.to_string(), 0, 0)
    }

    #[test]
    fn idf_matches_log10_formula() {
        assert!((idf(1.0, 1.0) - (1.0f64 / 2.0).log10()).abs() < 1e-12);
    }

    #[test]
    fn boosts_are_additive_and_applied_once_per_posting() {
        let meta = MetaMask::NONE.with(MetaMask::IN_FUNCNAME).with(MetaMask::LOG_ERROR);
        let contribution = term_contribution(2.0, 0.0, meta);
        assert_eq!(contribution, 3.0 + 2.0);
    }

    #[test]
    fn and_reduction_drops_docs_missing_a_term() {
        let documents: FxHashMap<u32, Document> =
            [(1, doc(1, "a.py")), (2, doc(2, "b.py"))].into_iter().collect();
        let mut matches = FxHashMap::default();
        matches.insert(1, 2);
        matches.insert(2, 1);
        let mut scores = FxHashMap::default();
        scores.insert(1, 5.0);
        scores.insert(2, 9.0);

        let hits = rank(&matches, &scores, &documents, 2);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 1);
    }

    #[test]
    fn ties_break_by_ascending_doc_id() {
        let documents: FxHashMap<u32, Document> = [
            (3, doc(3, "c.py")),
            (1, doc(1, "a.py")),
            (2, doc(2, "b.py")),
        ]
        .into_iter()
        .collect();
        let matches: FxHashMap<u32, u32> = [(3, 1), (1, 1), (2, 1)].into_iter().collect();
        let scores: FxHashMap<u32, f64> = [(3, 1.0), (1, 1.0), (2, 1.0)].into_iter().collect();

        let hits = rank(&matches, &scores, &documents, 1);
        let ids: Vec<u32> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn truncates_to_top_ten() {
        let mut documents = FxHashMap::default();
        let mut matches = FxHashMap::default();
        let mut scores = FxHashMap::default();
        for id in 1..=15u32 {
            documents.insert(id, doc(id, "a.py"));
            matches.insert(id, 1);
            scores.insert(id, id as f64);
        }
        let hits = rank(&matches, &scores, &documents, 1);
        assert_eq!(hits.len(), 10);
        assert_eq!(hits[0].doc_id, 15);
    }
}
