//! Search orchestration — loads an on-disk index and answers a query
//! (spec.md §4.6–§4.8, §7 `MissingIndex`).

use crate::error::SearchError;
use crate::query::Query;
use crate::reader::{load_documents, load_lexicon, PostingsFile};
use crate::scorer::{score_query, RankedHit};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub hits: Vec<RankedHit>,
}

impl SearchOutcome {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Run `query` against the index at `index_dir`. A missing index directory
/// is reported as an empty outcome, not an error (spec.md §7 `MissingIndex`).
pub fn search(query: &str, index_dir: &Path) -> Result<SearchOutcome, SearchError> {
    let parsed = Query::parse(query);
    if parsed.is_empty() {
        return Ok(SearchOutcome::empty());
    }
    if !index_dir.is_dir() {
        log::info!("no index found at {}", index_dir.display());
        return Ok(SearchOutcome::empty());
    }

    let documents = load_documents(index_dir)?;
    let lexicon = load_lexicon(index_dir)?;
    let mut postings_file = PostingsFile::open(index_dir)?;

    let hits = score_query(&parsed, &lexicon, &documents, &mut postings_file)?;
    log::info!("query {:?} matched {} document(s)", query, hits.len());
    Ok(SearchOutcome { hits })
}
