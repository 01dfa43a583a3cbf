//! Build orchestration — walks a root directory, classifies, tokenizes
//! (in parallel), and merges into an on-disk index (spec.md §4.1–§4.5, §5).

use crate::accumulator::PostingAccumulator;
use crate::classifier;
use crate::document::{DocType, Document, DocumentTable};
use crate::error::BuildError;
use crate::tokenizer::{Token, Tokenizer};
use crate::writer::write_index;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    pub documents_indexed: u32,
    pub files_skipped: u32,
    pub elapsed: Duration,
}

struct TokenizedFile {
    path: String,
    doc_type: DocType,
    tokens: Vec<Token>,
    t_min: i64,
    t_max: i64,
}

/// Build `index_dir` from the tree rooted at `root`.
pub fn build_index(root: &Path, index_dir: &Path) -> Result<BuildStats, BuildError> {
    let started = Instant::now();
    fs::create_dir_all(index_dir).map_err(|e| io_err(index_dir, e))?;

    let index_dir_name = index_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let candidates: Vec<(PathBuf, DocType)> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_pruned_entry(entry, index_dir_name))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let doc_type = classifier::classify(entry.path())?;
            Some((entry.into_path(), doc_type))
        })
        .collect();

    // Tokenization is CPU-bound and independent per file; the merge below
    // replays results in walk order, so parallelizing this step never
    // changes doc-id assignment or posting order.
    let tokenized: Vec<Option<TokenizedFile>> = candidates
        .par_iter()
        .map(|(path, doc_type)| tokenize_one(path, *doc_type))
        .collect();

    let mut documents = DocumentTable::new();
    let mut accumulator = PostingAccumulator::new();
    let mut next_id: u32 = 1;
    let mut files_skipped: u32 = 0;

    for slot in tokenized {
        let Some(file) = slot else {
            files_skipped += 1;
            continue;
        };
        if file.doc_type == DocType::Code && file.tokens.is_empty() {
            continue;
        }

        let doc_id = next_id;
        next_id += 1;
        for token in &file.tokens {
            accumulator.record(&token.term, doc_id, token.line, token.meta);
        }
        documents.push(Document::new(doc_id, file.doc_type, file.path, file.t_min, file.t_max));
    }

    let documents_indexed = documents.len() as u32;
    write_index(index_dir, &documents.into_vec(), &accumulator)?;

    let elapsed = started.elapsed();
    log::info!(
        "indexed {} documents, skipped {} files in {:?}",
        documents_indexed,
        files_skipped,
        elapsed
    );

    Ok(BuildStats {
        documents_indexed,
        files_skipped,
        elapsed,
    })
}

fn tokenize_one(path: &Path, doc_type: DocType) -> Option<TokenizedFile> {
    let mut tokenizer = match Tokenizer::open(path, doc_type) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("skipping {}: {}", path.display(), e);
            return None;
        }
    };
    let path_str = path.to_string_lossy().into_owned();
    let tokens: Vec<Token> = (&mut tokenizer).collect();
    let (t_min, t_max) = tokenizer.time_bounds();
    log::debug!("tokenized {} ({} tokens)", path_str, tokens.len());

    Some(TokenizedFile {
        path: path_str,
        doc_type,
        tokens,
        t_min,
        t_max,
    })
}

fn is_pruned_entry(entry: &DirEntry, index_dir_name: &str) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .map(|name| classifier::is_pruned_dir(name, index_dir_name))
        .unwrap_or(false)
}

fn io_err(path: &Path, source: std::io::Error) -> BuildError {
    BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}
