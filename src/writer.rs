//! IndexWriter — serializes the accumulator into the three on-disk artifacts
//! (spec.md §4.5, §6). All integers are little-endian. Each artifact is
//! written to a temp path in the index directory and renamed into place.

use crate::accumulator::PostingAccumulator;
use crate::document::Document;
use crate::error::BuildError;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DOCS_FILE: &str = "docs.bin";
pub const INDEX_FILE: &str = "index.bin";
pub const LEXICON_FILE: &str = "lexicon.bin";

/// Maximum byte length of a lexicon term (spec.md §3): truncation is a raw
/// byte-prefix cut, which may split a multi-byte codepoint. That is the
/// documented, intentional behavior — not a bug to guard against.
const MAX_TERM_BYTES: usize = 255;

pub fn write_index(
    index_dir: &Path,
    documents: &[Document],
    accumulator: &PostingAccumulator,
) -> Result<(), BuildError> {
    write_docs(index_dir, documents)?;
    write_postings_and_lexicon(index_dir, accumulator)?;
    Ok(())
}

fn write_docs(index_dir: &Path, documents: &[Document]) -> Result<(), BuildError> {
    let final_path = index_dir.join(DOCS_FILE);
    let tmp_path = index_dir.join(format!("{DOCS_FILE}.tmp"));
    let err = |source| io_err(&final_path, source);

    let file = File::create(&tmp_path).map_err(err)?;
    let mut w = BufWriter::new(file);
    for doc in documents {
        let path_bytes = doc.path.as_bytes();
        if path_bytes.len() > u16::MAX as usize {
            return Err(BuildError::PathTooLong {
                path: PathBuf::from(&doc.path),
                len: path_bytes.len(),
            });
        }
        w.write_all(&doc.id.to_le_bytes()).map_err(err)?;
        w.write_all(&[doc.doc_type.as_byte()]).map_err(err)?;
        w.write_all(&(path_bytes.len() as u16).to_le_bytes())
            .map_err(err)?;
        w.write_all(path_bytes).map_err(err)?;
        w.write_all(&doc.t_min.to_le_bytes()).map_err(err)?;
        w.write_all(&doc.t_max.to_le_bytes()).map_err(err)?;
    }
    w.flush().map_err(err)?;
    drop(w);
    fs::rename(&tmp_path, &final_path).map_err(err)?;
    Ok(())
}

fn write_postings_and_lexicon(
    index_dir: &Path,
    accumulator: &PostingAccumulator,
) -> Result<(), BuildError> {
    let index_final = index_dir.join(INDEX_FILE);
    let index_tmp = index_dir.join(format!("{INDEX_FILE}.tmp"));
    let lex_final = index_dir.join(LEXICON_FILE);
    let lex_tmp = index_dir.join(format!("{LEXICON_FILE}.tmp"));

    let idx_err = |source| io_err(&index_final, source);
    let lex_err = |source| io_err(&lex_final, source);

    let mut idx_w = BufWriter::new(File::create(&index_tmp).map_err(idx_err)?);
    let mut lex_w = BufWriter::new(File::create(&lex_tmp).map_err(lex_err)?);

    let mut offset: u64 = 0;
    for term in accumulator.terms_sorted() {
        let postings = accumulator.postings_for(term);
        let start_offset = offset;

        for (doc_id, builder) in &postings {
            idx_w.write_all(&doc_id.to_le_bytes()).map_err(idx_err)?;
            idx_w.write_all(&builder.freq.to_le_bytes()).map_err(idx_err)?;
            idx_w.write_all(&[builder.meta.0]).map_err(idx_err)?;
            idx_w
                .write_all(&(builder.positions.len() as u32).to_le_bytes())
                .map_err(idx_err)?;
            for &pos in &builder.positions {
                idx_w.write_all(&pos.to_le_bytes()).map_err(idx_err)?;
            }
            offset += 13 + 4 * builder.positions.len() as u64;
        }

        let term_bytes = truncate_term(term);
        lex_w
            .write_all(&[term_bytes.len() as u8])
            .map_err(lex_err)?;
        lex_w.write_all(term_bytes).map_err(lex_err)?;
        lex_w
            .write_all(&(postings.len() as u32).to_le_bytes())
            .map_err(lex_err)?;
        lex_w.write_all(&start_offset.to_le_bytes()).map_err(lex_err)?;
        lex_w.write_all(&0u32.to_le_bytes()).map_err(lex_err)?;
    }

    idx_w.flush().map_err(idx_err)?;
    lex_w.flush().map_err(lex_err)?;
    drop(idx_w);
    drop(lex_w);
    fs::rename(&index_tmp, &index_final).map_err(idx_err)?;
    fs::rename(&lex_tmp, &lex_final).map_err(lex_err)?;
    Ok(())
}

fn truncate_term(term: &str) -> &[u8] {
    let bytes = term.as_bytes();
    if bytes.len() <= MAX_TERM_BYTES {
        bytes
    } else {
        &bytes[..MAX_TERM_BYTES]
    }
}

fn io_err(path: &Path, source: std::io::Error) -> BuildError {
    BuildError::Io {
        path: PathBuf::from(path),
        source,
    }
}
