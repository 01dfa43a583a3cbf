//! Error taxonomy (spec.md §7).
//!
//! `SkipFile` is not a type here — it is recovered locally in the build loop
//! as a logged warning. `UnknownTerm` and `InvalidQuery` are not types either
//! — they are absorbed as zero-contribution outcomes by the planner/scorer.
//! Only the two phases that can fail *fatally* get an error enum, mirroring
//! the teacher crate's `IndexError`/`SearchError` split.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("io error indexing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path too long to encode in docs.bin ({len} bytes, max {max}): {path}", max = u16::MAX)]
    PathTooLong { path: PathBuf, len: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("io error reading {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed index artifact {file} at byte offset {offset}: {detail}")]
    Malformed {
        file: String,
        offset: u64,
        detail: String,
    },
}
