//! IndexReader — loads documents and lexicon, and fetches postings by
//! random access (spec.md §4.6).

use crate::document::{DocType, Document, MetaMask};
use crate::error::SearchError;
use crate::writer::{DOCS_FILE, INDEX_FILE, LEXICON_FILE};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct LexEntry {
    pub df: u32,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct Posting {
    pub doc_id: u32,
    pub freq: u32,
    pub meta: MetaMask,
    pub positions: Vec<u32>,
}

/// Stream `docs.bin` from byte 0 to EOF into a map keyed by doc id.
pub fn load_documents(index_dir: &Path) -> Result<FxHashMap<u32, Document>, SearchError> {
    let path = index_dir.join(DOCS_FILE);
    let file = File::open(&path).map_err(|e| io_err(DOCS_FILE, e))?;
    let mut r = BufReader::new(file);
    let mut docs = FxHashMap::default();
    let mut offset: u64 = 0;

    loop {
        let mut header = [0u8; 7]; // doc_id(4) + type(1) + path_len(2)
        if !read_or_eof(&mut r, DOCS_FILE, offset, &mut header)? {
            break;
        }
        let id = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let doc_type = DocType::from_byte(header[4])
            .ok_or_else(|| malformed(DOCS_FILE, offset + 4, "unrecognized doc type byte"))?;
        let path_len = u16::from_le_bytes(header[5..7].try_into().unwrap()) as usize;
        offset += 7;

        let mut path_bytes = vec![0u8; path_len];
        read_exact_field(&mut r, DOCS_FILE, offset, &mut path_bytes, "path")?;
        offset += path_len as u64;
        let path_str = String::from_utf8(path_bytes)
            .map_err(|_| malformed(DOCS_FILE, offset, "invalid utf-8 in path"))?;

        let mut times = [0u8; 16];
        read_exact_field(&mut r, DOCS_FILE, offset, &mut times, "t_min/t_max")?;
        offset += 16;
        let t_min = i64::from_le_bytes(times[0..8].try_into().unwrap());
        let t_max = i64::from_le_bytes(times[8..16].try_into().unwrap());

        docs.insert(id, Document::new(id, doc_type, path_str, t_min, t_max));
    }

    Ok(docs)
}

/// Stream `lexicon.bin` into a map keyed by term. If a term appears more
/// than once (it shouldn't), the last record wins.
pub fn load_lexicon(index_dir: &Path) -> Result<FxHashMap<String, LexEntry>, SearchError> {
    let path = index_dir.join(LEXICON_FILE);
    let file = File::open(&path).map_err(|e| io_err(LEXICON_FILE, e))?;
    let mut r = BufReader::new(file);
    let mut lex = FxHashMap::default();
    let mut offset: u64 = 0;

    loop {
        let mut len_buf = [0u8; 1];
        if !read_or_eof(&mut r, LEXICON_FILE, offset, &mut len_buf)? {
            break;
        }
        let term_len = len_buf[0] as usize;
        offset += 1;

        let mut term_bytes = vec![0u8; term_len];
        read_exact_field(&mut r, LEXICON_FILE, offset, &mut term_bytes, "term")?;
        offset += term_len as u64;
        let term = String::from_utf8(term_bytes)
            .map_err(|_| malformed(LEXICON_FILE, offset, "invalid utf-8 in term (truncated mid-codepoint)"))?;

        let mut rest = [0u8; 16]; // df(4) + offset(8) + reserved(4)
        read_exact_field(&mut r, LEXICON_FILE, offset, &mut rest, "lexicon entry tail")?;
        offset += 16;
        let df = u32::from_le_bytes(rest[0..4].try_into().unwrap());
        let posting_offset = u64::from_le_bytes(rest[4..12].try_into().unwrap());

        lex.insert(term, LexEntry { df, offset: posting_offset });
    }

    Ok(lex)
}

/// Random-access reader over `index.bin`.
pub struct PostingsFile {
    file: File,
}

impl PostingsFile {
    pub fn open(index_dir: &Path) -> Result<Self, SearchError> {
        let file = File::open(index_dir.join(INDEX_FILE)).map_err(|e| io_err(INDEX_FILE, e))?;
        Ok(Self { file })
    }

    /// Seek to `offset` and read `df` posting records sequentially.
    pub fn fetch(&mut self, offset: u64, df: u32) -> Result<Vec<Posting>, SearchError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| io_err(INDEX_FILE, e))?;

        let mut postings = Vec::with_capacity(df as usize);
        let mut cursor = offset;

        for _ in 0..df {
            let mut header = [0u8; 13]; // doc_id(4) + freq(4) + meta(1) + pos_count(4)
            read_exact_field(&mut self.file, INDEX_FILE, cursor, &mut header, "posting header")?;
            let doc_id = u32::from_le_bytes(header[0..4].try_into().unwrap());
            let freq = u32::from_le_bytes(header[4..8].try_into().unwrap());
            let meta = MetaMask(header[8]);
            let pos_count = u32::from_le_bytes(header[9..13].try_into().unwrap());
            cursor += 13;

            let mut positions = Vec::with_capacity(pos_count as usize);
            for _ in 0..pos_count {
                let mut pos_buf = [0u8; 4];
                read_exact_field(&mut self.file, INDEX_FILE, cursor, &mut pos_buf, "position")?;
                positions.push(u32::from_le_bytes(pos_buf));
                cursor += 4;
            }

            postings.push(Posting {
                doc_id,
                freq,
                meta,
                positions,
            });
        }

        Ok(postings)
    }
}

/// Read `buf.len()` bytes, or confirm clean EOF if nothing at all was read.
/// A partial read (some bytes then EOF) is malformed, not a clean end.
fn read_or_eof<R: Read>(
    r: &mut R,
    file: &str,
    offset: u64,
    buf: &mut [u8],
) -> Result<bool, SearchError> {
    let mut read = 0;
    while read < buf.len() {
        let n = r
            .read(&mut buf[read..])
            .map_err(|e| SearchError::Io { file: file.to_string(), source: e })?;
        if n == 0 {
            if read == 0 {
                return Ok(false);
            }
            return Err(malformed(file, offset, "truncated record"));
        }
        read += n;
    }
    Ok(true)
}

fn read_exact_field<R: Read>(
    r: &mut R,
    file: &str,
    offset: u64,
    buf: &mut [u8],
    what: &str,
) -> Result<(), SearchError> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            malformed(file, offset, &format!("truncated {what}"))
        } else {
            SearchError::Io { file: file.to_string(), source: e }
        }
    })
}

fn malformed(file: &str, offset: u64, detail: &str) -> SearchError {
    SearchError::Malformed {
        file: file.to_string(),
        offset,
        detail: detail.to_string(),
    }
}

fn io_err(file: &str, source: std::io::Error) -> SearchError {
    SearchError::Io { file: file.to_string(), source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::PostingAccumulator;
    use crate::writer::write_index;

    #[test]
    fn round_trips_documents_and_lexicon() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![
            Document::new(1, DocType::Code, "a.py".into(), 0, 0),
            Document::new(2, DocType::Log, "b.log".into(), 100, 200),
        ];
        let mut acc = PostingAccumulator::new();
        acc.record("foo", 1, 1, MetaMask::NONE);
        acc.record("foo", 2, 5, MetaMask::NONE.with(MetaMask::LOG_ERROR));
        acc.record("bar", 1, 2, MetaMask::NONE);

        write_index(dir.path(), &docs, &acc).unwrap();

        let loaded_docs = load_documents(dir.path()).unwrap();
        assert_eq!(loaded_docs.len(), 2);
        assert_eq!(loaded_docs[&2].path, "b.log");
        assert_eq!(loaded_docs[&2].t_min, 100);
        assert_eq!(loaded_docs[&2].t_max, 200);

        let lex = load_lexicon(dir.path()).unwrap();
        assert_eq!(lex.len(), 2);
        assert_eq!(lex["foo"].df, 2);
        assert_eq!(lex["bar"].df, 1);

        let mut postings_file = PostingsFile::open(dir.path()).unwrap();
        let foo_postings = postings_file.fetch(lex["foo"].offset, lex["foo"].df).unwrap();
        assert_eq!(foo_postings.len(), 2);
        assert_eq!(foo_postings[0].doc_id, 1);
        assert_eq!(foo_postings[0].positions, vec![1]);
        assert_eq!(foo_postings[1].doc_id, 2);
        assert!(foo_postings[1].meta.contains(MetaMask::LOG_ERROR));
    }

    #[test]
    fn lexicon_is_sorted_ascending_by_byte_lex_order() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![Document::new(1, DocType::Code, "a.py".into(), 0, 0)];
        let mut acc = PostingAccumulator::new();
        for term in ["zeta", "alpha", "mid"] {
            acc.record(term, 1, 1, MetaMask::NONE);
        }
        write_index(dir.path(), &docs, &acc).unwrap();

        let raw = std::fs::read(dir.path().join(LEXICON_FILE)).unwrap();
        let mut offset = 0;
        let mut seen = Vec::new();
        while offset < raw.len() {
            let len = raw[offset] as usize;
            offset += 1;
            seen.push(String::from_utf8(raw[offset..offset + len].to_vec()).unwrap());
            offset += len + 16;
        }
        assert_eq!(seen, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn missing_index_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_documents(dir.path());
        assert!(result.is_err());
    }
}
