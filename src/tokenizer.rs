//! Streaming tokenizer — emits position- and metadata-annotated term
//! occurrences from a single file (spec.md §4.2).
//!
//! Terms are matched case-sensitively against `[A-Za-z_][A-Za-z0-9_]*`; unlike
//! a typical search tokenizer this engine never lowercases, since the lexicon
//! is meant to support exact-identifier lookups in source code.

use crate::document::{DocType, MetaMask};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

const FUNC_KEYWORDS: [&str; 5] = ["func", "def", "function", "class", "struct"];

/// One emitted `(term, line, meta)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub line: u32,
    pub meta: MetaMask,
}

/// Lazily drains a file one line at a time, yielding `Token`s in file order
/// (line, then intra-line left-to-right). Non-restartable: once drained, the
/// underlying reader is exhausted.
pub struct Tokenizer {
    reader: Option<BufReader<File>>,
    doc_type: DocType,
    line_no: u32,
    pending: VecDeque<Token>,
    t_min: i64,
    t_max: i64,
}

impl Tokenizer {
    /// Open `path` for tokenization. IO failure is reported to the caller
    /// (not fatal) — an `Err` here means "skip this file", handled by the
    /// build orchestrator per spec.md §7 `SkipFile`.
    pub fn open(path: &Path, doc_type: DocType) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: Some(BufReader::new(file)),
            doc_type,
            line_no: 0,
            pending: VecDeque::new(),
            t_min: 0,
            t_max: 0,
        })
    }

    /// `(t_min, t_max)` accumulated so far. Meaningful only once the iterator
    /// has been fully drained.
    pub fn time_bounds(&self) -> (i64, i64) {
        (self.t_min, self.t_max)
    }

    /// Read the next line, lossily decoding invalid UTF-8 (spec.md §4.2).
    /// Returns `None` at EOF, dropping the reader so the file handle closes
    /// as soon as the tokenizer is drained, not only when it is.
    fn read_line(&mut self) -> Option<String> {
        let reader = self.reader.as_mut()?;
        let mut buf = Vec::new();
        let n = reader.read_until(b'\n', &mut buf).unwrap_or(0);
        if n == 0 {
            self.reader = None;
            return None;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Some(String::from_utf8_lossy(&buf).into_owned())
    }

    fn process_line(&mut self, line: &str) {
        self.line_no += 1;
        let idents = scan_identifiers(line);

        let line_meta = match self.doc_type {
            DocType::Log => {
                if let Some(ts) = parse_log_timestamp(line) {
                    if self.t_min == 0 || ts < self.t_min {
                        self.t_min = ts;
                    }
                    if ts > self.t_max {
                        self.t_max = ts;
                    }
                }
                let upper = line.to_uppercase();
                if upper.contains("ERROR") {
                    MetaMask::NONE.with(MetaMask::LOG_ERROR)
                } else if upper.contains("WARN") {
                    MetaMask::NONE.with(MetaMask::LOG_WARN)
                } else {
                    MetaMask::NONE
                }
            }
            DocType::Code => MetaMask::NONE,
        };

        let func_name = match self.doc_type {
            DocType::Code => detect_func_name(line),
            DocType::Log => None,
        };

        for (start, end) in idents {
            let term = &line[start..end];
            let mut meta = line_meta;
            if let Some(ref name) = func_name {
                if term == name {
                    meta |= MetaMask::NONE.with(MetaMask::IN_FUNCNAME);
                }
            }
            self.pending.push_back(Token {
                term: term.to_string(),
                line: self.line_no,
                meta,
            });
        }
    }
}

impl Iterator for Tokenizer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(tok) = self.pending.pop_front() {
                return Some(tok);
            }
            match self.read_line() {
                Some(line) => self.process_line(&line),
                None => return None,
            }
        }
    }
}

/// Scan `line` for `[A-Za-z_][A-Za-z0-9_]*` matches, returning byte ranges.
/// ASCII-only classes, so byte offsets are always valid UTF-8 boundaries even
/// though `line` may contain multi-byte codepoints elsewhere.
fn scan_identifiers(line: &str) -> Vec<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_alphabetic() || b == b'_' {
            let start = i;
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            out.push((start, i));
        } else {
            i += 1;
        }
    }
    out
}

/// First match of `(func|def|function|class|struct)\s+([A-Za-z_][A-Za-z0-9_]*)`
/// in the line, returning the captured name.
///
/// The regex has no word-boundary anchor, so a keyword match is a raw
/// substring search, not a whole-token comparison: `"typedef struct Foo {"`
/// matches the `def` suffix of `typedef` (followed by the whitespace before
/// `struct`), capturing `"struct"` rather than `"Foo"` — exactly as
/// `re.search` resolves it. Scan left to right; at each byte offset try each
/// keyword in listed order (mirroring alternation backtracking), and take
/// the first offset/keyword whose match is immediately followed by `\s+`
/// then an identifier.
fn detect_func_name(line: &str) -> Option<String> {
    let bytes = line.as_bytes();
    let n = bytes.len();
    for i in 0..n {
        for kw in FUNC_KEYWORDS {
            let kwb = kw.as_bytes();
            let end = i + kwb.len();
            if end > n || &bytes[i..end] != kwb {
                continue;
            }
            let ws_start = end;
            let mut ws_end = ws_start;
            while ws_end < n && bytes[ws_end].is_ascii_whitespace() {
                ws_end += 1;
            }
            if ws_end == ws_start {
                continue;
            }
            if ws_end < n && (bytes[ws_end].is_ascii_alphabetic() || bytes[ws_end] == b'_') {
                let start = ws_end;
                let mut ident_end = start + 1;
                while ident_end < n
                    && (bytes[ident_end].is_ascii_alphanumeric() || bytes[ident_end] == b'_')
                {
                    ident_end += 1;
                }
                return Some(line[start..ident_end].to_string());
            }
        }
    }
    None
}

/// Parse the timestamp embedded in the first 19 characters of a log line,
/// replacing the space at position 10 with `T` before matching the exact
/// format `YYYY-MM-DDTHH:MM:SS` (spec.md §4.2). Returns `None` unless the
/// parse succeeds with a positive unix timestamp.
fn parse_log_timestamp(line: &str) -> Option<i64> {
    let chars: Vec<char> = line.chars().take(19).collect();
    if chars.len() < 19 {
        return None;
    }
    let mut chunk = chars;
    if chunk[10] == ' ' {
        chunk[10] = 'T';
    }
    let chunk: String = chunk.into_iter().collect();

    let naive = chrono::NaiveDateTime::parse_from_str(&chunk, "%Y-%m-%dT%H:%M:%S").ok()?;
    let ts = naive.and_utc().timestamp();
    if ts > 0 {
        Some(ts)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tokenize_all(text: &str, doc_type: DocType) -> (Vec<Token>, (i64, i64)) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        let mut tok = Tokenizer::open(file.path(), doc_type).unwrap();
        let tokens: Vec<Token> = (&mut tok).collect();
        (tokens, tok.time_bounds())
    }

    #[test]
    fn code_function_definition_sets_in_funcname_on_every_occurrence() {
        let (tokens, _) = tokenize_all("def foo():\n    foo()\n", DocType::Code);
        let terms: Vec<&str> = tokens.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["def", "foo", "foo"]);
        assert!(tokens[1].meta.contains(MetaMask::IN_FUNCNAME));
        assert!(!tokens[0].meta.contains(MetaMask::IN_FUNCNAME));
        assert!(!tokens[2].meta.contains(MetaMask::IN_FUNCNAME));
    }

    #[test]
    fn func_keyword_match_is_an_unanchored_substring_not_a_whole_token() {
        // "typedef" contains "def" as a trailing substring; the regex has no
        // word-boundary anchor, so it matches there and captures the next
        // identifier after the whitespace ("struct"), not "Foo".
        let (tokens, _) = tokenize_all("typedef struct Foo {\n", DocType::Code);
        let struct_tok = tokens.iter().find(|t| t.term == "struct").unwrap();
        let foo_tok = tokens.iter().find(|t| t.term == "Foo").unwrap();
        assert!(struct_tok.meta.contains(MetaMask::IN_FUNCNAME));
        assert!(!foo_tok.meta.contains(MetaMask::IN_FUNCNAME));
    }

    #[test]
    fn identifiers_are_case_sensitive() {
        let (tokens, _) = tokenize_all("Foo foo FOO\n", DocType::Code);
        let terms: Vec<&str> = tokens.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(terms, vec!["Foo", "foo", "FOO"]);
    }

    #[test]
    fn log_error_excludes_warn() {
        let (tokens, _) = tokenize_all("2025-12-20T10:00:00 ERROR and WARN both present\n", DocType::Log);
        assert!(tokens[0].meta.contains(MetaMask::LOG_ERROR));
        assert!(!tokens[0].meta.contains(MetaMask::LOG_WARN));
    }

    #[test]
    fn log_warn_without_error() {
        let (tokens, _) = tokenize_all("2025-12-20T10:00:01 WARN soft\n", DocType::Log);
        assert!(tokens[0].meta.contains(MetaMask::LOG_WARN));
        assert!(!tokens[0].meta.contains(MetaMask::LOG_ERROR));
    }

    #[test]
    fn log_time_bounds_span_min_and_max() {
        let (_, (t_min, t_max)) = tokenize_all(
            "2025-12-20T10:00:00 ERROR boom\n2025-12-20T10:00:01 WARN soft\n",
            DocType::Log,
        );
        assert!(t_min > 0);
        assert!(t_max >= t_min);
    }

    #[test]
    fn final_line_without_trailing_newline_still_counts() {
        let (tokens, _) = tokenize_all("one\ntwo", DocType::Code);
        assert_eq!(tokens.last().unwrap().line, 2);
    }

    #[test]
    fn missing_file_is_reported_not_fatal() {
        let result = Tokenizer::open(Path::new("/nonexistent/path/x.py"), DocType::Code);
        assert!(result.is_err());
    }
}
