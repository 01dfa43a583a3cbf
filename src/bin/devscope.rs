//! devscope CLI - thin dispatcher over the engine facade (spec.md §1, §6).

use devscope::{build_index, search, BuildError, SearchError, INDEX_DIR_NAME};
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const MAX_SNIPPET_CHARS: usize = 200;

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("index") => match args.get(2) {
            Some(path) => run_index(Path::new(path)),
            None => {
                print_usage();
                ExitCode::FAILURE
            }
        },
        Some("search") if args.len() > 2 => run_search(&args[2..]),
        _ => {
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  devscope index <path>");
    eprintln!("  devscope search <query...>");
}

fn run_index(root: &Path) -> ExitCode {
    let index_dir = root.join(INDEX_DIR_NAME);
    match build_index(root, &index_dir) {
        Ok(stats) => {
            println!(
                "indexed {} document(s), skipped {} file(s) in {:.2?}",
                stats.documents_indexed, stats.files_skipped, stats.elapsed
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", format_build_error(&e));
            ExitCode::FAILURE
        }
    }
}

fn run_search(query_args: &[String]) -> ExitCode {
    let query = query_args.join(" ");
    let root = PathBuf::from(".");
    let index_dir = root.join(INDEX_DIR_NAME);

    match search(&query, &index_dir) {
        Ok(outcome) => {
            println!("Found {} results.\n", outcome.hits.len());
            for hit in &outcome.hits {
                println!("{} (Score: {:.2})", hit.path, hit.score);
                if let Some((line, snippet)) = find_snippet(&hit.path, &query) {
                    println!("  {}: {}", line, snippet);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", format_search_error(&e));
            ExitCode::FAILURE
        }
    }
}

/// Re-open the source file and return the first line containing any query
/// term as a substring, right-stripped and truncated to 200 characters
/// (spec.md §6). Terms are matched case-sensitively, consistent with the
/// tokenizer's own lookup semantics.
fn find_snippet(path: &str, query: &str) -> Option<(u32, String)> {
    let terms: Vec<&str> = query
        .split_whitespace()
        .filter(|t| !t.starts_with("ext:") && !t.starts_with("level:"))
        .collect();
    if terms.is_empty() {
        return None;
    }

    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let mut line_no = 0u32;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).ok()?;
        if n == 0 {
            return None;
        }
        line_no += 1;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        let line = String::from_utf8_lossy(&buf);
        if terms.iter().any(|t| line.contains(t)) {
            let trimmed = line.trim_end();
            let snippet: String = trimmed.chars().take(MAX_SNIPPET_CHARS).collect();
            return Some((line_no, snippet));
        }
    }
}

fn format_build_error(e: &BuildError) -> String {
    match e {
        BuildError::Io { path, source } => format!("io error at {}: {}", path.display(), source),
        BuildError::PathTooLong { path, len } => {
            format!("path too long to index ({len} bytes, max {}): {}", u16::MAX, path.display())
        }
    }
}

fn format_search_error(e: &SearchError) -> String {
    match e {
        SearchError::Io { file, source } => format!("io error reading {}: {}", file, source),
        SearchError::Malformed { file, offset, detail } => {
            format!("malformed index artifact {} at byte {}: {}", file, offset, detail)
        }
    }
}
