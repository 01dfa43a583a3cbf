//! FileClassifier — maps a filesystem entry to a document type or rejects it.

use crate::document::DocType;
use std::path::Path;

/// Directory names pruned at every level of the build walk, in addition to
/// the caller-supplied index output directory name (spec.md §4.1).
pub const PRUNED_DIR_NAMES: [&str; 2] = [".git", "node_modules"];

/// Classify a path by its lowercased extension. Returns `None` for anything
/// not in the supported extension set, which the walker treats as a skip.
pub fn classify(path: &Path) -> Option<DocType> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "log" => Some(DocType::Log),
        "go" | "py" | "js" | "ts" | "c" | "cpp" | "java" | "md" | "txt" | "json" => {
            Some(DocType::Code)
        }
        _ => None,
    }
}

/// Whether a directory entry name should be pruned from the walk.
///
/// `index_dir_name` is the file name component of the configured index
/// output directory (e.g. `.devscope`), passed explicitly rather than
/// hard-coded — spec.md §9 calls out the output directory as a parameter,
/// not a process-wide constant.
pub fn is_pruned_dir(name: &str, index_dir_name: &str) -> bool {
    PRUNED_DIR_NAMES.contains(&name) || name == index_dir_name
}
