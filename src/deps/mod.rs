//! Automatic link-library detection.
//!
//! Sources and the headers they include with `#include "..."` are scanned as
//! plain text. Known header names and `#pragma comment(lib, "...")` lines
//! become `-l` flags, each emitted once per run.
//!
//! This is a textual heuristic, not a preprocessor: only `//` comments are
//! honoured, and a header name inside a `/* ... */` block still counts.

pub mod rules;
pub mod scanner;

pub use rules::{FALLBACK_RULES, HEADER_RULES, HeaderLibraryRule};
pub use scanner::{
    DependencyLister, LinkScanner, MAX_SCANNED_FILES, ScanState, read_source_text,
    resolve_link_flags,
};
