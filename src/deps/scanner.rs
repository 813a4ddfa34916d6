use super::rules::{FALLBACK_RULES, HEADER_RULES, HeaderLibraryRule};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Upper bound on files visited by one scan, across all sources.
pub const MAX_SCANNED_FILES: usize = 1024;

static LOCAL_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*#\s*include\s*"([^"]+)""#).expect("local include pattern is valid")
});

static LINK_PRAGMA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"#\s*pragma\s+comment\s*\(\s*lib\s*,\s*"([^"]+)"\s*\)"#)
        .expect("link pragma pattern is valid")
});

/// Source of `-MM` style dependency output, used when a source file can't be read.
pub trait DependencyLister {
    fn list_dependencies(&self, sources: &[PathBuf]) -> Option<String>;
}

/// Visited files and emitted flags, shared by every file of one scan.
#[derive(Debug, Default)]
pub struct ScanState {
    visited: HashSet<PathBuf>,
    emitted: HashSet<String>,
    flags: Vec<String>,
}

impl ScanState {
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn has_visited(&self, path: &Path) -> bool {
        self.visited.contains(path)
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    fn emit(&mut self, flag: &str) {
        if self.emitted.insert(flag.to_string()) {
            tracing::debug!(flag, "auto link flag");
            self.flags.push(flag.to_string());
        }
    }
}

/// Walks sources and their local includes, collecting link flags.
pub struct LinkScanner<'a> {
    rules: &'a [HeaderLibraryRule],
    max_files: usize,
    state: ScanState,
}

impl Default for LinkScanner<'static> {
    fn default() -> Self {
        Self::new(HEADER_RULES)
    }
}

impl<'a> LinkScanner<'a> {
    pub fn new(rules: &'a [HeaderLibraryRule]) -> Self {
        Self {
            rules,
            max_files: MAX_SCANNED_FILES,
            state: ScanState::default(),
        }
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn into_flags(self) -> Vec<String> {
        self.state.flags
    }

    /// Scan one requested source and everything it includes locally.
    ///
    /// Returns `false` only when the source itself could not be read; that
    /// is the caller's cue to fall back to compiler dependency output.
    pub fn scan_source(&mut self, source: &Path) -> bool {
        let root = match fs::canonicalize(source) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(source = %source.display(), error = %e, "cannot resolve source");
                return false;
            }
        };

        let mut readable = true;
        let mut pending = vec![root.clone()];

        while let Some(path) = pending.pop() {
            if self.state.visited.contains(&path) {
                continue;
            }
            if self.state.visited.len() >= self.max_files {
                tracing::warn!(
                    limit = self.max_files,
                    "include scan limit reached, remaining headers skipped"
                );
                break;
            }
            self.state.visited.insert(path.clone());

            let text = match read_source_text(&path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(file = %path.display(), error = %e, "skipping unreadable file");
                    if path == root {
                        readable = false;
                    }
                    continue;
                }
            };

            let dir = path.parent().unwrap_or(Path::new("."));
            let includes = self.scan_text(&text);
            // Reverse so includes are visited in the order they appear.
            for include in includes.into_iter().rev() {
                match fs::canonicalize(dir.join(&include)) {
                    Ok(p) => pending.push(p),
                    Err(_) => {
                        tracing::debug!(include = %include, from = %path.display(), "local include not found")
                    }
                }
            }
        }

        readable
    }

    /// Scan text for rule hits and link pragmas. Returns local include targets.
    pub fn scan_text(&mut self, text: &str) -> Vec<String> {
        let mut includes = Vec::new();
        for line in text.lines() {
            let live = live_part(line);
            if live.trim().is_empty() {
                continue;
            }

            for rule in self.rules {
                if live.contains(rule.header) {
                    for flag in rule.flags {
                        self.state.emit(flag);
                    }
                }
            }

            for caps in LINK_PRAGMA.captures_iter(live) {
                if let Some(name) = library_name(&caps[1]) {
                    self.state.emit(&format!("-l{}", name));
                }
            }

            if let Some(caps) = LOCAL_INCLUDE.captures(live) {
                includes.push(caps[1].to_string());
            }
        }
        includes
    }

    /// Scan `-MM` output for the fallback headers only.
    pub fn scan_dependency_listing(&mut self, listing: &str) {
        for rule in FALLBACK_RULES {
            if listing.contains(rule.header) {
                for flag in rule.flags {
                    self.state.emit(flag);
                }
            }
        }
    }
}

/// Resolve automatic link flags for a set of sources.
///
/// Unreadable sources trigger at most one run of the compiler's dependency
/// listing over the whole source set.
pub fn resolve_link_flags(sources: &[PathBuf], lister: Option<&dyn DependencyLister>) -> Vec<String> {
    let mut scanner = LinkScanner::default();
    let mut fallback_done = false;

    for source in sources {
        if scanner.scan_source(source) || fallback_done {
            continue;
        }
        fallback_done = true;
        if let Some(lister) = lister {
            tracing::debug!(source = %source.display(), "falling back to compiler dependency listing");
            if let Some(listing) = lister.list_dependencies(sources) {
                scanner.scan_dependency_listing(&listing);
            }
        }
    }

    scanner.into_flags()
}

/// Part of the line before the first `//`.
fn live_part(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// `ws2_32.lib` -> `ws2_32`, `libfoo.a` -> `foo`, `m` -> `m`.
pub fn library_name(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let name = if let Some(stem) = raw.strip_suffix(".lib") {
        stem
    } else if let Some(stem) = [".a", ".so", ".dylib", ".dll"]
        .iter()
        .find_map(|suffix| raw.strip_suffix(suffix))
    {
        stem.strip_prefix("lib").filter(|s| !s.is_empty()).unwrap_or(stem)
    } else {
        raw
    };

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Read a source file, honouring UTF-8 and UTF-16LE byte-order marks.
pub fn read_source_text(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    if let Some(rest) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
        return Ok(String::from_utf8_lossy(rest).into_owned());
    }
    if let Some(rest) = bytes.strip_prefix(b"\xFF\xFE") {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        return Ok(String::from_utf16_lossy(&units));
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn count(flags: &[String], flag: &str) -> usize {
        flags.iter().filter(|f| *f == flag).count()
    }

    #[test]
    fn test_repeated_header_emits_flag_once() {
        let dir = TempDir::new().unwrap();
        let src = write(
            dir.path(),
            "main.c",
            "#include <math.h>\n#include <math.h>\nint main(void) { return 0; } /* math.h */\n",
        );
        let flags = resolve_link_flags(&[src], None);
        assert_eq!(count(&flags, "-lm"), 1);
    }

    #[test]
    fn test_line_comment_hides_header() {
        let dir = TempDir::new().unwrap();
        let src = write(
            dir.path(),
            "main.c",
            "#include <stdio.h>\n// #include <math.h>\n   //pthread.h\nint main(void) { return 0; }\n",
        );
        let flags = resolve_link_flags(&[src], None);
        assert!(flags.is_empty(), "got {:?}", flags);
    }

    #[test]
    fn test_comment_after_header_does_not_hide_it() {
        let mut scanner = LinkScanner::default();
        scanner.scan_text("#include <math.h> // needed for sqrt\n");
        assert_eq!(scanner.into_flags(), vec!["-lm".to_string()]);
    }

    #[test]
    fn test_block_comment_header_still_counts() {
        let mut scanner = LinkScanner::default();
        scanner.scan_text("/*\n#include <pthread.h>\n*/\n");
        assert_eq!(scanner.into_flags(), vec!["-lpthread".to_string()]);
    }

    #[test]
    fn test_stdio_only_has_no_flags() {
        let mut scanner = LinkScanner::default();
        let includes = scanner.scan_text("#include <stdio.h>\nint main(void) { puts(\"hi\"); }\n");
        assert!(includes.is_empty());
        assert!(scanner.into_flags().is_empty());
    }

    #[test]
    fn test_threading_header_across_two_files() {
        let dir = TempDir::new().unwrap();
        let a = write(dir.path(), "a.c", "#include <pthread.h>\n#include <pthread.h>\n");
        let b = write(dir.path(), "b.c", "#include <stdio.h>\n");
        let flags = resolve_link_flags(&[a, b], None);
        assert_eq!(flags, vec!["-lpthread".to_string()]);
    }

    #[test]
    fn test_link_pragma_deduplicated_across_files() {
        let dir = TempDir::new().unwrap();
        let a = write(
            dir.path(),
            "a.c",
            "#pragma comment(lib, \"ws2_32.lib\")\n#pragma comment(lib, \"ws2_32\")\n",
        );
        let b = write(dir.path(), "b.c", "#  pragma comment( lib , \"ws2_32.lib\" )\n");
        let flags = resolve_link_flags(&[a, b], None);
        assert_eq!(count(&flags, "-lws2_32"), 1);
    }

    #[test]
    fn test_commented_link_pragma_ignored() {
        let mut scanner = LinkScanner::default();
        scanner.scan_text("// #pragma comment(lib, \"foo.lib\")\n");
        assert!(scanner.into_flags().is_empty());
    }

    #[test]
    fn test_library_name_suffixes() {
        assert_eq!(library_name("ws2_32.lib").as_deref(), Some("ws2_32"));
        assert_eq!(library_name("libz.a").as_deref(), Some("z"));
        assert_eq!(library_name("libssl.so").as_deref(), Some("ssl"));
        assert_eq!(library_name("user32.dll").as_deref(), Some("user32"));
        assert_eq!(library_name("m").as_deref(), Some("m"));
        assert_eq!(library_name(".lib"), None);
        assert_eq!(library_name("  "), None);
    }

    #[test]
    fn test_local_include_is_followed() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("inc")).unwrap();
        write(dir.path(), "inc/geom.h", "#include <math.h>\n");
        let src = write(dir.path(), "main.c", "#include \"inc/geom.h\"\nint main(void) { return 0; }\n");
        let flags = resolve_link_flags(&[src], None);
        assert_eq!(flags, vec!["-lm".to_string()]);
    }

    #[test]
    fn test_angle_include_is_not_followed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "geom.h", "#include <math.h>\n");
        let src = write(dir.path(), "main.c", "#include <geom.h>\n");
        let mut scanner = LinkScanner::default();
        assert!(scanner.scan_source(&src));
        assert_eq!(scanner.state().visited_count(), 1);
        assert!(scanner.into_flags().is_empty());
    }

    #[test]
    fn test_include_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.h", "#include \"b.h\"\n#include <math.h>\n");
        write(dir.path(), "b.h", "#include \"a.h\"\n#include <math.h>\n#include <pthread.h>\n");
        let src = write(dir.path(), "main.c", "#include \"a.h\"\n");

        let mut scanner = LinkScanner::default();
        assert!(scanner.scan_source(&src));
        assert_eq!(scanner.state().visited_count(), 3);
        let flags = scanner.into_flags();
        assert_eq!(count(&flags, "-lm"), 1);
        assert_eq!(count(&flags, "-lpthread"), 1);
    }

    #[test]
    fn test_duplicate_sources_scanned_once() {
        let dir = TempDir::new().unwrap();
        let src = write(dir.path(), "main.c", "#include <math.h>\n");
        let mut scanner = LinkScanner::default();
        assert!(scanner.scan_source(&src));
        assert!(scanner.scan_source(&dir.path().join(".").join("main.c")));
        assert_eq!(scanner.state().visited_count(), 1);
        assert!(scanner.state().has_visited(&fs::canonicalize(&src).unwrap()));
    }

    #[test]
    fn test_file_cap_bounds_scan() {
        let dir = TempDir::new().unwrap();
        for i in 0..10 {
            write(dir.path(), &format!("h{i}.h"), &format!("#include \"h{}.h\"\n", i + 1));
        }
        write(dir.path(), "h10.h", "#include <math.h>\n");
        let src = write(dir.path(), "main.c", "#include \"h0.h\"\n");

        let mut scanner = LinkScanner::default().with_max_files(4);
        assert!(scanner.scan_source(&src));
        assert_eq!(scanner.state().visited_count(), 4);
        assert!(scanner.into_flags().is_empty());
    }

    #[test]
    fn test_missing_local_include_is_ignored() {
        let dir = TempDir::new().unwrap();
        let src = write(dir.path(), "main.c", "#include \"nope.h\"\n#include <pthread.h>\n");
        assert_eq!(resolve_link_flags(&[src], None), vec!["-lpthread".to_string()]);
    }

    struct FakeLister {
        output: &'static str,
        calls: Cell<usize>,
    }

    impl DependencyLister for FakeLister {
        fn list_dependencies(&self, _sources: &[PathBuf]) -> Option<String> {
            self.calls.set(self.calls.get() + 1);
            Some(self.output.to_string())
        }
    }

    #[test]
    fn test_unreadable_source_uses_fallback_once() {
        let dir = TempDir::new().unwrap();
        let missing_a = dir.path().join("gone_a.c");
        let missing_b = dir.path().join("gone_b.c");
        let lister = FakeLister {
            output: "gone_a.o: gone_a.c /usr/include/math.h /usr/include/dlfcn.h\n",
            calls: Cell::new(0),
        };

        let flags = resolve_link_flags(&[missing_a, missing_b], Some(&lister));
        assert_eq!(lister.calls.get(), 1);
        assert_eq!(flags, vec!["-lm".to_string()]);
    }

    #[test]
    fn test_unreadable_source_without_lister_is_silent() {
        let dir = TempDir::new().unwrap();
        let flags = resolve_link_flags(&[dir.path().join("missing.c")], None);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_read_utf8_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bom.c");
        fs::write(&path, b"\xEF\xBB\xBF#include <math.h>\n").unwrap();
        assert_eq!(read_source_text(&path).unwrap(), "#include <math.h>\n");
    }

    #[test]
    fn test_read_utf16le_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wide.c");
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "#include <pthread.h>\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        fs::write(&path, bytes).unwrap();
        assert_eq!(resolve_link_flags(&[path], None), vec!["-lpthread".to_string()]);
    }

    #[test]
    fn test_custom_rule_table_keeps_table_order() {
        const RULES: &[HeaderLibraryRule] = &[
            HeaderLibraryRule { header: "alpha.h", flags: &["-lalpha", "-lshared"] },
            HeaderLibraryRule { header: "beta.h", flags: &["-lshared", "-lbeta"] },
        ];
        let mut scanner = LinkScanner::new(RULES);
        scanner.scan_text("#include <beta.h>\n#include <alpha.h>\n");
        assert_eq!(scanner.into_flags(), vec!["-lshared", "-lbeta", "-lalpha"]);
    }
}
