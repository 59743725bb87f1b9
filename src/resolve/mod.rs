//! Glob resolution: include/exclude pattern sets → concrete file lists.
//!
//! Each resolved entry is a `{base, dir, name}` triple: `base` is the
//! directory that came from a pattern's fixed prefix, `dir` the matched
//! sub-directory structure (empty when flattened), `name` the file name.
//! Copy targets use `dir` to re-create nested source layouts under the
//! destination; combine targets always flatten.
//!
//! Resolution is deterministic: expansion of a single pattern is sorted,
//! pattern order is preserved, and duplicates are dropped on first sight.

mod prefix;

pub use prefix::{base_regex, has_meta, literal_prefix};

use anyhow::{Context, Result};
use globset::GlobBuilder;
use jwalk::WalkDir;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

use crate::debug;

// ============================================================================
// Resolved entries
// ============================================================================

/// One file produced by include-pattern expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Base directory (absolute), from the pattern's fixed prefix.
    pub base: PathBuf,
    /// Sub-directory between base and file name; empty when flattened.
    pub dir: PathBuf,
    /// File name.
    pub name: String,
    /// Staging namespace for tree-style compilation.
    pub namespace: Option<String>,
}

impl ResolvedFile {
    /// Full source path (`base/dir/name`).
    pub fn path(&self) -> PathBuf {
        self.base.join(&self.dir).join(&self.name)
    }

    /// Destination-relative path (`dir/name`).
    pub fn rel_dest(&self) -> PathBuf {
        self.dir.join(&self.name)
    }
}

/// An include pattern, optionally tagged with a staging namespace.
#[derive(Debug, Clone)]
pub enum Include {
    Plain(String),
    Namespaced { namespace: String, pattern: String },
}

impl Include {
    fn pattern(&self) -> &str {
        match self {
            Self::Plain(p) => p,
            Self::Namespaced { pattern, .. } => pattern,
        }
    }

    fn namespace(&self) -> Option<&str> {
        match self {
            Self::Plain(_) => None,
            Self::Namespaced { namespace, .. } => Some(namespace),
        }
    }
}

// ============================================================================
// Resolution request (supports deferred evaluation)
// ============================================================================

/// A reusable description of what to resolve.
///
/// Copy targets keep the request around so a pattern that matches nothing
/// at target-construction time can be retried at write time, picking up
/// files produced earlier in the same run.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub root: PathBuf,
    pub includes: Vec<Include>,
    pub excludes: Vec<String>,
    pub preserve_dirs: bool,
}

impl ResolveRequest {
    pub fn new(root: &Path, includes: Vec<Include>, excludes: Vec<String>) -> Self {
        Self {
            root: root.to_path_buf(),
            includes,
            excludes,
            preserve_dirs: false,
        }
    }

    pub fn preserve_dirs(mut self, preserve: bool) -> Self {
        self.preserve_dirs = preserve;
        self
    }

    /// Expand includes, subtract excludes, deduplicate.
    pub fn resolve(&self) -> Vec<ResolvedFile> {
        let mut files = Vec::new();
        let mut seen = FxHashSet::default();

        for include in &self.includes {
            let matched = match expand_pattern(&self.root, include.pattern()) {
                Ok(matched) => matched,
                Err(e) => {
                    crate::log!("warn"; "bad include pattern `{}`: {e:#}", include.pattern());
                    continue;
                }
            };

            for path in matched {
                let entry = if self.preserve_dirs && include.pattern().contains("**") {
                    split_preserved(&self.root, include.pattern(), &path)
                } else {
                    split_flat(&path)
                };

                let Some(mut entry) = entry else { continue };
                entry.namespace = include.namespace().map(str::to_owned);

                if seen.insert(entry.path()) {
                    files.push(entry);
                }
            }
        }

        // Excludes apply after include expansion, by exact path match,
        // even when a path was matched by several include patterns.
        let excluded = self.excluded_paths();
        if !excluded.is_empty() {
            files.retain(|f| !excluded.contains(&f.path()));
        }

        files
    }

    fn excluded_paths(&self) -> FxHashSet<PathBuf> {
        let mut excluded = FxHashSet::default();
        for pattern in &self.excludes {
            match expand_pattern(&self.root, pattern) {
                Ok(matched) => excluded.extend(matched),
                Err(e) => crate::log!("warn"; "bad exclude pattern `{pattern}`: {e:#}"),
            }
        }
        excluded
    }
}

/// A file set that is either resolved now or re-resolved lazily.
#[derive(Debug, Clone)]
pub enum FileSet {
    Resolved(Vec<ResolvedFile>),
    Pending(ResolveRequest),
}

impl FileSet {
    /// Resolve eagerly; fall back to a pending request when nothing
    /// matched yet (the files may appear later in the same run).
    pub fn eager_or_pending(request: ResolveRequest) -> Self {
        let files = request.resolve();
        if files.is_empty() && !request.includes.is_empty() {
            debug!("resolve"; "no matches yet, deferring resolution");
            Self::Pending(request)
        } else {
            Self::Resolved(files)
        }
    }

    /// Current file list, re-running the resolver for pending sets.
    pub fn materialize(&self) -> Vec<ResolvedFile> {
        match self {
            Self::Resolved(files) => files.clone(),
            Self::Pending(request) => request.resolve(),
        }
    }
}

// ============================================================================
// Pattern expansion
// ============================================================================

/// Expand one glob pattern against the project root.
///
/// Returns absolute paths of matching regular files, sorted. A pattern that
/// matches nothing yields an empty list, never an error.
pub fn expand_pattern(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    // Literal pattern: a plain existence check, no walking.
    if !pattern.split('/').any(has_meta) {
        let path = root.join(pattern);
        return Ok(if path.is_file() { vec![path] } else { vec![] });
    }

    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob `{pattern}`"))?
        .compile_matcher();

    let walk_root = {
        let prefix = literal_prefix(pattern);
        if prefix.is_empty() {
            root.to_path_buf()
        } else {
            root.join(prefix)
        }
    };
    if !walk_root.is_dir() {
        return Ok(vec![]);
    }

    let mut matched: Vec<PathBuf> = WalkDir::new(&walk_root)
        .skip_hidden(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|path| {
            path.strip_prefix(root)
                .map(|rel| matcher.is_match(rel))
                .unwrap_or(false)
        })
        .collect();
    matched.sort();

    Ok(matched)
}

/// Flatten a matched path: base = parent, dir = "", name = basename.
fn split_flat(path: &Path) -> Option<ResolvedFile> {
    let name = path.file_name()?.to_str()?.to_owned();
    let base = path.parent()?.to_path_buf();
    Some(ResolvedFile {
        base,
        dir: PathBuf::new(),
        name,
        namespace: None,
    })
}

/// Split a matched path into base (pattern's fixed prefix as present on
/// disk) and the matched sub-directory structure.
fn split_preserved(root: &Path, pattern: &str, path: &Path) -> Option<ResolvedFile> {
    let rel = path.strip_prefix(root).ok()?.to_str()?;

    let re = match base_regex(pattern) {
        Ok(re) => re,
        Err(e) => {
            crate::log!("warn"; "{e:#}");
            return split_flat(path);
        }
    };
    let Some(base_match) = re.find(rel) else {
        return split_flat(path);
    };

    let base = root.join(base_match.as_str());
    let rest = Path::new(&rel[base_match.end()..]);
    let name = rest.file_name()?.to_str()?.to_owned();
    let dir = rest.parent().map(Path::to_path_buf).unwrap_or_default();

    Some(ResolvedFile {
        base,
        dir,
        name,
        namespace: None,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, rel).unwrap();
    }

    fn names(files: &[ResolvedFile]) -> Vec<String> {
        files.iter().map(|f| f.name.clone()).collect()
    }

    #[test]
    fn test_expand_literal_pattern() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "js/a.js");

        let matched = expand_pattern(dir.path(), "js/a.js").unwrap();
        assert_eq!(matched, vec![dir.path().join("js/a.js")]);

        let missing = expand_pattern(dir.path(), "js/missing.js").unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn test_expand_star_does_not_recurse() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "js/a.js");
        touch(dir.path(), "js/sub/b.js");

        let matched = expand_pattern(dir.path(), "js/*.js").unwrap();
        assert_eq!(matched, vec![dir.path().join("js/a.js")]);

        let recursive = expand_pattern(dir.path(), "js/**/*.js").unwrap();
        assert_eq!(recursive.len(), 2);
    }

    #[test]
    fn test_resolve_order_and_dedup() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "js/a.js");
        touch(dir.path(), "js/b.js");

        // b.js is matched by both patterns; it must appear once, at its
        // first position.
        let request = ResolveRequest::new(
            dir.path(),
            vec![
                Include::Plain("js/b.js".into()),
                Include::Plain("js/*.js".into()),
            ],
            vec![],
        );
        let files = request.resolve();
        assert_eq!(names(&files), vec!["b.js", "a.js"]);
    }

    #[test]
    fn test_resolve_excludes_win() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "js/a.js");
        touch(dir.path(), "js/b.js");

        let request = ResolveRequest::new(
            dir.path(),
            vec![
                Include::Plain("js/*.js".into()),
                Include::Plain("js/b.js".into()), // matched twice, still excluded
            ],
            vec!["js/b.js".into()],
        );
        let files = request.resolve();
        assert_eq!(names(&files), vec!["a.js"]);
    }

    #[test]
    fn test_resolve_preserve_dirs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "assets/fonts/serif/a.woff2");
        touch(dir.path(), "assets/fonts/b.woff2");

        let request = ResolveRequest::new(
            dir.path(),
            vec![Include::Plain("assets/fonts/**/*.woff2".into())],
            vec![],
        )
        .preserve_dirs(true);
        let files = request.resolve();

        let serif = files.iter().find(|f| f.name == "a.woff2").unwrap();
        assert_eq!(serif.base, dir.path().join("assets/fonts/"));
        assert_eq!(serif.dir, PathBuf::from("serif"));
        assert_eq!(serif.rel_dest(), PathBuf::from("serif/a.woff2"));

        let flat = files.iter().find(|f| f.name == "b.woff2").unwrap();
        assert_eq!(flat.dir, PathBuf::new());
    }

    #[test]
    fn test_resolve_flatten_ignores_structure() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "assets/fonts/serif/a.woff2");

        let request = ResolveRequest::new(
            dir.path(),
            vec![Include::Plain("assets/fonts/**/*.woff2".into())],
            vec![],
        );
        let files = request.resolve();
        assert_eq!(files[0].dir, PathBuf::new());
        assert_eq!(files[0].base, dir.path().join("assets/fonts/serif"));
    }

    #[test]
    fn test_resolve_namespaced() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "vendor/mixins/x.less");

        let request = ResolveRequest::new(
            dir.path(),
            vec![Include::Namespaced {
                namespace: "mixins".into(),
                pattern: "vendor/mixins/*.less".into(),
            }],
            vec![],
        );
        let files = request.resolve();
        assert_eq!(files[0].namespace.as_deref(), Some("mixins"));
    }

    #[test]
    fn test_fileset_deferred_resolution() {
        let dir = TempDir::new().unwrap();

        let request = ResolveRequest::new(
            dir.path(),
            vec![Include::Plain("gen/*.js".into())],
            vec![],
        );
        let set = FileSet::eager_or_pending(request);
        assert!(matches!(set, FileSet::Pending(_)));
        assert!(set.materialize().is_empty());

        // File appears later in the run; materialize picks it up.
        touch(dir.path(), "gen/out.js");
        assert_eq!(set.materialize().len(), 1);
    }
}
