//! Modification-time tracking for incremental rebuild decisions.
//!
//! Keeps one mtime baseline per build target. A target recompiles when any
//! of its resolved sources drifts from the baseline; after a successful
//! compile the *current* mtime of every participating file is recorded, even
//! files that did not individually change, so later checks run against a
//! consistent baseline.
//!
//! The tracker only reports change; the caller decides what a missing file
//! means (combine targets skip silently, tree targets cannot compile).

use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Verdict of a rebuild check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Every tracked file exists and matches its baseline.
    Unchanged,
    /// At least one file's mtime differs from the baseline (or is untracked).
    Changed,
    /// A required file is absent. Carries the first missing path.
    Missing(PathBuf),
}

/// Per-target mtime baselines. Process-scoped; rebuilt from scratch each run.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    state: FxHashMap<String, FxHashMap<PathBuf, SystemTime>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the current mtimes of `files` against the baseline for
    /// `target`. A missing file short-circuits to `Change::Missing`.
    pub fn check(&self, target: &str, files: &[PathBuf]) -> Change {
        let baseline = self.state.get(target);
        let mut changed = false;

        for file in files {
            let Some(mtime) = mtime_of(file) else {
                return Change::Missing(file.clone());
            };
            match baseline.and_then(|b| b.get(file)) {
                Some(recorded) if *recorded == mtime => {}
                _ => changed = true,
            }
        }

        if changed {
            Change::Changed
        } else {
            Change::Unchanged
        }
    }

    /// Record the current mtime of every file after a successful compile.
    ///
    /// Files that vanished between check and record are skipped; the
    /// caller's policy governs failure behavior.
    pub fn record(&mut self, target: &str, files: &[PathBuf]) {
        let baseline = self.state.entry(target.to_owned()).or_default();
        baseline.clear();
        for file in files {
            if let Some(mtime) = mtime_of(file) {
                baseline.insert(file.clone(), mtime);
            }
        }
    }

    /// Drop the baseline for one target (forces the next check to report
    /// change).
    pub fn forget(&mut self, target: &str) {
        self.state.remove(target);
    }
}

/// Get the modification time of a file.
///
/// Returns `None` if the file doesn't exist or mtime cannot be read.
pub fn mtime_of(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::{thread, time::Duration};
    use tempfile::TempDir;

    /// Bump a file's mtime by rewriting it after a short sleep.
    fn touch(path: &Path) {
        thread::sleep(Duration::from_millis(10));
        let content = fs::read(path).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_first_check_is_changed() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        fs::write(&a, "var a=1;").unwrap();

        let tracker = ChangeTracker::new();
        assert_eq!(tracker.check("t", &[a]), Change::Changed);
    }

    #[test]
    fn test_touch_one_of_two() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("b.js");
        fs::write(&a, "var a=1;").unwrap();
        fs::write(&b, "var b=2;").unwrap();
        let files = vec![a.clone(), b.clone()];

        let mut tracker = ChangeTracker::new();
        tracker.record("t", &files);
        assert_eq!(tracker.check("t", &files), Change::Unchanged);

        touch(&b);
        assert_eq!(tracker.check("t", &files), Change::Changed);

        // Recording again resets the baseline for both files.
        tracker.record("t", &files);
        assert_eq!(tracker.check("t", &files), Change::Unchanged);
    }

    #[test]
    fn test_missing_file_reported() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        fs::write(&a, "var a=1;").unwrap();
        let ghost = dir.path().join("ghost.js");

        let tracker = ChangeTracker::new();
        assert_eq!(
            tracker.check("t", &[a, ghost.clone()]),
            Change::Missing(ghost)
        );
    }

    #[test]
    fn test_targets_are_independent() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        fs::write(&a, "var a=1;").unwrap();
        let files = vec![a];

        let mut tracker = ChangeTracker::new();
        tracker.record("one", &files);
        assert_eq!(tracker.check("one", &files), Change::Unchanged);
        assert_eq!(tracker.check("two", &files), Change::Changed);

        tracker.forget("one");
        assert_eq!(tracker.check("one", &files), Change::Changed);
    }
}
