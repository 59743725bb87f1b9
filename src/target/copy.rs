//! Copy-target driver: place matched files under a destination directory,
//! optionally preserving source structure, via the `copy_file` hook.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CopyTarget;
use crate::hooks::{Stage, StageArgs};
use crate::resolve::{FileSet, Include, ResolveRequest, has_meta};
use crate::session::BuildSession;
use crate::track::mtime_of;
use crate::{debug, log};

/// Resolve a copy target's sources up front.
///
/// Called before the combine and tree drivers run; a pattern matching
/// nothing yet stays pending and is re-resolved at copy time, picking up
/// artifacts those drivers produce.
pub(super) fn file_set(root: &Path, target: &CopyTarget) -> FileSet {
    let request = ResolveRequest::new(
        root,
        target.include.iter().cloned().map(Include::Plain).collect(),
        target.exclude.clone(),
    )
    .preserve_dirs(target.preserve_dirs);
    FileSet::eager_or_pending(request)
}

pub fn build(
    session: &mut BuildSession,
    dest_template: &str,
    target: &CopyTarget,
    files: &FileSet,
) -> Result<()> {
    let files = files.materialize();
    if files.is_empty() {
        debug!("copy"; "{dest_template}: no sources matched, skipping");
        return Ok(());
    }

    let chain = session.hook_chain(target.hooks.as_deref());
    let env = session.hook_env(dest_template, &target.settings);
    let output_root = session.config().output_dir();

    let mut copied = 0usize;
    for file in &files {
        let source = file.path();
        let rel_dir = file.dir.to_string_lossy();

        for dest_dir in destination_dirs(&output_root, dest_template, &rel_dir) {
            let dest = dest_dir.join(&file.name);

            // Copy when the destination is absent or older than the source.
            let stale = match (mtime_of(&source), mtime_of(&dest)) {
                (_, None) => true,
                (Some(src), Some(dst)) => src > dst,
                (None, _) => false, // vanished between resolve and copy
            };
            if !stale {
                continue;
            }

            fs::create_dir_all(&dest_dir)
                .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

            chain.call(
                Stage::CopyFile,
                StageArgs {
                    file: Some(&source),
                    dest: Some(&dest),
                    ..Default::default()
                },
                &env,
                |args| {
                    let (Some(from), Some(to)) = (args.file, args.dest) else {
                        return Ok(Vec::new());
                    };
                    fs::copy(from, to).with_context(|| {
                        format!("Failed to copy {} to {}", from.display(), to.display())
                    })?;
                    Ok(Vec::new())
                },
            )?;
            copied += 1;
        }
    }

    if copied > 0 {
        log!("copy"; "{dest_template}: {copied} file(s)");
    }
    Ok(())
}

/// Expand a destination that may itself be a glob pattern.
///
/// The pattern is matched against existing directories under the output
/// root. Trailing components that match nothing (leaf directories that do
/// not exist yet) are peeled off and re-appended to every match, so
/// `page[0-9]/docs` targets a `docs/` directory inside each existing
/// `page<n>/` even before any `docs/` exists.
pub(super) fn destination_dirs(output_root: &Path, dest: &str, sub_dir: &str) -> Vec<PathBuf> {
    let full = if sub_dir.is_empty() {
        dest.to_owned()
    } else {
        format!("{dest}/{sub_dir}")
    };

    if !full.split('/').any(has_meta) {
        return vec![output_root.join(&full)];
    }

    let mut components: Vec<&str> = full.split('/').filter(|c| !c.is_empty()).collect();
    let mut leaf: Vec<&str> = Vec::new();

    while !components.is_empty() {
        let matched = expand_dirs(output_root, &components.join("/"));
        if !matched.is_empty() {
            return matched
                .into_iter()
                .map(|dir| leaf.iter().fold(dir, |d, c| d.join(c)))
                .collect();
        }
        leaf.insert(0, components.pop().unwrap_or_default());
    }

    crate::log!("warn"; "copy destination `{dest}` matches no directory");
    Vec::new()
}

/// Directories under `root` matching `pattern`.
fn expand_dirs(root: &Path, pattern: &str) -> Vec<PathBuf> {
    if !pattern.split('/').any(has_meta) {
        let path = root.join(pattern);
        return if path.is_dir() { vec![path] } else { vec![] };
    }

    let Ok(matcher) = globset::GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
    else {
        return Vec::new();
    };

    let mut matched: Vec<PathBuf> = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.path())
        .filter(|path| {
            path.strip_prefix(root)
                .map(|rel| matcher.is_match(rel))
                .unwrap_or(false)
        })
        .collect();
    matched.sort();
    matched
}
