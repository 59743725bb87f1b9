//! Tree-compile driver: stage a root file and its dependencies into an
//! isolated temp directory, then compile the tree from the root.
//!
//! External compilers that follow textual imports (stylesheet `@import`
//! graphs) need every dependency reachable by name. Flat dependencies land
//! next to the staged root; namespaced ones go under `<staging>/<ns>/` so
//! same-named files from different sources cannot collide. The staging
//! directory and every namespace directory are handed to the compile stage
//! as include paths, and the whole workspace is removed on drop.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::config::TreeTarget;
use crate::hooks::{Stage, StageArgs};
use crate::name::resolve_name;
use crate::resolve::{Include, ResolveRequest};
use crate::session::BuildSession;
use crate::track::Change;
use crate::write::{update_hash_record, write_if_changed};
use crate::{debug, log};

pub fn build(session: &mut BuildSession, template: &str, target: &TreeTarget) -> Result<()> {
    // A target without a main file never compiles; deferred, not an error.
    let Some(main) = &target.main else {
        log!("compile"; "{template}: no main file configured, skipping");
        return Ok(());
    };
    let main_path = session.root_join(main);

    let mut includes: Vec<Include> = target.include.iter().cloned().map(Include::Plain).collect();
    for (namespace, pattern) in &target.namespace {
        includes.push(Include::Namespaced {
            namespace: namespace.clone(),
            pattern: pattern.clone(),
        });
    }
    // The main file is staged explicitly; keep it out of the dependency set.
    let mut excludes = target.exclude.clone();
    excludes.push(main.clone());

    let files = ResolveRequest::new(&session.config().root, includes, excludes).resolve();

    let mut tracked: Vec<PathBuf> = vec![main_path.clone()];
    tracked.extend(files.iter().map(|f| f.path()));

    match session.tracker.check(template, &tracked) {
        Change::Missing(path) if path == main_path => {
            log!("compile"; "{template}: main file {} is absent, skipping", main_path.display());
            return Ok(());
        }
        Change::Unchanged if super::dest_current(session, template) => {
            debug!("compile"; "{template}: up to date");
            return Ok(());
        }
        _ => {}
    }

    log!("compile"; "{template}: staging {} file(s)", tracked.len());

    // Removed on drop, success or failure.
    let staging = match &session.config().build.tmp {
        Some(tmp) => tempfile::Builder::new()
            .prefix("sitetools-")
            .tempdir_in(session.root_join(tmp)),
        None => tempfile::Builder::new().prefix("sitetools-").tempdir(),
    }
    .context("Failed to create staging directory")?;

    let main_name = main_path
        .file_name()
        .with_context(|| format!("main file `{main}` has no file name"))?;
    let staged_main = staging.path().join(main_name);
    fs::copy(&main_path, &staged_main)
        .with_context(|| format!("Failed to stage {}", main_path.display()))?;

    let mut include_paths = vec![staging.path().to_path_buf()];
    for file in &files {
        let dir = match &file.namespace {
            Some(namespace) => {
                let dir = staging.path().join(namespace);
                if !include_paths.contains(&dir) {
                    fs::create_dir_all(&dir)
                        .with_context(|| format!("Failed to create {}", dir.display()))?;
                    include_paths.push(dir.clone());
                }
                dir
            }
            None => staging.path().to_path_buf(),
        };
        let source = file.path();
        fs::copy(&source, dir.join(&file.name))
            .with_context(|| format!("Failed to stage {}", source.display()))?;
    }

    let chain = session.hook_chain(target.hooks.as_deref());
    let env = session.hook_env(template, &target.settings);

    // pre_compile output is written back so a file-based compile stage sees
    // the transformed root.
    let raw = fs::read(&staged_main)
        .with_context(|| format!("Failed to read {}", staged_main.display()))?;
    let buffer = chain.call_or_passthrough(
        Stage::PreCompile,
        StageArgs {
            buffer: &raw,
            file: Some(&staged_main),
            ..Default::default()
        },
        &env,
    )?;
    if buffer != raw {
        fs::write(&staged_main, &buffer)
            .with_context(|| format!("Failed to write {}", staged_main.display()))?;
    }

    let compiled = chain.call(
        Stage::Compile,
        StageArgs {
            buffer: &buffer,
            file: Some(&staged_main),
            include_paths: &include_paths,
            ..Default::default()
        },
        &env,
        |_| Ok(fs::read(&staged_main)?),
    )?;
    let output = chain.call_or_passthrough(
        Stage::PostCompile,
        StageArgs {
            buffer: &compiled,
            ..Default::default()
        },
        &env,
    )?;

    let (resolved, digest) = resolve_name(template, &output);
    let dest = session.dest_path(&resolved);

    write_if_changed(&dest, &output)?;

    // Stale-artifact cleanup must not run ahead of the write it replaces.
    if let (Some(record), Some(digest)) = (&target.hash_record, &digest) {
        let record = session.dest_path(record);
        let dest_template = session.dest_path(template);
        update_hash_record(&record, &dest_template, digest)?;
    }

    session.names.publish(template, &resolved);
    session.tracker.record(template, &tracked);
    Ok(())
}
