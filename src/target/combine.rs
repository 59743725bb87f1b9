//! Combine-target driver: concatenate matched sources, pipe the blob
//! through the hook stages, stamp and write the result.

use anyhow::Result;
use std::path::PathBuf;

use crate::combine::combine;
use crate::config::CombineTarget;
use crate::hooks::{Stage, StageArgs};
use crate::name::resolve_name;
use crate::resolve::{Include, ResolveRequest};
use crate::session::BuildSession;
use crate::track::Change;
use crate::write::{update_hash_record, write_if_changed};
use crate::{debug, log};

pub fn build(session: &mut BuildSession, template: &str, target: &CombineTarget) -> Result<()> {
    let request = ResolveRequest::new(
        &session.config().root,
        target.include.iter().cloned().map(Include::Plain).collect(),
        target.exclude.clone(),
    );
    let paths: Vec<PathBuf> = request.resolve().iter().map(|f| f.path()).collect();

    if paths.is_empty() {
        debug!("combine"; "{template}: no sources matched, skipping");
        return Ok(());
    }

    // A vanished file is treated as a change; the combiner skips it.
    let fresh = matches!(session.tracker.check(template, &paths), Change::Unchanged)
        && super::dest_current(session, template);
    if fresh {
        debug!("combine"; "{template}: up to date");
        return Ok(());
    }

    log!("combine"; "{template}: {} file(s)", paths.len());
    let chain = session.hook_chain(target.hooks.as_deref());
    let env = session.hook_env(template, &target.settings);

    let combined = combine(&paths, |path, content| {
        chain.call_or_passthrough(
            Stage::PreCombineFile,
            StageArgs {
                buffer: &content,
                file: Some(path),
                ..Default::default()
            },
            &env,
        )
    })?;

    let buffer = chain.call_or_passthrough(
        Stage::PreCompile,
        StageArgs {
            buffer: &combined,
            ..Default::default()
        },
        &env,
    )?;
    let compiled = chain.call_or_passthrough(
        Stage::Compile,
        StageArgs {
            buffer: &buffer,
            ..Default::default()
        },
        &env,
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

    // Only after a successful write: deleting the stale artifact earlier
    // would leave nothing on disk if the write fails.
    if let (Some(record), Some(digest)) = (&target.hash_record, &digest) {
        let record = session.dest_path(record);
        let dest_template = session.dest_path(template);
        update_hash_record(&record, &dest_template, digest)?;
    }

    session.names.publish(template, &resolved);
    session.tracker.record(template, &paths);
    Ok(())
}
