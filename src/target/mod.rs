//! Build-target drivers and the run-all loop.
//!
//! Targets are processed to completion one at a time: combine targets,
//! then tree-compile targets, then copy targets (so copies can pick up
//! artifacts the earlier kinds produced). Failures are isolated per
//! target; one target's error is logged and the loop continues, with the
//! report carrying whether anything failed.

mod combine;
mod copy;
mod tree;

use crate::log;
use crate::name::HASH_TOKEN;
use crate::resolve::FileSet;
use crate::session::BuildSession;

/// Outcome of a full build pass.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub built: usize,
    pub failed: usize,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Process every configured target.
pub fn build_all(session: &mut BuildSession) -> BuildReport {
    let mut report = BuildReport::default();

    // Copy sources resolve before anything is built; sets that match
    // nothing yet stay pending until the copy drivers run last.
    let copy_targets = session.config().copy.clone();
    let copy_sets: Vec<FileSet> = {
        let root = session.config().root.clone();
        copy_targets
            .values()
            .map(|target| copy::file_set(&root, target))
            .collect()
    };

    let combine_targets = session.config().combine.clone();
    for (template, target) in &combine_targets {
        tally(
            &mut report,
            "combine",
            template,
            combine::build(session, template, target),
        );
    }

    let tree_targets = session.config().compile.clone();
    for (template, target) in &tree_targets {
        tally(
            &mut report,
            "compile",
            template,
            tree::build(session, template, target),
        );
    }

    for ((dest, target), files) in copy_targets.iter().zip(&copy_sets) {
        tally(
            &mut report,
            "copy",
            dest,
            copy::build(session, dest, target, files),
        );
    }

    report
}

fn tally(report: &mut BuildReport, kind: &str, name: &str, result: anyhow::Result<()>) {
    match result {
        Ok(()) => report.built += 1,
        Err(e) => {
            log!("error"; "{kind} {name}: {e:#}");
            report.failed += 1;
        }
    }
}

/// Whether a target's destination already exists on disk.
///
/// Hash-stamped templates resolve through the name registry; before the
/// first compile of a run there is no entry, so they report stale.
fn dest_current(session: &BuildSession, template: &str) -> bool {
    let resolved = if template.contains(HASH_TOKEN) {
        match session.names.get(template) {
            Some(resolved) => resolved,
            None => return false,
        }
    } else {
        template.to_owned()
    };
    session.dest_path(&resolved).is_file()
}

// ============================================================================
// End-to-end pipeline tests
// ============================================================================
