//! Command-backed stage execution.
//!
//! Stage commands receive the stage buffer on stdin and produce the
//! transformed buffer on stdout (or go through the file-based path for
//! tools that cannot stream). Argument placeholders are resolved before
//! spawning:
//!
//! - `$FILE` - current source / staged root file
//! - `$DEST` - copy destination (copy_file stage)
//! - `$INCLUDE_PATHS` - include paths joined with the platform separator
//!
//! plus every `SITETOOLS_*` variable from the hook environment.

use anyhow::Result;
use std::path::PathBuf;

use crate::config::{HookStageConfig, StageIo};
use crate::exec::{Cmd, invoke_file_based};

use super::{HookEnv, StageArgs};

/// Path-list separator for `$INCLUDE_PATHS`.
#[cfg(windows)]
const PATH_SEP: &str = ";";
#[cfg(not(windows))]
const PATH_SEP: &str = ":";

/// A stage backed by an external command.
#[derive(Debug, Clone)]
pub struct CommandStage {
    argv: Vec<String>,
    io: StageIo,
    ext: Option<String>,
    output_ext: Option<String>,
}

impl CommandStage {
    pub fn from_config(entry: &HookStageConfig) -> Self {
        match entry {
            HookStageConfig::Argv(argv) => Self {
                argv: argv.clone(),
                io: StageIo::Stdin,
                ext: None,
                output_ext: None,
            },
            HookStageConfig::Detailed {
                command,
                io,
                ext,
                output_ext,
            } => Self {
                argv: command.clone(),
                io: *io,
                ext: ext.clone(),
                output_ext: output_ext.clone(),
            },
        }
    }

    /// Run the stage command on the given arguments.
    ///
    /// Best-effort policy: stderr is logged as a warning and stdout is the
    /// result regardless of exit status. Spawn failure is the only error.
    pub fn invoke(&self, args: StageArgs<'_>, env: &HookEnv) -> Result<Vec<u8>> {
        let argv = self.resolve_argv(args, env);

        if self.io == StageIo::File {
            let ext = self.ext.as_deref().unwrap_or("tmp");
            let output_ext = self.output_ext.as_deref().unwrap_or("out");
            return invoke_file_based(&argv, args.buffer, ext, output_ext, &env.vars, &env.root);
        }

        let run = Cmd::from_slice(&argv)
            .cwd(&env.root)
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(args.buffer)
            .run()?;

        // Diagnostics do not block output; whatever the tool printed on
        // stdout is the compiled result.
        if !run.stderr.trim().is_empty() {
            crate::log!("warn"; "{}: {}", argv[0], run.stderr.trim());
        }
        if !run.success {
            crate::debug!("hooks"; "`{}` exited nonzero", argv[0]);
        }

        Ok(run.stdout)
    }

    /// Substitute placeholders and environment variables in the argv.
    fn resolve_argv(&self, args: StageArgs<'_>, env: &HookEnv) -> Vec<String> {
        let file = args
            .file
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let dest = args
            .dest
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let include_paths = join_paths(args.include_paths);

        // Longest keys first: a key that is a prefix of another must not
        // clobber the longer placeholder.
        let mut vars: Vec<_> = env.vars.iter().collect();
        vars.sort_by_key(|(key, _)| std::cmp::Reverse(key.len()));

        self.argv
            .iter()
            .map(|arg| {
                let mut resolved = arg
                    .replace("$INCLUDE_PATHS", &include_paths)
                    .replace("$FILE", &file)
                    .replace("$DEST", &dest);
                for (key, value) in &vars {
                    let pattern = format!("${key}");
                    resolved = resolved.replace(&pattern, value);
                }
                resolved
            })
            .collect()
    }
}

/// Join include paths with the platform path-list separator.
pub fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(PATH_SEP)
}
