//! Named transform stages with chain-of-responsibility resolution.
//!
//! A `HookSet` is a collection of optional stages (each a callback or an
//! external command). A `HookChain` is an ordered list of sets, most
//! specific first: the first set defining a requested stage wins, and a
//! caller-supplied default runs when no set defines it.
//!
//! Sets parsed from configuration are cached per name by the build session,
//! so many targets referencing the same shared set get one parsed instance.

mod command;

pub use command::CommandStage;

use anyhow::Result;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::HookStageConfig;

// ============================================================================
// Stages
// ============================================================================

/// The extension points a build target's pipeline invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Per-file transform before concatenation.
    PreCombineFile,
    /// Transform of the combined buffer before compilation.
    PreCompile,
    /// The external compilation itself.
    Compile,
    /// Transform of the compiled buffer.
    PostCompile,
    /// Per-file copy override for copy targets.
    CopyFile,
}

impl Stage {
    pub const fn name(self) -> &'static str {
        match self {
            Self::PreCombineFile => "pre_combine_file",
            Self::PreCompile => "pre_compile",
            Self::Compile => "compile",
            Self::PostCompile => "post_compile",
            Self::CopyFile => "copy_file",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pre_combine_file" => Some(Self::PreCombineFile),
            "pre_compile" => Some(Self::PreCompile),
            "compile" => Some(Self::Compile),
            "post_compile" => Some(Self::PostCompile),
            "copy_file" => Some(Self::CopyFile),
            _ => None,
        }
    }
}

/// Arguments handed to a stage invocation.
///
/// Not every field is meaningful for every stage: `file` is the current
/// source (pre_combine_file, copy_file) or the staged root file (tree
/// compilation), `dest` only applies to copy_file, `include_paths` to
/// compile.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageArgs<'a> {
    pub buffer: &'a [u8],
    pub file: Option<&'a Path>,
    pub dest: Option<&'a Path>,
    pub include_paths: &'a [PathBuf],
}

/// Execution environment for command-backed stages.
#[derive(Debug, Clone, Default)]
pub struct HookEnv {
    /// Working directory for stage commands (the project root).
    pub root: PathBuf,
    /// `SITETOOLS_*` variables exported to stage commands.
    pub vars: Vec<(String, String)>,
}

type StageFn = dyn Fn(StageArgs<'_>) -> Result<Vec<u8>> + Send + Sync;

/// One stage implementation inside a hook set.
pub enum StageHandler {
    /// External command from configuration.
    Command(CommandStage),
    /// Programmatic callback (embedding, tests).
    Fn(Box<StageFn>),
}

impl StageHandler {
    fn invoke(&self, args: StageArgs<'_>, env: &HookEnv) -> Result<Vec<u8>> {
        match self {
            Self::Command(cmd) => cmd.invoke(args, env),
            Self::Fn(f) => f(args),
        }
    }
}

// ============================================================================
// Hook sets
// ============================================================================

/// A named collection of optional stages.
pub struct HookSet {
    name: String,
    stages: FxHashMap<Stage, StageHandler>,
}

impl HookSet {
    /// Empty set (defines no stages).
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            stages: FxHashMap::default(),
        }
    }

    /// Build a set from a `[hooks.<name>]` table.
    ///
    /// Unknown stage names and empty commands are skipped with a warning;
    /// a malformed entry degrades to "stage not defined" rather than
    /// aborting the build.
    pub fn from_config(name: &str, table: &std::collections::BTreeMap<String, HookStageConfig>) -> Self {
        let mut set = Self::new(name);
        for (stage_name, entry) in table {
            let Some(stage) = Stage::from_name(stage_name) else {
                crate::log!("warn"; "hooks.{name}: unknown stage `{stage_name}`");
                continue;
            };
            if entry.is_empty() {
                crate::log!("warn"; "hooks.{name}: empty command for `{stage_name}`");
                continue;
            }
            set.stages
                .insert(stage, StageHandler::Command(CommandStage::from_config(entry)));
        }
        set
    }

    /// Register a programmatic stage.
    pub fn with_fn<F>(mut self, stage: Stage, f: F) -> Self
    where
        F: Fn(StageArgs<'_>) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.stages.insert(stage, StageHandler::Fn(Box::new(f)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defines(&self, stage: Stage) -> bool {
        self.stages.contains_key(&stage)
    }
}

// ============================================================================
// Hook chain
// ============================================================================

/// Ordered hook sets, most specific first.
#[derive(Clone, Default)]
pub struct HookChain {
    sets: Vec<Arc<HookSet>>,
}

impl HookChain {
    pub fn new(sets: Vec<Arc<HookSet>>) -> Self {
        Self { sets }
    }

    /// Whether any set in the chain defines the stage.
    pub fn can_call(&self, stage: Stage) -> bool {
        self.sets.iter().any(|s| s.defines(stage))
    }

    /// Invoke the first set defining `stage`; fall back to `default`.
    ///
    /// The chain stops at the first match - a later set's implementation
    /// is shadowed, not chained.
    pub fn call<F>(&self, stage: Stage, args: StageArgs<'_>, env: &HookEnv, default: F) -> Result<Vec<u8>>
    where
        F: FnOnce(StageArgs<'_>) -> Result<Vec<u8>>,
    {
        for set in &self.sets {
            if let Some(handler) = set.stages.get(&stage) {
                crate::debug!("hooks"; "{} via `{}`", stage.name(), set.name());
                return handler.invoke(args, env);
            }
        }
        default(args)
    }

    /// Identity fallback shared by the buffer-shaped stages.
    pub fn call_or_passthrough(&self, stage: Stage, args: StageArgs<'_>, env: &HookEnv) -> Result<Vec<u8>> {
        self.call(stage, args, env, |args| Ok(args.buffer.to_vec()))
    }
}

// ============================================================================
// Tests
// ============================================================================
