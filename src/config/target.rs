//! Build target table definitions.
//!
//! Three target kinds mirror the three pipeline drivers:
//! - `CombineTarget` - concatenate matched files, optionally compile the blob
//! - `TreeTarget` - stage a root file plus its imports, compile the tree
//! - `CopyTarget` - copy matched files, optionally preserving structure
//!
//! Keys the structs don't name are collected into `settings` and forwarded
//! verbatim to hook commands.

use serde::Deserialize;
use std::collections::BTreeMap;

/// `[combine.<output-template>]` - concatenation target.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CombineTarget {
    /// Ordered include patterns, relative to the project root.
    pub include: Vec<String>,

    /// Ordered exclude patterns, applied after include expansion.
    pub exclude: Vec<String>,

    /// Named hook set reference (`[hooks.<name>]`).
    pub hooks: Option<String>,

    /// Optional digest record file for stale-artifact cleanup.
    pub hash_record: Option<String>,

    /// Pass-through settings forwarded to hooks.
    #[serde(flatten)]
    pub settings: toml::Table,
}

/// `[compile.<output-template>]` - tree-style compilation target.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TreeTarget {
    /// Root/main file the external compiler starts from.
    ///
    /// A target without a main file never compiles and never writes;
    /// it is skipped with a log line, not an error.
    pub main: Option<String>,

    /// Ordered include patterns for the root file's dependencies.
    pub include: Vec<String>,

    /// Ordered exclude patterns.
    pub exclude: Vec<String>,

    /// Namespace → glob: matched files are staged under `<tmpdir>/<namespace>/`
    /// so same-named files from different sources do not collide.
    pub namespace: BTreeMap<String, String>,

    /// Named hook set reference.
    pub hooks: Option<String>,

    /// Optional digest record file for stale-artifact cleanup.
    pub hash_record: Option<String>,

    /// Pass-through settings forwarded to hooks.
    #[serde(flatten)]
    pub settings: toml::Table,
}

/// `[copy.<destination>]` - plain copy target.
///
/// The destination may itself contain glob characters; it is then expanded
/// against the destination root at write time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CopyTarget {
    /// Ordered include patterns.
    pub include: Vec<String>,

    /// Ordered exclude patterns.
    pub exclude: Vec<String>,

    /// Keep the sub-path under a recursive pattern's fixed prefix
    /// instead of flattening matched files.
    pub preserve_dirs: bool,

    /// Named hook set reference (for the `copy_file` stage).
    pub hooks: Option<String>,

    /// Pass-through settings forwarded to hooks.
    #[serde(flatten)]
    pub settings: toml::Table,
}

// ============================================================================
// Hook stage commands
// ============================================================================

/// How a stage command receives its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageIo {
    /// Buffer is piped to the command's stdin; stdout is the result.
    #[default]
    Stdin,

    /// Buffer is materialized to a temp file with `ext`; the command is
    /// invoked on it and the sibling `output_ext` file is read back.
    File,
}

/// One stage entry inside `[hooks.<name>]`.
///
/// Plain argv arrays are the common case:
///
/// ```toml
/// [hooks.js]
/// compile = ["uglifyjs", "-"]
/// ```
///
/// File-based tools use the detailed form:
///
/// ```toml
/// [hooks.ts]
/// compile = { command = ["tsc"], io = "file", ext = "ts", output_ext = "js" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HookStageConfig {
    Argv(Vec<String>),
    Detailed {
        command: Vec<String>,
        #[serde(default)]
        io: StageIo,
        #[serde(default)]
        ext: Option<String>,
        #[serde(default)]
        output_ext: Option<String>,
    },
}

impl HookStageConfig {
    /// The argv of the stage command.
    pub fn command(&self) -> &[String] {
        match self {
            Self::Argv(argv) => argv,
            Self::Detailed { command, .. } => command,
        }
    }

    /// True when the entry names no command at all.
    pub fn is_empty(&self) -> bool {
        self.command().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_config_argv() {
        let stage: HookStageConfig = toml::Value::try_into(
            toml::from_str::<toml::Value>(r#"v = ["lessc", "-"]"#)
                .unwrap()
                .get("v")
                .cloned()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(stage.command(), ["lessc", "-"]);
        assert!(!stage.is_empty());
    }

    #[test]
    fn test_stage_config_detailed() {
        let table: toml::Table =
            toml::from_str(r#"v = { command = ["tsc"], io = "file", ext = "ts", output_ext = "js" }"#)
                .unwrap();
        let stage: HookStageConfig = table["v"].clone().try_into().unwrap();
        assert_eq!(stage.command(), ["tsc"]);
        match stage {
            HookStageConfig::Detailed { io, ext, output_ext, .. } => {
                assert_eq!(io, StageIo::File);
                assert_eq!(ext.as_deref(), Some("ts"));
                assert_eq!(output_ext.as_deref(), Some("js"));
            }
            HookStageConfig::Argv(_) => panic!("expected detailed form"),
        }
    }
}
