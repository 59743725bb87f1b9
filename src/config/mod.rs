//! Pipeline configuration management for `sitetools.toml`.
//!
//! # Sections
//!
//! | Section              | Purpose                                          |
//! |----------------------|--------------------------------------------------|
//! | `[build]`            | Destination root, optional staging directory     |
//! | `[combine.<out>]`    | Concatenate sources into one output file         |
//! | `[compile.<out>]`    | Tree-style compilation from a root/main file     |
//! | `[copy.<dest>]`      | Copy matched files under a destination directory |
//! | `[hooks.<name>]`     | Named hook sets (optional stage commands)        |
//!
//! Target tables carry arbitrary extra keys; those are preserved verbatim
//! and forwarded to hook commands as `SITETOOLS_SETTING_*` variables.

mod target;

pub use target::{CombineTarget, CopyTarget, HookStageConfig, StageIo, TreeTarget};

use crate::cli::Cli;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing sitetools.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// `[build]` section
    pub build: BuildSection,

    /// `[combine.<output-template>]` targets
    pub combine: BTreeMap<String, CombineTarget>,

    /// `[compile.<output-template>]` targets
    pub compile: BTreeMap<String, TreeTarget>,

    /// `[copy.<destination>]` targets
    pub copy: BTreeMap<String, CopyTarget>,

    /// `[hooks.<name>]` hook sets: stage name → command
    pub hooks: BTreeMap<String, BTreeMap<String, HookStageConfig>>,
}

/// `[build]` section configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Destination root for all build targets.
    pub output: PathBuf,

    /// Optional staging directory override for tree-style compilation.
    /// Defaults to the system temp directory.
    pub tmp: Option<PathBuf>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            output: PathBuf::from("public"),
            tmp: None,
        }
    }
}

impl Config {
    /// Load configuration from the path given on the command line.
    ///
    /// The project root is the config file's parent directory; all relative
    /// paths in the config (patterns, output, hash records) resolve against it.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let config_path = crate::utils::path::normalize_path(&cli.config);
        if !config_path.is_file() {
            return Err(ConfigError::NotFound(config_path));
        }

        let raw = fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
            path: config_path.clone(),
            source,
        })?;

        let mut config: Config =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: config_path.clone(),
                source,
            })?;

        config.root = config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        config.config_path = config_path;

        if let Some(output) = &cli.output {
            config.build.output = output.clone();
        }

        Ok(config)
    }

    /// Parse configuration from a TOML string (tests and embedding).
    pub fn from_str(raw: &str, root: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: root.join("sitetools.toml"),
            source,
        })?;
        config.root = root.to_path_buf();
        config.config_path = root.join("sitetools.toml");
        Ok(config)
    }

    /// Absolute destination root.
    pub fn output_dir(&self) -> PathBuf {
        self.root_join(&self.build.output)
    }

    /// Join a path to the project root (absolute paths pass through).
    pub fn root_join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Total number of configured targets.
    pub fn target_count(&self) -> usize {
        self.combine.len() + self.compile.len() + self.copy.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let config = Config::from_str("", Path::new("/site")).unwrap();
        assert_eq!(config.build.output, PathBuf::from("public"));
        assert_eq!(config.target_count(), 0);
    }

    #[test]
    fn test_parse_targets() {
        let raw = r#"
            [build]
            output = "out"

            [combine."gen/site-@hash.js"]
            include = ["js/*.js"]
            exclude = ["js/skip.js"]
            hooks = "js"
            minify = true

            [compile."gen/site.css"]
            main = "css/main.less"
            include = ["css/*.less"]
            namespace.mixins = "vendor/mixins/*.less"

            [copy.fonts]
            include = ["fonts/**/*.woff2"]
            preserve_dirs = true

            [hooks.js]
            compile = ["uglifyjs", "-"]
        "#;
        let config = Config::from_str(raw, Path::new("/site")).unwrap();

        let combine = &config.combine["gen/site-@hash.js"];
        assert_eq!(combine.include, vec!["js/*.js"]);
        assert_eq!(combine.exclude, vec!["js/skip.js"]);
        assert_eq!(combine.hooks.as_deref(), Some("js"));
        // Unknown keys land in pass-through settings
        assert_eq!(
            combine.settings.get("minify"),
            Some(&toml::Value::Boolean(true))
        );

        let tree = &config.compile["gen/site.css"];
        assert_eq!(tree.main.as_deref(), Some("css/main.less"));
        assert_eq!(tree.namespace["mixins"], "vendor/mixins/*.less");

        assert!(config.copy["fonts"].preserve_dirs);
        assert!(config.hooks["js"].contains_key("compile"));
        assert_eq!(config.output_dir(), PathBuf::from("/site/out"));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = Config::from_str("combine = 3", Path::new("/site")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
