//! Shared per-run build state.
//!
//! One `BuildSession` lives for the duration of a build invocation and owns
//! everything the target drivers share: parsed hook sets (cached by name,
//! so many targets referencing the same set get one instance), the resolved
//! output-name registry and the mtime tracker. Nothing here is global; a
//! host embedding the pipeline constructs its own session.

use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::hooks::{HookChain, HookEnv, HookSet};
use crate::name::NameRegistry;
use crate::track::ChangeTracker;

/// Name of the hook set consulted when a target names none (or as the
/// fallback behind the one it names).
pub const DEFAULT_HOOKS: &str = "default";

pub struct BuildSession {
    config: Config,
    hook_sets: FxHashMap<String, Arc<HookSet>>,
    pub names: NameRegistry,
    pub tracker: ChangeTracker,
}

impl BuildSession {
    pub fn new(config: Config) -> Self {
        let hook_sets = config
            .hooks
            .iter()
            .map(|(name, table)| (name.clone(), Arc::new(HookSet::from_config(name, table))))
            .collect();

        Self {
            config,
            hook_sets,
            names: NameRegistry::new(),
            tracker: ChangeTracker::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a programmatic hook set (embedding, tests). Shadows a
    /// config-defined set of the same name.
    pub fn register_hook_set(&mut self, set: HookSet) {
        self.hook_sets
            .insert(set.name().to_owned(), Arc::new(set));
    }

    /// Hook chain for a target: its named set first (when it names one and
    /// the set exists), then the `default` set.
    pub fn hook_chain(&self, named: Option<&str>) -> HookChain {
        let mut sets = Vec::new();

        if let Some(name) = named {
            match self.hook_sets.get(name) {
                Some(set) => sets.push(Arc::clone(set)),
                None => crate::log!("warn"; "unknown hook set `{name}`"),
            }
        }
        if named != Some(DEFAULT_HOOKS)
            && let Some(set) = self.hook_sets.get(DEFAULT_HOOKS)
        {
            sets.push(Arc::clone(set));
        }

        HookChain::new(sets)
    }

    /// Execution environment for a target's stage commands.
    ///
    /// Exports the project root, the destination root, the target's output
    /// template and every pass-through setting as `SITETOOLS_SETTING_<KEY>`.
    pub fn hook_env(&self, target: &str, settings: &toml::Table) -> HookEnv {
        let mut vars = vec![
            (
                "SITETOOLS_ROOT".to_owned(),
                self.config.root.display().to_string(),
            ),
            (
                "SITETOOLS_OUTPUT".to_owned(),
                self.config.output_dir().display().to_string(),
            ),
            ("SITETOOLS_TARGET".to_owned(), target.to_owned()),
        ];

        for (key, value) in settings {
            let value = match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            vars.push((
                format!("SITETOOLS_SETTING_{}", key.to_uppercase()),
                value,
            ));
        }

        HookEnv {
            root: self.config.root.clone(),
            vars,
        }
    }

    /// Absolute destination path for a target's output template.
    pub fn dest_path(&self, template: &str) -> std::path::PathBuf {
        self.config.output_dir().join(template)
    }

    /// Join a config-relative path to the project root.
    pub fn root_join<P: AsRef<Path>>(&self, path: P) -> std::path::PathBuf {
        self.config.root_join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{Stage, StageArgs};
    use std::path::PathBuf;

    fn session(raw: &str) -> BuildSession {
        BuildSession::new(Config::from_str(raw, Path::new("/site")).unwrap())
    }

    #[test]
    fn test_named_set_shadows_default() {
        let raw = r#"
            [hooks.js]
            compile = ["uglifyjs"]

            [hooks.default]
            compile = ["cat"]
            post_compile = ["cat"]
        "#;
        let session = session(raw);

        let chain = session.hook_chain(Some("js"));
        assert!(chain.can_call(Stage::Compile));
        // post_compile only exists in the default set but is still reachable
        assert!(chain.can_call(Stage::PostCompile));

        let bare = session.hook_chain(None);
        assert!(bare.can_call(Stage::Compile));
    }

    #[test]
    fn test_unknown_set_degrades_to_default() {
        let session = session("");
        let chain = session.hook_chain(Some("missing"));
        assert!(!chain.can_call(Stage::Compile));
    }

    #[test]
    fn test_registered_set_wins() {
        let mut session = session("");
        session.register_hook_set(HookSet::new("js").with_fn(Stage::Compile, |args| {
            Ok(args.buffer.to_ascii_uppercase())
        }));

        let out = session
            .hook_chain(Some("js"))
            .call_or_passthrough(
                Stage::Compile,
                StageArgs {
                    buffer: b"abc",
                    ..Default::default()
                },
                &HookEnv::default(),
            )
            .unwrap();
        assert_eq!(out, b"ABC");
    }

    #[test]
    fn test_hook_env_exports_settings() {
        let session = session("[build]\noutput = \"out\"");
        let mut settings = toml::Table::new();
        settings.insert("mode".into(), toml::Value::String("release".into()));
        settings.insert("level".into(), toml::Value::Integer(9));

        let env = session.hook_env("gen/site.js", &settings);
        assert_eq!(env.root, PathBuf::from("/site"));

        let get = |k: &str| {
            env.vars
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("SITETOOLS_ROOT"), Some("/site"));
        assert_eq!(get("SITETOOLS_OUTPUT"), Some("/site/out"));
        assert_eq!(get("SITETOOLS_TARGET"), Some("gen/site.js"));
        assert_eq!(get("SITETOOLS_SETTING_MODE"), Some("release"));
        assert_eq!(get("SITETOOLS_SETTING_LEVEL"), Some("9"));
    }
}
