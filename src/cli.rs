//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Sitetools asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: sitetools.toml)
    #[arg(short = 'C', long, default_value = "sitetools.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Output directory path (overrides `build.output`)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build all configured targets
    #[command(visible_alias = "b")]
    Build,

    /// List configured targets and their resolved output names
    #[command(visible_alias = "t")]
    Targets,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::parse_from(["sitetools", "build"]);
        assert!(matches!(cli.command, Commands::Build));
        assert_eq!(cli.config, PathBuf::from("sitetools.toml"));
    }

    #[test]
    fn test_parse_config_override() {
        let cli = Cli::parse_from(["sitetools", "-C", "site/tools.toml", "-v", "targets"]);
        assert!(matches!(cli.command, Commands::Targets));
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("site/tools.toml"));
    }

    #[test]
    fn test_verbose_short_flag_is_distinct_from_version() {
        // -v toggles verbosity; -V stays reserved for clap's version flag.
        let cli = Cli::parse_from(["sitetools", "-v", "build"]);
        assert!(cli.verbose);
        assert!(Cli::try_parse_from(["sitetools", "-V"]).is_err());
    }
}
