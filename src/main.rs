//! sitetools - an incremental asset build pipeline for static sites.

mod cli;
mod combine;
mod config;
mod exec;
mod hooks;
mod logger;
mod name;
mod resolve;
mod session;
mod target;
mod track;
mod utils;
mod write;

use clap::{ColorChoice, Parser};
use std::process::ExitCode;

use cli::{Cli, Commands};
use config::Config;
use session::BuildSession;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            log!("error"; "{e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Build => build(config),
        Commands::Targets => targets(config),
    }
}

/// Run every configured target; the exit status reflects whether any
/// target failed, while successful targets' output is kept either way.
fn build(config: Config) -> ExitCode {
    let count = config.target_count();
    let mut session = BuildSession::new(config);

    log!("build"; "{count} target(s)");
    let report = target::build_all(&mut session);

    for (template, resolved) in session.names.entries() {
        if template != resolved {
            log!("build"; "{template} -> {resolved}");
        }
    }

    if report.success() {
        log!("build"; "done, {} target(s) processed", report.built);
        ExitCode::SUCCESS
    } else {
        log!("error"; "{} target(s) failed, {} succeeded", report.failed, report.built);
        ExitCode::FAILURE
    }
}

/// List configured targets by kind.
fn targets(config: Config) -> ExitCode {
    for template in config.combine.keys() {
        log!("combine"; "{template}");
    }
    for template in config.compile.keys() {
        log!("compile"; "{template}");
    }
    for dest in config.copy.keys() {
        log!("copy"; "{dest}");
    }
    if config.target_count() == 0 {
        log!("build"; "no targets configured");
    }
    ExitCode::SUCCESS
}
