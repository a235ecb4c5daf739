//! # preflight
//!
//! Run analysis plugins against a git repository's pending changes.
//!
//! ## Overview
//!
//! preflight is built on top of preflightlib. It diffs the staged changes (or
//! a commit range), hands the diff to every plugin as JSON on stdin, and
//! reports what the plugins found. Installed as a `pre-commit` hook it blocks
//! commits that a plugin marks with a `stop` finding.
//!
//! ## Usage
//!
//! ```bash
//! # Check staged changes with two plugins
//! preflight --plugin ./plugins/pep8 --plugin spell=./plugins/spelling
//!
//! # Check the last three commits, TAP output
//! preflight check HEAD~3..HEAD -p ./plugins/pep8 --format tap
//!
//! # Only show plugins Python files
//! preflight -p ./plugins/pep8 --include "**/*.py" --exclude "vendor/**"
//!
//! # Install the pre-commit hook
//! preflight init . --plugin ./plugins/pep8
//! ```
//!
//! ## Exit codes
//!
//! - `0`: no plugin asked to stop the commit
//! - `1`: at least one `stop` finding or failed plugin
//! - `2`: preflight itself could not run

use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use preflightlib::{
    check, install_hook, ChangeSource, FilterConfig, FormatterKind, Plugin, RunOptions,
};
use tracing::{debug, warn};

const EXIT_STOP: u8 = 1;
const EXIT_ERROR: u8 = 2;

/// Arguments shared by the root command and `check`
fn check_args() -> Vec<Arg> {
    vec![
        Arg::new("from").help("Commit range (e.g., HEAD~3..HEAD) or base commit; staged changes when omitted"),
        Arg::new("to").help("Target commit (optional if using range syntax)"),
        Arg::new("path")
            .long("path")
            .default_value(".")
            .help("Path inside the repository"),
        Arg::new("plugin")
            .short('p')
            .long("plugin")
            .action(ArgAction::Append)
            .value_name("[NAME=]CMD")
            .help("Plugin command to run (can be specified multiple times)"),
        Arg::new("include")
            .short('i')
            .long("include")
            .action(ArgAction::Append)
            .help("Include files matching glob pattern"),
        Arg::new("exclude")
            .short('e')
            .long("exclude")
            .action(ArgAction::Append)
            .help("Exclude files matching glob pattern"),
        Arg::new("timeout")
            .long("timeout")
            .value_parser(clap::value_parser!(u64))
            .default_value("60")
            .value_name("SECONDS")
            .help("Time limit for each plugin"),
        Arg::new("format")
            .short('f')
            .long("format")
            .value_parser(["fancy", "tap", "json"])
            .default_value("fancy")
            .help("Output format"),
        Arg::new("no-color")
            .long("no-color")
            .action(ArgAction::SetTrue)
            .help("Disable coloured output"),
    ]
}

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("preflight")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Arthur Debert")
        .about("Run analysis plugins against a git repository's pending changes")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log progress to stderr"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debugging details to stderr"),
        )
        .args(check_args())
        .subcommand(
            Command::new("check")
                .about("Run plugins against staged changes or a commit range (default command)")
                .args(check_args()),
        )
        .subcommand(
            Command::new("init")
                .about("Install the pre-commit hook in a git repository")
                .arg(
                    Arg::new("path")
                        .help("Path to the git repository")
                        .default_value("."),
                )
                .arg(
                    Arg::new("plugin")
                        .short('p')
                        .long("plugin")
                        .action(ArgAction::Append)
                        .value_name("[NAME=]CMD")
                        .help("Plugin the hook should run (can be specified multiple times)"),
                ),
        )
}

fn init_logging(verbose: bool, debug: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    debug!("Logging initialized at level: {}", level);
}

fn values(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|v| v.cloned().collect())
        .unwrap_or_default()
}

/// Build filter config from matches
fn build_filter(matches: &ArgMatches) -> anyhow::Result<FilterConfig> {
    let filter = FilterConfig::new()
        .include_many(&values(matches, "include"))?
        .exclude_many(&values(matches, "exclude"))?;
    Ok(filter)
}

fn parse_change_source(from: Option<&str>, to: Option<&str>) -> anyhow::Result<ChangeSource> {
    match (from, to) {
        (None, _) => Ok(ChangeSource::Staged),
        (Some(from), Some(to)) => Ok(ChangeSource::range(from, to)),
        (Some(range), None) if range.contains("..") => {
            range.parse().map_err(anyhow::Error::msg)
        }
        (Some(from), None) => Ok(ChangeSource::range(from, "HEAD")),
    }
}

fn build_options(matches: &ArgMatches) -> anyhow::Result<RunOptions> {
    let plugins = Plugin::parse_all(&values(matches, "plugin"))?;
    if plugins.is_empty() {
        warn!("no plugins given, nothing will be checked");
    }

    let source = parse_change_source(
        matches.get_one::<String>("from").map(String::as_str),
        matches.get_one::<String>("to").map(String::as_str),
    )?;

    let timeout = matches.get_one::<u64>("timeout").copied().unwrap_or(60);

    Ok(RunOptions::new()
        .plugins(plugins)
        .filter(build_filter(matches)?)
        .timeout(Duration::from_secs(timeout))
        .source(source))
}

/// Handler for the check command
fn check_handler(matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    let path = matches
        .get_one::<String>("path")
        .map(|s| s.as_str())
        .unwrap_or(".");
    let options = build_options(matches)?;

    let results = check(path, &options).with_context(|| format!("cannot check {}", path))?;

    let kind: FormatterKind = matches
        .get_one::<String>("format")
        .map(|s| s.as_str())
        .unwrap_or("fancy")
        .parse()
        .map_err(anyhow::Error::msg)?;
    let color = !matches.get_flag("no-color") && console::colors_enabled();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    kind.formatter(color)
        .print_results(&mut out, &results)
        .context("failed to write results")?;
    out.flush()?;

    if results.has_stop() {
        Ok(ExitCode::from(EXIT_STOP))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Handler for the init command
fn init_handler(matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    let path = matches
        .get_one::<String>("path")
        .map(|s| s.as_str())
        .unwrap_or(".");
    let plugins = values(matches, "plugin");

    // Reject unusable plugin commands before writing the hook
    Plugin::parse_all(&plugins)?;

    let hook = install_hook(path, &plugins)?;
    println!("Installed pre-commit hook at {}", hook.display());
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let matches = build_command().get_matches();
    init_logging(matches.get_flag("verbose"), matches.get_flag("debug"));

    let result = match matches.subcommand() {
        Some(("init", sub)) => init_handler(sub),
        Some(("check", sub)) => check_handler(sub),
        _ => check_handler(&matches),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        build_command().debug_assert();
    }

    #[test]
    fn test_parse_change_source() {
        assert_eq!(parse_change_source(None, None).unwrap(), ChangeSource::Staged);
        assert_eq!(
            parse_change_source(Some("main"), Some("feature")).unwrap(),
            ChangeSource::range("main", "feature")
        );
        assert_eq!(
            parse_change_source(Some("HEAD~2..HEAD"), None).unwrap(),
            ChangeSource::range("HEAD~2", "HEAD")
        );
        assert_eq!(
            parse_change_source(Some("v1.0"), None).unwrap(),
            ChangeSource::range("v1.0", "HEAD")
        );
    }

    #[test]
    fn test_build_options_from_args() {
        let matches = build_command()
            .try_get_matches_from([
                "preflight",
                "check",
                "HEAD~1..HEAD",
                "-p",
                "lint=./lint",
                "-i",
                "*.py",
                "--timeout",
                "5",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();

        let options = build_options(sub).unwrap();

        assert_eq!(options.plugins.len(), 1);
        assert_eq!(options.plugins[0].name, "lint");
        assert_eq!(options.filter.include.len(), 1);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.source, ChangeSource::range("HEAD~1", "HEAD"));
    }

    #[test]
    fn test_invalid_glob_is_an_error() {
        let matches = build_command()
            .try_get_matches_from(["preflight", "-e", "[broken"])
            .unwrap();
        assert!(build_options(&matches).is_err());
    }
}
