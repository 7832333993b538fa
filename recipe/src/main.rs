//! extract-recipe - rebuild prompt recipes from Claude Code history.
//!
//! Reads `~/.claude/history.jsonl` and prints the prompts issued in one
//! project (or all of them) as markdown or JSON.
//!
//! # Modes
//!
//! - `extract-recipe PROJECT`: recipe for the project matching PROJECT
//! - `extract-recipe --list`: projects with prompt and session counts
//! - `extract-recipe -a`: recipes for every project
//! - `extract-recipe --audit`: frequent capitalized words, for tuning stopwords
//! - `extract-recipe --init-config`: write the default pattern file
//!
//! # Environment Variables
//!
//! See the [`config`](extract_recipe::config) module for available options.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use extract_recipe::config::Config;
use extract_recipe::formatter::{
    audit_words, format_audit, format_project_list, Formatter, OutputFormat, RenderOptions,
};
use extract_recipe::history::PromptEntry;
use extract_recipe::load_sources;
use extract_recipe::matching::{fuzzy_suggest, match_projects};
use extract_recipe::patterns::init_user_config;
use extract_recipe::privacy::PrivacyPipeline;
use extract_recipe::session::{filter_by_project, list_projects, project_paths};

/// Extract prompt recipes from Claude Code history.
#[derive(Parser, Debug)]
#[command(name = "extract-recipe")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    EXTRACT_RECIPE_CLAUDE_DIR  Claude directory (default: ~/.claude)
    EXTRACT_RECIPE_CONFIG      Pattern file (default: ~/.config/extract-recipe/patterns.conf)
    RUST_LOG                   Log filter for diagnostics on stderr (default: warn)

EXAMPLES:
    extract-recipe --list                  list all projects
    extract-recipe myproject               match by substring
    extract-recipe -e comparison           exact final component (not comparison2)
    extract-recipe -a --format json        every project as one JSON document
    extract-recipe myproject --redact      mask paths, ids and secrets for sharing
")]
struct Cli {
    /// Project path, substring, or path suffix to match.
    ///
    /// Use / to disambiguate: 'foo/bar' matches only projects whose path
    /// contains that suffix.
    project: Option<String>,

    /// Claude directory containing history.jsonl and paste-cache/.
    #[arg(long, value_name = "DIR")]
    claude_dir: Option<PathBuf>,

    /// Pattern file overriding the packaged defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,

    /// List all projects with prompt and session counts.
    #[arg(long)]
    list: bool,

    /// Extract recipes for all projects.
    #[arg(short, long)]
    all: bool,

    /// Match by exact final path component(s) instead of substring.
    #[arg(short, long)]
    exact: bool,

    /// Write output to FILE instead of stdout.
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Mask home directories, session ids and credentials.
    #[arg(long)]
    redact: bool,

    /// Show prompts as typed: no boilerplate stripping or plan collapsing.
    #[arg(long)]
    raw: bool,

    /// Report frequent capitalized words not covered by [stopwords].
    #[arg(long)]
    audit: bool,

    /// Write the default pattern file to the config location and exit.
    #[arg(long)]
    init_config: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) if is_broken_pipe(&err) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::from_env()
        .context("Failed to load configuration")?
        .with_overrides(cli.claude_dir.clone(), cli.config.clone());

    if cli.init_config {
        let path = init_user_config(config.patterns_path())?;
        println!("Created {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let (patterns, history) = load_sources(&config)?;
    if !history.malformed.is_empty() {
        info!(
            skipped = history.malformed.len(),
            "Some history lines could not be parsed"
        );
    }
    let entries = history.entries;
    debug!(prompts = entries.len(), "Loaded history");

    if cli.list {
        let mut projects = list_projects(&entries);
        if cli.redact {
            let pipeline = PrivacyPipeline::new(&patterns);
            for summary in &mut projects {
                summary.project = pipeline.redact_text(&summary.project);
            }
        }
        write_output(&format_project_list(&projects), cli.output.as_deref())?;
        return Ok(ExitCode::SUCCESS);
    }

    let all_paths = project_paths(&entries);

    let selected: Vec<&str> = if cli.all || (cli.audit && cli.project.is_none()) {
        all_paths.iter().map(String::as_str).collect()
    } else {
        let Some(target) = cli.project.as_deref() else {
            Cli::command()
                .error(
                    ErrorKind::MissingRequiredArgument,
                    "please provide a project path, -a, or --list",
                )
                .exit();
        };
        match resolve_project(target, &all_paths, cli.exact) {
            Some(project) => vec![project],
            None => return Ok(ExitCode::FAILURE),
        }
    };

    if cli.audit {
        let scoped: Vec<&PromptEntry> = selected
            .iter()
            .flat_map(|project| filter_by_project(&entries, project))
            .collect();
        let words = audit_words(&scoped, &patterns);
        write_output(&format_audit(&words), cli.output.as_deref())?;
        return Ok(ExitCode::SUCCESS);
    }

    let options = RenderOptions {
        redact: cli.redact,
        raw: cli.raw,
    };
    let paste_cache_dir = config.paste_cache_dir();
    let formatter = Formatter::new(&patterns, &paste_cache_dir, options);

    let recipes = formatter.build(&entries, &selected);
    let output = formatter
        .render(&recipes, cli.format, cli.all)
        .context("Failed to serialize recipe")?;
    write_output(&output, cli.output.as_deref())?;

    Ok(ExitCode::SUCCESS)
}

/// Resolves the PROJECT argument, explaining on stderr when it cannot.
fn resolve_project<'a>(target: &str, all_paths: &'a [String], exact: bool) -> Option<&'a str> {
    let matches = match_projects(target, all_paths, exact);
    match matches.as_slice() {
        [project] => return Some(*project),
        [] => {}
        _ => {
            eprintln!(
                "Multiple projects match '{target}', please specify the path or an identifying substring:"
            );
            for project in &matches {
                eprintln!("  {project}");
            }
            return None;
        }
    }

    let suggestions = fuzzy_suggest(target, all_paths);
    if suggestions.is_empty() {
        eprintln!(
            "No projects match '{target}'. Run extract-recipe --list to see available projects."
        );
    } else {
        eprintln!("No projects match '{target}'. Similar projects:");
        for project in suggestions {
            eprintln!("  {project}");
        }
    }
    None
}

/// Writes to FILE, or to stdout when no file was given.
fn write_output(output: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// True if the error chain bottoms out in a closed stdout pipe.
fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::BrokenPipe)
    })
}

/// Initializes the logging subsystem.
///
/// Logs go to stderr so they never mix with the recipe on stdout.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .init();
}
