use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use patchiman::config::load_for_directory;
use patchiman::error::{clamp_exit, ENOENT};
use patchiman::orchestrator::{Orchestrator, PatchReport, Reporter};
use patchiman::outcome::{failure_reason, PatchOutcome};
use patchiman::staging::StagingPair;
use patchiman::{storage, LogConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "patchiman")]
#[command(about = "Apply, dehunk and revert patch sets against a staged project", long_about = None)]
#[command(version)]
struct Cli {
    /// Output extra information (repeat for more)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replicate a project into the directories used for testing patches
    Deploy {
        /// Where to put the compared directories
        #[arg(short = 'C', long, default_value = ".")]
        directory: PathBuf,

        /// Project to replicate
        project: PathBuf,
    },

    /// Try to apply patches
    Apply {
        /// Directory holding the compared directories
        #[arg(short = 'C', long, default_value = ".")]
        directory: PathBuf,

        /// Patch files, applied in order
        #[arg(required = true)]
        patches: Vec<PathBuf>,
    },

    /// Revert patches, last one first
    Revert {
        /// Patched directory
        #[arg(short = 'C', long, default_value = ".")]
        directory: PathBuf,

        /// Patch files, in the order they were applied
        #[arg(required = true)]
        patches: Vec<PathBuf>,
    },

    /// Drop already-satisfied hunks from patches
    Dehunk {
        /// Directory holding the compared directories
        #[arg(short = 'C', long, default_value = ".")]
        directory: PathBuf,

        /// Patch files, processed in order
        #[arg(required = true)]
        patches: Vec<PathBuf>,
    },

    /// Initialize patch storage in a project
    Init {
        /// Project root
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },

    /// Move a patch to the postponed category
    Postpone {
        /// Project root
        #[arg(long, default_value = ".")]
        project: PathBuf,

        /// Patch file name inside the storage
        name: String,
    },

    /// Recreate links to committed patches
    Relink {
        /// Project root
        #[arg(long, default_value = ".")]
        project: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    let log = LogConfig::from_verbosity(cli.verbose);
    log.init();

    let code = match run(cli.command, log) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            err.downcast_ref::<patchiman::Error>()
                .map_or(1, patchiman::Error::exit_code)
        }
    };
    std::process::exit(code);
}

fn run(command: Commands, log: LogConfig) -> Result<i32> {
    match command {
        Commands::Deploy { directory, project } => cmd_deploy(&directory, &project),
        Commands::Apply {
            directory,
            patches,
        } => cmd_apply(&directory, &patches, log),
        Commands::Revert {
            directory,
            patches,
        } => cmd_revert(&directory, &patches, log),
        Commands::Dehunk {
            directory,
            patches,
        } => cmd_dehunk(&directory, &patches, log),
        Commands::Init { project } => cmd_init(&project),
        Commands::Postpone { project, name } => cmd_postpone(&project, &name),
        Commands::Relink { project } => cmd_relink(&project),
    }
}

/// Prints one status line per patch as soon as it is handled.
struct ConsoleReporter {
    applied: usize,
    failed: usize,
}

impl ConsoleReporter {
    fn new() -> Self {
        Self {
            applied: 0,
            failed: 0,
        }
    }

    fn summary(&self) {
        println!();
        println!("{}", "Summary:".bold());
        println!("  {} applied", format!("{}", self.applied).green());
        println!("  {} failed", format!("{}", self.failed).red());
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, report: &PatchReport) {
        let name = report.patch.display();
        match report.outcome {
            PatchOutcome::Applied => {
                self.applied += 1;
                println!("{} {}", "✓".green().bold(), name);
            }
            PatchOutcome::PartiallyApplied if report.rewritten => {
                self.applied += 1;
                println!("{} {} (dehunked)", "⚠".yellow().bold(), name);
            }
            PatchOutcome::PartiallyApplied => {
                self.applied += 1;
                println!(
                    "{} {} (Consider running dehunk command)",
                    "⚠".yellow().bold(),
                    name
                );
            }
            outcome => {
                self.failed += 1;
                println!(
                    "{} {} ({})",
                    "✗".red().bold(),
                    name,
                    failure_reason(outcome).unwrap_or("Error")
                );
            }
        }
    }
}

/// Use the parent when a file is given where a directory is expected.
fn resolve_directory(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        return Ok(path.to_path_buf());
    }
    if path.exists() {
        tracing::info!(path = %path.display(), "found file, but expect directory");
        let parent = path
            .canonicalize()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        tracing::info!(path = %parent.display(), "forced to parent directory");
        return Ok(parent);
    }
    Err(patchiman::Error::Staging(patchiman::StagingError::MissingDirectory(
        path.to_path_buf(),
    )))
    .context("invalid -C/--directory")
}

/// Patch arguments must exist before anything is touched.
fn check_patches_exist(patches: &[PathBuf]) -> Option<i32> {
    let missing: Vec<_> = patches.iter().filter(|p| !p.is_file()).collect();
    if missing.is_empty() {
        return None;
    }
    for patch in missing {
        eprintln!("{} {} not found", "✗".red().bold(), patch.display());
    }
    Some(ENOENT)
}

fn cmd_deploy(directory: &Path, project: &Path) -> Result<i32> {
    let directory = resolve_directory(directory)?;
    let config = load_for_directory(&directory).map_err(patchiman::Error::from)?;

    StagingPair::create(project, &directory, &config.staging)
        .map_err(patchiman::Error::from)
        .with_context(|| format!("failed to deploy {}", project.display()))?;
    println!("{} successfully deployed", project.display());
    Ok(0)
}

fn cmd_apply(directory: &Path, patches: &[PathBuf], log: LogConfig) -> Result<i32> {
    if let Some(code) = check_patches_exist(patches) {
        return Ok(code);
    }
    let directory = resolve_directory(directory)?;
    let config = load_for_directory(&directory).map_err(patchiman::Error::from)?;
    let pair = StagingPair::open(&directory, &config.staging).map_err(patchiman::Error::from)?;

    let orchestrator = Orchestrator::from_config(&config, log);
    let mut reporter = ConsoleReporter::new();
    let failures = orchestrator.apply(&pair, patches, &mut reporter)?;
    reporter.summary();
    Ok(clamp_exit(failures))
}

fn cmd_revert(directory: &Path, patches: &[PathBuf], log: LogConfig) -> Result<i32> {
    if let Some(code) = check_patches_exist(patches) {
        return Ok(code);
    }
    let directory = resolve_directory(directory)?;
    let config = load_for_directory(&directory).map_err(patchiman::Error::from)?;

    let orchestrator = Orchestrator::from_config(&config, log);
    let mut reporter = ConsoleReporter::new();
    orchestrator.revert(&directory, patches, &mut reporter)?;
    Ok(0)
}

fn cmd_dehunk(directory: &Path, patches: &[PathBuf], log: LogConfig) -> Result<i32> {
    if let Some(code) = check_patches_exist(patches) {
        return Ok(code);
    }
    let directory = resolve_directory(directory)?;
    let config = load_for_directory(&directory).map_err(patchiman::Error::from)?;
    let pair = StagingPair::open(&directory, &config.staging).map_err(patchiman::Error::from)?;

    let orchestrator = Orchestrator::from_config(&config, log);
    let mut reporter = ConsoleReporter::new();
    let failures = orchestrator.dehunk(&pair, patches, &mut reporter)?;
    reporter.summary();
    Ok(clamp_exit(failures))
}

fn cmd_init(project: &Path) -> Result<i32> {
    storage::init(project).map_err(patchiman::Error::from)?;
    println!("storage initialized in {}", storage::storage_path(project).display());
    Ok(0)
}

fn cmd_postpone(project: &Path, name: &str) -> Result<i32> {
    let moved = storage::postpone(project, name).map_err(patchiman::Error::from)?;
    println!("{} postponed to {}", name, moved.display());
    Ok(0)
}

fn cmd_relink(project: &Path) -> Result<i32> {
    let linked = storage::relink(project).map_err(patchiman::Error::from)?;
    println!("{} committed patch(es) linked", linked);
    Ok(0)
}
