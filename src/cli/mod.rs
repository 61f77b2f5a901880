//! Command-line interface

use crate::case::{self, CaseHeader, CaseWriter, RecordingStore};
use crate::command::{FsStore, NoopFormatter};
use crate::config::RecipeConfig;
use crate::recipe::{self, BarObserver, RunContext, RunResult};
use crate::source::FileWalker;
use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Run codemod recipes across a file tree with a pool of parallel workers.
#[derive(Parser)]
#[command(name = "codemill", version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a recipe over a file tree
    Run {
        /// Recipe file (YAML)
        recipe: PathBuf,

        /// Root of the file tree to rewrite
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Include glob, relative to the root (repeatable; everything when omitted)
        #[arg(long = "include")]
        include: Vec<String>,

        /// Exclude glob, relative to the root (repeatable)
        #[arg(long = "exclude")]
        exclude: Vec<String>,

        /// Stop after this many files
        #[arg(long)]
        max_files: Option<usize>,

        /// Worker pool size
        #[arg(short = 'j', long, default_value_t = 4)]
        jobs: usize,

        /// Record mutations into this case log instead of applying them
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Inspect recorded case logs
    Case {
        #[command(subcommand)]
        command: CaseCommands,
    },
}

#[derive(Subcommand)]
pub enum CaseCommands {
    /// List the frames of a case log
    Show { file: PathBuf },
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run {
            recipe,
            path,
            include,
            exclude,
            max_files,
            jobs,
            record,
        } => run_recipe(recipe, path, include, exclude, max_files, jobs, record).await,
        Commands::Case {
            command: CaseCommands::Show { file },
        } => show_case(file).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_recipe(
    recipe_path: PathBuf,
    root: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
    max_files: Option<usize>,
    jobs: usize,
    record: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = RecipeConfig::from_path(&recipe_path)
        .with_context(|| format!("loading recipe {}", recipe_path.display()))?;
    let steps = config.load_steps()?;
    let walker = FileWalker::new(&root, &include, &exclude, max_files)?;
    let observer = BarObserver::new();
    let pool_size = jobs.max(1);

    let result = match record {
        Some(case_path) => {
            let case_id = Uuid::new_v4();
            let writer = CaseWriter::create(&case_path)
                .await
                .with_context(|| format!("creating case log {}", case_path.display()))?;
            let recording = RecordingStore::new(
                case_id,
                std::env::temp_dir().join("codemill-staging"),
                writer,
            );
            recording
                .record_header(CaseHeader {
                    case_id,
                    step_id: config.name.clone(),
                    created_at: Utc::now(),
                    target_root: root.clone(),
                    args: config.steps[0].argument_record()?,
                })
                .await?;
            let result = recipe::run(
                &steps,
                walker,
                RunContext {
                    store: &recording,
                    reader: &FsStore,
                    formatter: &NoopFormatter,
                    pool_size,
                    observer: &observer,
                },
            )
            .await?;
            recording.finish().await?;
            println!("recorded case {case_id} -> {}", case_path.display());
            result
        }
        None => {
            recipe::run(
                &steps,
                walker,
                RunContext {
                    store: &FsStore,
                    reader: &FsStore,
                    formatter: &NoopFormatter,
                    pool_size,
                    observer: &observer,
                },
            )
            .await?
        }
    };

    report(&result);
    Ok(())
}

fn report(result: &RunResult) {
    println!(
        "{} step(s), {} item(s), {} command(s) applied",
        result.steps_completed, result.items_processed, result.commands_applied
    );
    if !result.is_clean() {
        eprintln!("{} item(s) faulted:", result.faults.len());
        for fault in &result.faults {
            eprintln!("  {}: {}", fault.path.display(), fault.message);
        }
    }
}

async fn show_case(file: PathBuf) -> anyhow::Result<()> {
    let (header, jobs) = case::reader::read_all(&file)
        .await
        .with_context(|| format!("reading case log {}", file.display()))?;
    println!(
        "case {} step '{}' recorded {} over {}",
        header.case_id,
        header.step_id,
        header.created_at.to_rfc3339(),
        header.target_root.display()
    );
    for job in &jobs {
        println!("  {}  {}  {}", job.job_id, job.command, job.path_content_hash);
    }
    println!("{} job record(s)", jobs.len());
    Ok(())
}
