use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use flagtree_engine::{CommandNode, HelpRenderer, ParseOptions, PlainHelp};
use flagtree_manifest::{Manifest, ManifestError, validate_manifest};
use tracing::debug;

/// Output format for `inspect`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
    /// Rendered help text
    Text,
}

#[derive(Debug, Parser)]
#[command(name = "flagtree", version)]
#[command(about = "Run and inspect declarative command manifests")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse arguments against a manifest and print the outcome as JSON.
    Run(RunArgs),
    /// Print the command tree described by a manifest.
    Inspect(InspectArgs),
    /// Validate a manifest and list every problem found.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Manifest file (.yaml, .yml or .json).
    #[arg(long)]
    manifest: PathBuf,
    /// Report parse errors on stderr instead of as a JSON outcome.
    #[arg(long)]
    throw: bool,
    /// Treat -h/--help as ordinary tokens.
    #[arg(long)]
    skip_help: bool,
    /// Print the outcome on one line.
    #[arg(long)]
    compact: bool,
    /// Arguments to parse, after `--`.
    #[arg(last = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Manifest file (.yaml, .yml or .json).
    #[arg(long)]
    manifest: PathBuf,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Subcommand path to inspect instead of the root (e.g. `remote add`).
    path: Vec<String>,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Manifest file (.yaml, .yml or .json).
    #[arg(long)]
    manifest: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Inspect(args) => inspect(args),
        Command::Check(args) => check(args),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load(path: &Path) -> anyhow::Result<Manifest> {
    Manifest::load(path).with_context(|| format!("failed to load manifest {}", path.display()))
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}

async fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    let mut manifest = load(&args.manifest)?;
    if args.throw {
        manifest.settings.handle_errors = false;
    }
    let root = manifest.build()?;

    let mut options = ParseOptions::default();
    if args.skip_help {
        options = options.skip_help();
    }

    debug!(root = %root.name(), args = ?args.args, "Running manifest");
    let outcome = match root.parse(&args.args, &options).await {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(exit_code(err.exit_code()));
        }
    };

    if outcome.is_help() {
        print!("{}", outcome.message.as_deref().unwrap_or_default());
    } else if args.compact {
        println!("{}", serde_json::to_string(&outcome)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }
    Ok(exit_code(outcome.exit_code))
}

fn find<'a>(root: &'a CommandNode, path: &[String]) -> anyhow::Result<&'a CommandNode> {
    let mut node = root;
    for name in path {
        node = match node.subcommand(name) {
            Some(child) => child,
            None => bail!("no subcommand '{name}' under '{}'", node.path().join(" ")),
        };
    }
    Ok(node)
}

fn inspect(args: InspectArgs) -> anyhow::Result<ExitCode> {
    let root = load(&args.manifest)?.build()?;
    let summary = find(&root, &args.path)?.summary();

    match args.format {
        CliOutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        CliOutputFormat::Yaml => print!("{}", serde_yaml::to_string(&summary)?),
        CliOutputFormat::Text => print!("{}", PlainHelp.render(&summary)),
    }
    Ok(ExitCode::SUCCESS)
}

fn check(args: CheckArgs) -> anyhow::Result<ExitCode> {
    let manifest = load(&args.manifest)?;
    let issues = validate_manifest(&manifest);
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("  {issue}");
        }
        eprintln!("{} issue(s) found in {}", issues.len(), args.manifest.display());
        return Ok(ExitCode::FAILURE);
    }

    let root = match manifest.build() {
        Ok(root) => root,
        Err(err @ ManifestError::Registry { .. }) => {
            eprintln!("  {err}");
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => return Err(err.into()),
    };

    println!(
        "Manifest {} is valid: {} command(s).",
        args.manifest.display(),
        root.summary().command_count()
    );
    Ok(ExitCode::SUCCESS)
}
