use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use covnorm::cli;
use covnorm::formatters::Registry;
use covnorm::ingest::FormatOptions;
use covnorm::output::Sink;
use covnorm::resolve::{GitBlobResolver, PathResolver};

/// Normalize coverage reports from many tools into one canonical report.
#[derive(Parser)]
#[command(name = "covnorm", version, about)]
struct Cli {
    /// Log filter used when RUST_LOG is not set (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Shorthand for --log-level debug.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate, parse and normalize a coverage report.
    FormatCoverage {
        /// Path to the coverage file. Requires --input-type.
        coverage_path: Option<PathBuf>,

        /// Formatter to use. If omitted, every formatter's default locations are probed.
        #[arg(short = 't', long)]
        input_type: Option<String>,

        /// Where to write the normalized report ("-" for stdout).
        #[arg(short, long, default_value = "coverage/covnorm.json")]
        output: PathBuf,

        /// Directory to strip from absolute paths (default: current directory).
        #[arg(short, long)]
        prefix: Option<PathBuf>,

        /// Prefix to prepend to every path after stripping.
        #[arg(long)]
        add_prefix: Option<String>,

        /// Directory that default report locations are relative to.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Skip git blob lookup for source files.
        #[arg(long)]
        no_blob: bool,
    },

    /// List the available formatters in discovery order.
    Formatters,

    /// Show totals and per-file coverage of a normalized report.
    Summary {
        /// Path to a report written by format-coverage.
        #[arg(default_value = "coverage/covnorm.json")]
        report: PathBuf,

        /// Sort by coverage rate ascending (show worst files first).
        #[arg(long)]
        sort_by_coverage: bool,

        /// Show only the uncovered lines of this source file.
        #[arg(long)]
        uncovered: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.parse().unwrap_or_default()),
        )
        .init();

    let registry = Registry::builtin();

    match cli.command {
        Commands::FormatCoverage {
            coverage_path,
            input_type,
            output,
            prefix,
            add_prefix,
            root,
            no_blob,
        } => {
            if coverage_path.is_some() && input_type.is_none() {
                bail!(
                    "when a coverage path is given, --input-type is required (one of: {})",
                    registry.names().join(", ")
                );
            }

            let prefix = match prefix {
                Some(p) => p,
                None => std::env::current_dir().context("Failed to read current directory")?,
            };
            let mut resolver = PathResolver::new(Some(&prefix), add_prefix.as_deref());
            if !no_blob {
                resolver = resolver.with_blob_resolver(Box::new(GitBlobResolver::new(&prefix)));
            }

            let opts = FormatOptions {
                coverage_path,
                input_type,
                output: Sink::from_arg(&output),
                search_root: root,
            };
            let out = cli::cmd_format_coverage(&registry, &opts, &resolver)?;
            eprint!("{}", out);
        }
        Commands::Formatters => print!("{}", cli::cmd_formatters(&registry)),
        Commands::Summary {
            report,
            sort_by_coverage,
            uncovered,
        } => {
            let out = match uncovered {
                Some(source_file) => cli::cmd_uncovered(&report, &source_file)?,
                None => cli::cmd_summary(&report, sort_by_coverage)?,
            };
            print!("{}", out);
        }
    }
    Ok(())
}
