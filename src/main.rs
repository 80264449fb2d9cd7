use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use phabci::cli::{cmd_convert, cmd_diff_id, cmd_report, cmd_trigger};
use phabci::conduit::ConduitClient;
use phabci::config::{BranchArgs, ConduitArgs, ReportArgs, ReportConfig, TriggerArgs};
use phabci::convert::PathMapper;
use phabci::detect::Format;
use phabci::error::PhabciError;
use phabci::trigger::HttpBuildServer;
use phabci::vcs::GitCli;

/// phabci — Report CI build and coverage results to Phabricator diffs.
#[derive(Parser)]
#[command(name = "phabci", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach build status, piped results, or changed-file coverage to the
    /// diff named by GIT_BRANCH.
    Report {
        #[command(flatten)]
        args: ReportArgs,

        #[command(flatten)]
        conduit: ConduitArgs,
    },

    /// Print the diff ID parsed from GIT_BRANCH.
    DiffId {
        #[command(flatten)]
        branch: BranchArgs,
    },

    /// Push HEAD to the diff's autobuild ref and ask the build server to
    /// build it.
    Trigger {
        #[command(flatten)]
        args: TriggerArgs,
    },

    /// Convert Cobertura or JaCoCo XML reports into a coverage map.
    Convert {
        /// Coverage reports to convert; files present in several reports
        /// are merged.
        #[arg(required = true)]
        reports: Vec<PathBuf>,

        /// Override format detection (cobertura, jacoco).
        #[arg(long)]
        format: Option<Format>,

        /// Remove this prefix from report paths (repeatable).
        #[arg(long)]
        strip_prefix: Vec<String>,

        /// Prepend this directory to report paths after stripping.
        #[arg(long)]
        add_prefix: Option<String>,

        /// Where to write the coverage map.
        #[arg(short, long, default_value = "coverage.json")]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<PhabciError>() {
            Some(e) if e.is_config() => {
                println!("Error: {e}");
                ExitCode::from(1)
            }
            _ => {
                eprintln!("Error: {err:?}");
                ExitCode::from(2)
            }
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Report { args, conduit } => {
            let config = ReportConfig::from_args(&args)?;
            let (uri, credentials) = conduit.resolve()?;
            let client = ConduitClient::connect(&uri, &credentials)
                .context("Failed to connect to Conduit")?;
            let count = cmd_report(
                &config,
                &client,
                &GitCli::new(),
                io::stdin().lock(),
                &mut io::stdout().lock(),
            )?;
            info!("Done: {} result(s) sent to diff {}", count, config.diff_id);
            Ok(())
        }
        Commands::DiffId { branch } => {
            print!("{}", cmd_diff_id(&branch)?);
            Ok(())
        }
        Commands::Trigger { args } => {
            print!("{}", cmd_trigger(&args, &GitCli::new(), &HttpBuildServer)?);
            Ok(())
        }
        Commands::Convert {
            reports,
            format,
            strip_prefix,
            add_prefix,
            output,
        } => {
            let mapper = PathMapper {
                strip_prefixes: strip_prefix,
                add_prefix,
            };
            print!("{}", cmd_convert(&reports, format, &mapper, &output)?);
            Ok(())
        }
    }
}
