//! Command handler functions for the phabci CLI.
//!
//! Collaborators (Conduit, git, the build server) are passed in so the
//! handlers can be driven by fakes in tests.

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::conduit::Conduit;
use crate::config::{BranchArgs, ReportConfig, ReportMode, TriggerArgs};
use crate::convert::{convert_reports, PathMapper};
use crate::detect::Format;
use crate::report::{read_results, Reporter};
use crate::trigger::{BuildServer, BuildTrigger};
use crate::vcs::Vcs;

/// Send the results selected by `config.mode` to the diff. Returns the
/// number of results reported.
pub fn cmd_report(
    config: &ReportConfig,
    conduit: &dyn Conduit,
    vcs: &dyn Vcs,
    input: impl BufRead,
    out: &mut dyn Write,
) -> Result<usize> {
    if let Some(build_type) = &config.build_type {
        debug!("BUILD_TYPE={build_type}");
    }
    let mut reporter = Reporter::new(conduit, &config.diff_id, out);

    let results = match &config.mode {
        ReportMode::Direct {
            name,
            status,
            message,
        } => {
            reporter
                .report_status(name, *status, message)
                .context("Failed to report build status")?;
            return Ok(1);
        }
        ReportMode::Piped => read_results(input).context("Failed to read results from stdin")?,
        ReportMode::Coverage(collector) => collector
            .collect(vcs)
            .context("Failed to collect coverage")?,
    };

    if results.is_empty() {
        warn!("No results to report for diff {}", config.diff_id);
        return Ok(0);
    }
    let count = reporter
        .report_all(&results)
        .context("Failed to report results")?;
    Ok(count)
}

pub fn cmd_diff_id(branch: &BranchArgs) -> Result<String> {
    let diff_id = branch.diff_id()?;
    Ok(format!("{diff_id}\n"))
}

/// Start a build for the diff. In async mode the output holds the
/// postponed placeholder as a JSON line, ready for `phabci report --stdin`.
pub fn cmd_trigger(args: &TriggerArgs, vcs: &dyn Vcs, server: &dyn BuildServer) -> Result<String> {
    let trigger = BuildTrigger::new(vcs, server, args.settings(), args.async_tests);
    let results = trigger.run();

    // The diff already exists; outside async mode the build is started here.
    let started = trigger
        .on_diff_created(&args.diff_id)
        .and_then(|started| {
            if started {
                Ok(())
            } else {
                trigger.start_build(&args.diff_id)
            }
        });
    started.with_context(|| format!("Failed to start a build for diff {}", args.diff_id))?;

    let mut out = String::new();
    for result in &results {
        writeln!(out, "{}", serde_json::to_string(result)?)?;
    }
    Ok(out)
}

pub fn cmd_convert(
    reports: &[PathBuf],
    format: Option<Format>,
    mapper: &PathMapper,
    output: &Path,
) -> Result<String> {
    let paths: Vec<&Path> = reports.iter().map(PathBuf::as_path).collect();
    let map = convert_reports(&paths, format, mapper).context("Failed to convert coverage")?;

    let json = serde_json::to_string_pretty(&map)?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote coverage for {} files", map.len());

    Ok(format!(
        "Converted {} report(s) -> {} ({} files)\n",
        reports.len(),
        output.display(),
        map.len()
    ))
}
