//! Command-line and environment options, and the typed configuration they
//! are validated into before anything touches the network.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::conduit::Credentials;
use crate::coverage::{CoverageCollector, DEFAULT_COVERAGE_FILE, DEFAULT_SOURCE_SUFFIX};
use crate::diff_id::DiffId;
use crate::error::{PhabciError, Result};
use crate::model::Status;
use crate::report::BUILD_RESULT_NAME;
use crate::trigger::{TriggerSettings, DEFAULT_PING_TIMEOUT};

/// Where to reach Conduit and who to authenticate as.
#[derive(Args, Debug, Clone)]
pub struct ConduitArgs {
    /// Conduit API endpoint, e.g. https://phabricator.example.com/api/
    #[arg(long, env = "CONDUIT_URI")]
    pub conduit_uri: Option<String>,

    /// Service account used for `conduit.connect`.
    #[arg(long, env = "CONDUIT_USER", default_value = "svcscm")]
    pub conduit_user: String,

    /// Certificate of the service account.
    #[arg(long, env = "CONDUIT_CERTIFICATE", hide_env_values = true)]
    pub conduit_certificate: Option<String>,
}

impl ConduitArgs {
    /// Endpoint and credentials, checked only once the job input is known
    /// to be valid so a bad `GIT_BRANCH` is reported first.
    pub fn resolve(&self) -> Result<(String, Credentials)> {
        let uri = non_empty(&self.conduit_uri)
            .ok_or(PhabciError::MissingSetting("CONDUIT_URI"))?;
        let certificate = non_empty(&self.conduit_certificate)
            .ok_or(PhabciError::MissingSetting("CONDUIT_CERTIFICATE"))?;
        Ok((
            uri,
            Credentials {
                user: self.conduit_user.clone(),
                certificate,
            },
        ))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Branch being built; autobuilds use `refs/autobuilds/<diff id>`.
#[derive(Args, Debug, Clone, Default)]
pub struct BranchArgs {
    #[arg(long = "branch", env = "GIT_BRANCH")]
    pub git_branch: Option<String>,
}

impl BranchArgs {
    pub fn diff_id(&self) -> Result<DiffId> {
        DiffId::from_branch(self.git_branch.as_deref())
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub branch: BranchArgs,

    /// Kind of build, as set by the CI job.
    #[arg(long, env = "BUILD_TYPE")]
    pub build_type: Option<String>,

    /// Report this status for the whole build and exit.
    #[arg(long, value_enum)]
    pub status: Option<Status>,

    /// Message sent along with --status.
    #[arg(long)]
    pub message: Option<String>,

    /// Name of the build.
    #[arg(long)]
    pub name: Option<String>,

    /// Read newline-delimited JSON results from standard input.
    #[arg(long)]
    pub stdin: bool,

    /// Coverage map written by `phabci convert`.
    #[arg(long, default_value = DEFAULT_COVERAGE_FILE)]
    pub coverage_file: PathBuf,

    /// Only changed files with this suffix get coverage (repeatable).
    #[arg(long = "source-suffix", default_values_t = [DEFAULT_SOURCE_SUFFIX.to_string()])]
    pub source_suffixes: Vec<String>,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            branch: BranchArgs::default(),
            build_type: None,
            status: None,
            message: None,
            name: None,
            stdin: false,
            coverage_file: PathBuf::from(DEFAULT_COVERAGE_FILE),
            source_suffixes: vec![DEFAULT_SOURCE_SUFFIX.to_string()],
        }
    }
}

/// What a `report` invocation sends.
#[derive(Debug)]
pub enum ReportMode {
    /// A single build-level status.
    Direct {
        name: String,
        status: Status,
        message: String,
    },
    /// Results piped in on standard input.
    Piped,
    /// Coverage of the files changed by `HEAD`.
    Coverage(CoverageCollector),
}

#[derive(Debug)]
pub struct ReportConfig {
    pub diff_id: DiffId,
    pub build_type: Option<String>,
    pub mode: ReportMode,
}

impl ReportConfig {
    /// Resolve the diff ID and pick the mode: `--status` wins over
    /// `--stdin`, and the coverage mode requires `--name`.
    pub fn from_args(args: &ReportArgs) -> Result<Self> {
        let diff_id = args.branch.diff_id()?;

        let mode = if let Some(status) = args.status {
            ReportMode::Direct {
                name: args
                    .name
                    .clone()
                    .unwrap_or_else(|| BUILD_RESULT_NAME.to_string()),
                status,
                message: args.message.clone().unwrap_or_default(),
            }
        } else if args.stdin {
            ReportMode::Piped
        } else {
            let name = args
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .ok_or(PhabciError::MissingName)?;
            let mut collector = CoverageCollector::new(name);
            collector.coverage_file = args.coverage_file.clone();
            collector.suffixes = args.source_suffixes.clone();
            ReportMode::Coverage(collector)
        };

        Ok(Self {
            diff_id,
            build_type: args.build_type.clone(),
            mode,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct TriggerArgs {
    /// Diff to build.
    #[arg(long)]
    pub diff_id: DiffId,

    /// Return a postponed placeholder result once the build is requested.
    #[arg(long = "async")]
    pub async_tests: bool,

    /// Base URL of the build server.
    #[arg(long, env = "PHABCI_BUILD_SERVER")]
    pub build_server: String,

    /// Repository URL the build server polls.
    #[arg(long, env = "PHABCI_REPO_URL")]
    pub repo_url: String,

    #[arg(long, default_value = "origin")]
    pub remote: String,

    /// Name of the placeholder result.
    #[arg(long, default_value = BUILD_RESULT_NAME)]
    pub name: String,

    /// Ceiling on the build server request.
    #[arg(long, default_value_t = DEFAULT_PING_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
}

impl TriggerArgs {
    pub fn settings(&self) -> TriggerSettings {
        TriggerSettings {
            remote: self.remote.clone(),
            name: self.name.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            ..TriggerSettings::new(&self.build_server, &self.repo_url)
        }
    }
}
