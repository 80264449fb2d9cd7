//! Starting a CI build for a diff.
//!
//! The commit under review is pushed to `refs/autobuilds/<diff id>` and the
//! build server is asked to poll the repository. The build job then runs
//! `phabci report` to attach its results to the diff.

use std::time::Duration;

use log::info;

use crate::diff_id::DiffId;
use crate::error::Result;
use crate::model::{Status, TestResult};
use crate::report::BUILD_RESULT_NAME;
use crate::vcs::Vcs;

pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Notifies the build server that new commits are available.
pub trait BuildServer {
    fn ping(&self, url: &str, timeout: Duration) -> Result<()>;
}

/// Build server reached over plain HTTP GET.
pub struct HttpBuildServer;

impl BuildServer for HttpBuildServer {
    fn ping(&self, url: &str, timeout: Duration) -> Result<()> {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent("phabci")
            .build();
        agent.get(url).call()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TriggerSettings {
    /// Base URL of the build server, e.g. `http://ci.example.com`.
    pub build_server: String,
    /// Repository URL the build server has configured for the job.
    pub repo_url: String,
    pub remote: String,
    /// Name of the placeholder result reported while the build runs.
    pub name: String,
    pub timeout: Duration,
}

impl TriggerSettings {
    pub fn new(build_server: impl Into<String>, repo_url: impl Into<String>) -> Self {
        Self {
            build_server: build_server.into(),
            repo_url: repo_url.into(),
            remote: "origin".to_string(),
            name: BUILD_RESULT_NAME.to_string(),
            timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    /// The build server's commit-notification hook for our repository.
    pub fn notify_url(&self) -> String {
        format!(
            "{}/git/notifyCommit?url={}",
            self.build_server.trim_end_matches('/'),
            self.repo_url
        )
    }
}

pub struct BuildTrigger<'a> {
    vcs: &'a dyn Vcs,
    server: &'a dyn BuildServer,
    settings: TriggerSettings,
    async_tests: bool,
}

impl<'a> BuildTrigger<'a> {
    pub fn new(
        vcs: &'a dyn Vcs,
        server: &'a dyn BuildServer,
        settings: TriggerSettings,
        async_tests: bool,
    ) -> Self {
        Self {
            vcs,
            server,
            settings,
            async_tests,
        }
    }

    /// Results available right away. In async mode that is a single
    /// postponed placeholder; the real result is reported by the build.
    pub fn run(&self) -> Vec<TestResult> {
        if self.async_tests {
            vec![TestResult::new(self.settings.name.clone(), Status::Postponed)]
        } else {
            Vec::new()
        }
    }

    /// Called once the diff exists. Only async mode starts a build here.
    pub fn on_diff_created(&self, diff_id: &DiffId) -> Result<bool> {
        if !self.async_tests {
            return Ok(false);
        }
        self.start_build(diff_id)?;
        Ok(true)
    }

    /// Push `HEAD` to the diff's autobuild ref, then ping the build server.
    pub fn start_build(&self, diff_id: &DiffId) -> Result<()> {
        let refname = diff_id.autobuild_ref();
        self.vcs.push_ref(&self.settings.remote, &refname)?;
        info!("Pushed HEAD to {} {}", self.settings.remote, refname);

        info!("Launching a build on {}", self.settings.build_server);
        self.server
            .ping(&self.settings.notify_url(), self.settings.timeout)?;
        Ok(())
    }
}
