//! Resolution of the Differential diff ID from the CI branch name.
//!
//! Autobuilds are pushed to `refs/autobuilds/<diff id>`, so the job's
//! `GIT_BRANCH` carries the ID in its final path segment.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PhabciError, Result};

/// Prefix of the refs that autobuilds are pushed to.
pub const AUTOBUILD_REF_PREFIX: &str = "refs/autobuilds/";

static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Identifier of a diff in the review tool.
///
/// Only checked to contain a digit somewhere, so a segment like
/// `abc123def` is accepted and kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffId(String);

impl DiffId {
    /// Take the last `/`-separated segment of `git_branch`.
    pub fn from_branch(git_branch: Option<&str>) -> Result<Self> {
        let branch = match git_branch {
            Some(b) if !b.is_empty() => b,
            _ => return Err(PhabciError::MissingBranch),
        };
        let segment = branch.rsplit('/').next().unwrap_or(branch);
        segment.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ref the commit under review is pushed to for this diff.
    pub fn autobuild_ref(&self) -> String {
        format!("{AUTOBUILD_REF_PREFIX}{}", self.0)
    }
}

impl std::str::FromStr for DiffId {
    type Err = PhabciError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if DIGIT_RE.is_match(s) {
            Ok(DiffId(s.to_string()))
        } else {
            Err(PhabciError::InvalidDiffId(s.to_string()))
        }
    }
}

impl fmt::Display for DiffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
