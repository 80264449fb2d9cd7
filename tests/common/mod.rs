#![allow(dead_code)]

use std::cell::RefCell;
use std::time::Duration;

use phabci::conduit::Conduit;
use phabci::error::{PhabciError, Result};
use phabci::trigger::BuildServer;
use phabci::vcs::Vcs;
use serde_json::Value;

/// Conduit that records every call and answers `null`, optionally failing
/// from the `fail_at`-th call on.
#[derive(Default)]
pub struct RecordingConduit {
    pub calls: RefCell<Vec<(String, Value)>>,
    pub fail_at: Option<usize>,
}

impl RecordingConduit {
    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.borrow().clone()
    }
}

impl Conduit for RecordingConduit {
    fn call(&self, method: &str, params: Value) -> Result<Value> {
        let mut calls = self.calls.borrow_mut();
        if self.fail_at.is_some_and(|n| calls.len() >= n) {
            return Err(PhabciError::Conduit {
                method: method.to_string(),
                code: "ERR-CONDUIT-CORE".to_string(),
                info: "server unavailable".to_string(),
            });
        }
        calls.push((method.to_string(), params));
        Ok(Value::Null)
    }
}

/// In-memory repository.
#[derive(Default)]
pub struct FakeVcs {
    pub changed: Vec<String>,
    pub pushes: RefCell<Vec<(String, String)>>,
    pub fail_push: bool,
}

impl FakeVcs {
    pub fn with_changed(files: &[&str]) -> Self {
        Self {
            changed: files.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl Vcs for FakeVcs {
    fn changed_files(&self) -> Result<Vec<String>> {
        Ok(self.changed.clone())
    }

    fn push_ref(&self, remote: &str, refname: &str) -> Result<()> {
        if self.fail_push {
            return Err(PhabciError::Command {
                command: format!("git push {remote} HEAD:{refname}"),
                stderr: "remote rejected".to_string(),
            });
        }
        self.pushes
            .borrow_mut()
            .push((remote.to_string(), refname.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBuildServer {
    pub pings: RefCell<Vec<(String, Duration)>>,
    pub fail: bool,
}

impl BuildServer for FakeBuildServer {
    fn ping(&self, url: &str, timeout: Duration) -> Result<()> {
        if self.fail {
            return Err(PhabciError::Parse("connection refused".to_string()));
        }
        self.pings.borrow_mut().push((url.to_string(), timeout));
        Ok(())
    }
}
