//! Narrow interface over the version-control commands the CI flows need.

use std::path::PathBuf;
use std::process::Command;

use log::debug;

use crate::error::{PhabciError, Result};

pub trait Vcs {
    /// Paths touched by the commit at `HEAD`.
    fn changed_files(&self) -> Result<Vec<String>>;

    /// Push `HEAD` to `refname` on `remote`.
    fn push_ref(&self, remote: &str, refname: &str) -> Result<()>;
}

/// `git` invoked as a subprocess.
#[derive(Debug, Default)]
pub struct GitCli {
    /// Working copy to run in; the current directory when `None`.
    pub dir: Option<PathBuf>,
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("git");
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        debug!("Running git {}", args.join(" "));
        let output = cmd.args(args).output()?;

        if !output.status.success() {
            return Err(PhabciError::Command {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|_| PhabciError::Parse("git output not valid UTF-8".to_string()))
    }
}

impl Vcs for GitCli {
    fn changed_files(&self) -> Result<Vec<String>> {
        let out = self.run(&["show", "--pretty=format:", "--name-only", "HEAD"])?;
        Ok(parse_name_only(&out))
    }

    fn push_ref(&self, remote: &str, refname: &str) -> Result<()> {
        self.run(&["push", remote, &format!("HEAD:{refname}")])?;
        Ok(())
    }
}

/// Split `--name-only` output into paths, dropping blank lines.
pub fn parse_name_only(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let out = "\nsrc/main/java/Foo.java\nREADME.md\n\n";
        assert_eq!(
            parse_name_only(out),
            vec!["src/main/java/Foo.java".to_string(), "README.md".to_string()]
        );
    }

    #[test]
    fn test_parse_name_only_empty() {
        assert!(parse_name_only("").is_empty());
    }

    #[test]
    fn test_changed_files_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitCli {
            dir: Some(dir.path().to_path_buf()),
        };
        // Either git is missing (I/O error) or the directory is not a repo.
        assert!(git.changed_files().is_err());
    }

    #[test]
    fn test_changed_files_in_fresh_repo() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path();
        let git = |args: &[&str]| {
            Command::new("git")
                .args(args)
                .current_dir(repo)
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        };
        if !git(&["init", "-q"]) {
            return; // git not available
        }
        std::fs::write(repo.join("Foo.java"), "class Foo {}\n").unwrap();
        std::fs::write(repo.join("notes.txt"), "hi\n").unwrap();
        assert!(git(&["add", "."]));
        assert!(git(&[
            "-c",
            "user.name=ci",
            "-c",
            "user.email=ci@example.com",
            "-c",
            "commit.gpgsign=false",
            "commit",
            "-q",
            "-m",
            "init"
        ]));

        let files = GitCli {
            dir: Some(repo.to_path_buf()),
        }
        .changed_files()
        .unwrap();
        assert_eq!(files, vec!["Foo.java".to_string(), "notes.txt".to_string()]);
    }
}
