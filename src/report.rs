//! Sending results to a diff.

use std::io::{BufRead, Write};

use log::info;

use crate::conduit::{update_unit_results, Conduit};
use crate::diff_id::DiffId;
use crate::error::{PhabciError, Result};
use crate::model::{Status, TestResult};

/// Result name used when the build itself reports a status.
pub const BUILD_RESULT_NAME: &str = "jcommon_build";

/// Posts results for one diff, echoing each record to `out` first so it
/// shows up in the CI log even if the call fails.
pub struct Reporter<'a, W: Write> {
    conduit: &'a dyn Conduit,
    diff_id: &'a DiffId,
    out: W,
}

impl<'a, W: Write> Reporter<'a, W> {
    pub fn new(conduit: &'a dyn Conduit, diff_id: &'a DiffId, out: W) -> Self {
        Self {
            conduit,
            diff_id,
            out,
        }
    }

    /// One `differential.updateunitresults` call per result, in order.
    /// Stops at the first failing call.
    pub fn report_all(&mut self, results: &[TestResult]) -> Result<usize> {
        for result in results {
            self.report(result)?;
        }
        info!(
            "Reported {} result(s) to diff {}",
            results.len(),
            self.diff_id
        );
        Ok(results.len())
    }

    pub fn report(&mut self, result: &TestResult) -> Result<()> {
        writeln!(self.out, "{}", self.diff_id)?;
        writeln!(self.out, "{}", serde_json::to_string_pretty(result)?)?;
        update_unit_results(self.conduit, self.diff_id, result)?;
        Ok(())
    }

    /// Report a single build-level status, e.g. when compilation failed and
    /// there are no per-file results.
    pub fn report_status(&mut self, name: &str, status: Status, message: &str) -> Result<()> {
        let result = TestResult::new(name, status).with_message(message);
        self.report(&result)
    }
}

/// Read newline-delimited JSON results, skipping blank lines.
pub fn read_results(reader: impl BufRead) -> Result<Vec<TestResult>> {
    let mut results = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let result = serde_json::from_str(line)
            .map_err(|e| PhabciError::Parse(format!("result on line {}: {}", idx + 1, e)))?;
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_results() {
        let input = "\
{\"name\":\"FooTest\",\"status\":\"pass\"}

{\"name\":\"BarTest\",\"file\":\"Bar.java\",\"status\":\"fail\",\"msg\":\"expected 1\"}
";
        let results = read_results(input.as_bytes()).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "FooTest");
        assert_eq!(results[0].status, Status::Pass);
        assert_eq!(results[1].file(), "Bar.java");
        assert_eq!(results[1].message, "expected 1");
    }

    #[test]
    fn test_read_results_reports_bad_line() {
        let input = "{\"name\":\"ok\",\"status\":\"pass\"}\nnot json\n";
        let err = read_results(input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_read_results_empty() {
        assert!(read_results("".as_bytes()).unwrap().is_empty());
    }
}
