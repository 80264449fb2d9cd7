//! Turns coverage reports into the per-line coverage strings Differential
//! displays next to a diff.
//!
//! Each string has one character per source line starting at line 1:
//!
//! - `C` covered
//! - `U` instrumented but never executed
//! - `N` not instrumented
//!
//! The string ends at the last line the report mentions.

use std::path::Path;

use log::debug;

use crate::detect::{detect_format, Format};
use crate::error::{PhabciError, Result};
use crate::model::{CoverageData, CoverageMap, FileCoverage};
use crate::parsers::cobertura::CoberturaParser;
use crate::parsers::jacoco::JacocoParser;
use crate::parsers::Parser;

pub const COVERED: char = 'C';
pub const UNCOVERED: char = 'U';
pub const NOT_EXECUTABLE: char = 'N';

/// Highest line number accepted from a report.
pub const MAX_LINE_NUMBER: u32 = 1_000_000;

/// Encode a single file's line hits.
pub fn encode_lines(file: &FileCoverage) -> Result<String> {
    let len = file.lines.iter().map(|l| l.line_number).max().unwrap_or(0);
    if len > MAX_LINE_NUMBER {
        return Err(PhabciError::Parse(format!(
            "{}: line {} exceeds the limit of {}",
            file.path, len, MAX_LINE_NUMBER
        )));
    }
    let mut codes = vec![NOT_EXECUTABLE as u8; len as usize];
    for line in &file.lines {
        if line.line_number == 0 {
            continue;
        }
        let slot = &mut codes[line.line_number as usize - 1];
        let code = if line.hit_count > 0 { COVERED } else { UNCOVERED };
        *slot = stronger(*slot as char, code) as u8;
    }
    Ok(codes.into_iter().map(char::from).collect())
}

fn rank(code: char) -> u8 {
    match code {
        COVERED => 2,
        UNCOVERED => 1,
        _ => 0,
    }
}

fn stronger(a: char, b: char) -> char {
    if rank(b) > rank(a) {
        b
    } else {
        a
    }
}

/// Combine two encodings of the same file line by line.
pub fn merge_codes(a: &str, b: &str) -> String {
    let mut a = a.chars();
    let mut b = b.chars();
    let mut out = String::new();
    loop {
        match (a.next(), b.next()) {
            (None, None) => break,
            (Some(x), None) | (None, Some(x)) => out.push(x),
            (Some(x), Some(y)) => out.push(stronger(x, y)),
        }
    }
    out
}

/// Rewrites report paths so they match paths in the repository.
#[derive(Debug, Default, Clone)]
pub struct PathMapper {
    /// Prefixes removed from report paths, tried in order.
    pub strip_prefixes: Vec<String>,
    /// Prefix added after stripping, e.g. the module directory holding a
    /// report whose paths are relative to `src/main/java`.
    pub add_prefix: Option<String>,
}

impl PathMapper {
    pub fn map(&self, path: &str) -> String {
        let stripped = self
            .strip_prefixes
            .iter()
            .find_map(|p| {
                let p = p.trim_end_matches('/');
                path.strip_prefix(p)
                    .and_then(|rest| rest.strip_prefix('/'))
            })
            .unwrap_or(path);
        match &self.add_prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), stripped),
            None => stripped.to_string(),
        }
    }
}

/// Fold parsed report data into `map`, merging files already present.
pub fn add_to_map(map: &mut CoverageMap, data: &CoverageData, mapper: &PathMapper) -> Result<()> {
    for file in &data.files {
        let path = mapper.map(&file.path);
        let codes = encode_lines(file)?;
        match map.get_mut(&path) {
            Some(existing) => *existing = merge_codes(existing, &codes),
            None => {
                map.insert(path, codes);
            }
        }
    }
    Ok(())
}

pub fn parse_report(content: &[u8], format: Format) -> Result<CoverageData> {
    match format {
        Format::Cobertura => CoberturaParser.parse(content),
        Format::Jacoco => JacocoParser.parse(content),
    }
}

/// Read and parse a report file, detecting the format unless overridden.
pub fn read_report(path: &Path, format_override: Option<Format>) -> Result<(Format, CoverageData)> {
    let content = std::fs::read(path)?;
    let format = match format_override {
        Some(f) => f,
        None => detect_format(&content).ok_or(PhabciError::UnknownFormat)?,
    };
    debug!("Parsing {} as {}", path.display(), format);
    let data = parse_report(&content, format)?;
    Ok((format, data))
}

/// Convert every report into a single coverage map.
pub fn convert_reports(
    reports: &[&Path],
    format_override: Option<Format>,
    mapper: &PathMapper,
) -> Result<CoverageMap> {
    let mut map = CoverageMap::new();
    for report in reports {
        let (_, data) = read_report(report, format_override)?;
        add_to_map(&mut map, &data, mapper)?;
    }
    Ok(map)
}
