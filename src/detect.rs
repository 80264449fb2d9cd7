/// Detection of coverage report formats from their content.
///
/// Both supported formats are XML, so the file extension carries no
/// signal; the root element decides.
use crate::error::PhabciError;

/// Supported coverage report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Cobertura,
    Jacoco,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Cobertura => "cobertura",
            Format::Jacoco => "jacoco",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = PhabciError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cobertura" => Ok(Format::Cobertura),
            "jacoco" => Ok(Format::Jacoco),
            _ => Err(PhabciError::Parse(format!(
                "Unknown format: '{}'. Supported: cobertura, jacoco",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn detect_format(content: &[u8]) -> Option<Format> {
    let head_len = content.len().min(4096);
    let head = String::from_utf8_lossy(&content[..head_len]);

    if !(head.contains("<?xml") || head.trim_start().starts_with('<')) {
        return None;
    }
    if head.contains("<coverage") {
        return Some(Format::Cobertura);
    }
    if head.contains("<report") {
        return Some(Format::Jacoco);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_cobertura() {
        let content = b"<?xml version=\"1.0\"?>\n<coverage version=\"1.0\">";
        assert_eq!(detect_format(content), Some(Format::Cobertura));
    }

    #[test]
    fn test_detect_jacoco() {
        let content = br#"<?xml version="1.0"?><!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd"><report name="x">"#;
        assert_eq!(detect_format(content), Some(Format::Jacoco));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_format(b"SF:/src/lib.rs\nDA:1,1\n"), None);
        assert_eq!(detect_format(b"<html></html>"), None);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JaCoCo".parse::<Format>().unwrap(), Format::Jacoco);
        assert!("lcov".parse::<Format>().is_err());
    }
}
