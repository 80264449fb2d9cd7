/// Parser for JaCoCo XML coverage reports.
///
/// Line data lives in `<sourcefile>` elements:
///   <report name="...">
///     <package name="com/example">
///       <class .../>
///       <sourcefile name="Foo.java">
///         <line nr="10" mi="0" ci="3" mb="0" cb="2"/>
///       </sourcefile>
///     </package>
///   </report>
///
/// `ci` (covered instructions) is used as the hit count. Lines with neither
/// covered nor missed instructions are not instrumentable and are dropped.
use quick_xml::events::Event;

use super::{attr_map, parse_attr, xml_err, xml_reader, Parser};
use crate::error::Result;
use crate::model::{CoverageData, FileCoverage, LineCoverage};

pub struct JacocoParser;

impl Parser for JacocoParser {
    fn parse(&self, input: &[u8]) -> Result<CoverageData> {
        parse_jacoco(input)
    }
}

fn parse_jacoco(input: &[u8]) -> Result<CoverageData> {
    let mut reader = xml_reader(input);
    let mut data = CoverageData::new();
    let mut buf = Vec::new();

    let mut current_package: Option<String> = None;
    let mut current_sourcefile: Option<FileCoverage> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(xml_err(e, &reader)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"package" => {
                    current_package = attr_map(e).remove("name");
                }
                b"sourcefile" => {
                    if let Some(name) = attr_map(e).remove("name") {
                        let path = match &current_package {
                            Some(pkg) if !pkg.is_empty() => format!("{}/{}", pkg, name),
                            _ => name,
                        };
                        current_sourcefile = Some(FileCoverage::new(path));
                    }
                }
                b"line" => {
                    let attrs = attr_map(e);
                    if let (Some(file), Some(line_number)) = (
                        current_sourcefile.as_mut(),
                        parse_attr::<u32>(&attrs, "nr"),
                    ) {
                        let ci = parse_attr::<u64>(&attrs, "ci").unwrap_or(0);
                        let mi = parse_attr::<u64>(&attrs, "mi").unwrap_or(0);
                        if ci > 0 || mi > 0 {
                            file.lines.push(LineCoverage {
                                line_number,
                                hit_count: ci,
                            });
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"package" => current_package = None,
                b"sourcefile" => {
                    if let Some(mut file) = current_sourcefile.take() {
                        file.lines.sort_by_key(|l| l.line_number);
                        data.files.push(file);
                    }
                }
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    if let Some(mut file) = current_sourcefile.take() {
        file.lines.sort_by_key(|l| l.line_number);
        data.files.push(file);
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<!DOCTYPE report PUBLIC "-//JACOCO//DTD Report 1.1//EN" "report.dtd">
<report name="jcommon-util">
  <sessioninfo id="ci-1" start="1" dump="2"/>
  <package name="com/facebook/util">
    <class name="com/facebook/util/Validator" sourcefilename="Validator.java">
      <method name="check" desc="()V" line="10">
        <counter type="METHOD" missed="0" covered="1"/>
      </method>
    </class>
    <sourcefile name="Validator.java">
      <line nr="12" mi="2" ci="0" mb="0" cb="0"/>
      <line nr="10" mi="0" ci="5" mb="1" cb="1"/>
      <line nr="11" mi="0" ci="0" mb="0" cb="0"/>
      <counter type="LINE" missed="1" covered="1"/>
    </sourcefile>
  </package>
  <package name="">
    <sourcefile name="App.java">
      <line nr="1" mi="0" ci="1"/>
    </sourcefile>
  </package>
</report>
"#;

    #[test]
    fn test_parse_jacoco() {
        let data = JacocoParser.parse(SAMPLE).unwrap();
        assert_eq!(data.files.len(), 2);

        let validator = &data.files[0];
        assert_eq!(validator.path, "com/facebook/util/Validator.java");
        let lines: Vec<(u32, u64)> = validator
            .lines
            .iter()
            .map(|l| (l.line_number, l.hit_count))
            .collect();
        assert_eq!(lines, vec![(10, 5), (12, 0)]);

        assert_eq!(data.files[1].path, "App.java");
    }

    #[test]
    fn test_parse_jacoco_empty_report() {
        let data = JacocoParser
            .parse(br#"<report name="empty"></report>"#)
            .unwrap();
        assert!(data.files.is_empty());
    }
}
