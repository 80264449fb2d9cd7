/// Parser for Cobertura XML coverage reports.
///
/// Only line hits are read:
///   <coverage>
///     <sources><source>...</source></sources>
///     <packages><package><classes>
///       <class filename="...">
///         <methods><method><lines><line number="..." hits="..."/></lines></method></methods>
///         <lines><line number="..." hits="..."/></lines>
///       </class>
///     </classes></package></packages>
///   </coverage>
use std::collections::HashMap;

use quick_xml::events::Event;

use super::{attr_map, parse_attr, xml_err, xml_reader, Parser};
use crate::error::Result;
use crate::model::{CoverageData, FileCoverage, LineCoverage};

pub struct CoberturaParser;

impl Parser for CoberturaParser {
    fn parse(&self, input: &[u8]) -> Result<CoverageData> {
        parse_cobertura(input)
    }
}

fn parse_cobertura(input: &[u8]) -> Result<CoverageData> {
    let mut reader = xml_reader(input);
    let mut data = CoverageData::new();
    let mut buf = Vec::new();

    let mut current_file: Option<FileCoverage> = None;
    let mut line_index: HashMap<u32, usize> = HashMap::new();
    let mut sources: Vec<String> = Vec::new();
    let mut in_source = false;

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => return Err(xml_err(e, &reader)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                // A self-closing <source/> has no text and no End event.
                b"source" => in_source = is_start_event,
                b"class" => {
                    let attrs = attr_map(e);
                    if let Some(filename) = attrs.get("filename") {
                        if let Some(done) = current_file.take() {
                            data.files.push(done);
                        }
                        current_file = Some(FileCoverage::new(resolve_source_path(
                            filename, &sources,
                        )));
                        line_index.clear();
                    }
                }
                b"line" => {
                    let attrs = attr_map(e);
                    if let (Some(file), Some(line_number)) =
                        (current_file.as_mut(), parse_attr::<u32>(&attrs, "number"))
                    {
                        let hit_count = parse_attr::<u64>(&attrs, "hits").unwrap_or(0);
                        record_line(file, &mut line_index, line_number, hit_count);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_source {
                    if let Ok(text) = e.unescape() {
                        sources.push(text.trim().to_string());
                    }
                    in_source = false;
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"source" => in_source = false,
                b"class" => {
                    if let Some(file) = current_file.take() {
                        data.files.push(file);
                    }
                }
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    if let Some(file) = current_file.take() {
        data.files.push(file);
    }
    for file in &mut data.files {
        file.lines.sort_by_key(|l| l.line_number);
    }

    Ok(data)
}

/// Lines can be listed under both `<method>` and `<class>`; keep the
/// larger hit count.
fn record_line(
    file: &mut FileCoverage,
    line_index: &mut HashMap<u32, usize>,
    line_number: u32,
    hit_count: u64,
) {
    match line_index.get(&line_number) {
        Some(&idx) => {
            let line = &mut file.lines[idx];
            line.hit_count = line.hit_count.max(hit_count);
        }
        None => {
            line_index.insert(line_number, file.lines.len());
            file.lines.push(LineCoverage {
                line_number,
                hit_count,
            });
        }
    }
}

/// Prefix a relative filename with the first non-empty `<source>`.
fn resolve_source_path(filename: &str, sources: &[String]) -> String {
    if filename.starts_with('/') {
        return filename.to_string();
    }
    match sources.iter().map(|s| s.trim_end_matches('/')).find(|s| !s.is_empty()) {
        Some(base) => format!("{}/{}", base, filename),
        None => filename.to_string(),
    }
}
