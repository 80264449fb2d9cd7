pub mod cobertura;
pub mod jacoco;

use std::collections::HashMap;
use std::str;

use quick_xml::events::BytesStart;
use quick_xml::reader::Reader;

use crate::error::{PhabciError, Result};
use crate::model::CoverageData;

/// Every report parser implements this trait.
pub trait Parser {
    /// Parse the input bytes into our uniform coverage model.
    fn parse(&self, input: &[u8]) -> Result<CoverageData>;
}

fn xml_reader(input: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);
    reader
}

fn xml_err(source: quick_xml::Error, reader: &Reader<&[u8]>) -> PhabciError {
    PhabciError::Xml {
        source,
        position: reader.buffer_position(),
    }
}

/// Extract attributes from an XML element into a HashMap.
fn attr_map(e: &BytesStart) -> HashMap<String, String> {
    e.attributes()
        .filter_map(|a| {
            let attr = a.ok()?;
            let key = str::from_utf8(attr.key.local_name().into_inner())
                .ok()?
                .to_string();
            let value = attr.unescape_value().ok()?.to_string();
            Some((key, value))
        })
        .collect()
}

fn parse_attr<T: str::FromStr>(attrs: &HashMap<String, String>, key: &str) -> Option<T> {
    attrs.get(key).and_then(|v| v.parse().ok())
}
