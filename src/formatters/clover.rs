/// Formatter for Clover XML coverage reports.
///
/// Clover XML structure (OpenClover, `jest --coverageReporters=clover`,
/// PHPUnit, ...):
///
///   <coverage generated="..." clover="4.x.x">
///     <project timestamp="..." name="...">
///       <package name="...">
///         <file name="Foo.py" path="/absolute/path/to/Foo.py">
///           <class name="Foo"><metrics .../></class>
///           <line num="1" count="5" type="stmt"/>
///           <line num="3" count="2" type="method" signature="do_stuff()"/>
///           <line num="5" count="1" type="cond" truecount="1" falsecount="1"/>
///         </file>
///       </package>
///     </project>
///   </coverage>
///
/// Every `<line>` is a trackable line regardless of its `type`. `<file>` may
/// also appear directly under `<project>` (PHPUnit without namespaces).
use std::path::Path;

use anyhow::Result;
use quick_xml::events::Event;

use super::{get_attr, get_num, Formatter};
use crate::model::*;

/// Clover XML formatter.
pub struct CloverFormatter;

impl Formatter for CloverFormatter {
    fn name(&self) -> &'static str {
        "clover"
    }

    fn search_paths(&self) -> &'static [&'static str] {
        &["build/logs/clover.xml", "clover.xml"]
    }

    fn recognizes(&self, _path: &Path, head: &str) -> bool {
        super::looks_like_xml(head) && head.contains("<coverage") && head.contains("clover=")
    }

    fn decode(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

/// Parse Clover XML coverage data from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let mut reader = super::xml_reader(input);
    let mut buf = Vec::new();

    let mut data = CoverageData::new();
    let mut current_file: Option<FileCoverage> = None;

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_empty_event = matches!(&event, Ok(Event::Empty(_)));
        match event {
            Err(e) => return Err(super::xml_err(e, &reader)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"file" => {
                    // Prefer the `path` attribute (absolute) over `name` (basename).
                    let file_path = get_attr(e, b"path")
                        .or_else(|| get_attr(e, b"name"))
                        .unwrap_or_default();
                    let file = FileCoverage::new(file_path);
                    if is_empty_event {
                        data.files.push(file);
                    } else {
                        current_file = Some(file);
                    }
                }
                b"line" => {
                    if let (Some(file), Some(line_number)) =
                        (current_file.as_mut(), get_num::<u32>(e, b"num"))
                    {
                        let line_number = check_line_number(line_number)?;
                        let count = get_num::<u64>(e, b"count").unwrap_or(0);
                        file.push(line_number, count);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"file" {
                    if let Some(mut file) = current_file.take() {
                        file.lines.sort_by_key(|l| l.line_number);
                        data.files.push(file);
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    // Unclosed <file> at EOF.
    if let Some(mut file) = current_file.take() {
        file.lines.sort_by_key(|l| l.line_number);
        data.files.push(file);
    }

    Ok(data)
}
