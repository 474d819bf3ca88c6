/// Formatter for JaCoCo XML coverage reports.
///
/// JaCoCo XML structure:
///   <report name="...">
///     <sessioninfo id="..." start="..." dump="..."/>
///     <package name="com/example">
///       <class name="com/example/Foo" sourcefilename="Foo.java">
///         <method name="doStuff" desc="()V" line="10">
///           <counter type="LINE" missed="0" covered="3"/>
///         </method>
///       </class>
///       <sourcefile name="Foo.java">
///         <line nr="10" mi="0" ci="3" mb="0" cb="2"/>
///         <line nr="11" mi="0" ci="5" mb="1" cb="1"/>
///         <counter type="LINE" missed="1" covered="5"/>
///       </sourcefile>
///     </package>
///   </report>
///
/// Line data lives in `<sourcefile>`. There is no per-line hit count; the
/// number of covered instructions (`ci`) is used as one. A line with neither
/// covered nor missed instructions is not instrumentable and is skipped.
/// Paths are the package name joined with the source file name.
use std::path::Path;

use anyhow::Result;
use quick_xml::events::Event;

use super::{get_attr, get_num, Formatter};
use crate::model::*;

/// JaCoCo XML formatter.
pub struct JacocoFormatter;

impl Formatter for JacocoFormatter {
    fn name(&self) -> &'static str {
        "jacoco"
    }

    fn search_paths(&self) -> &'static [&'static str] {
        &["build/reports/jacoco/test/jacocoTestReport.xml", "jacoco.xml"]
    }

    fn recognizes(&self, _path: &Path, head: &str) -> bool {
        // DTD reference or JaCoCo-specific child elements.
        super::looks_like_xml(head)
            && head.contains("<report")
            && (head.contains("jacoco") || head.contains("JACOCO") || head.contains("<package"))
    }

    fn decode(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

/// Parse JaCoCo XML coverage data from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let mut reader = super::xml_reader(input);
    let mut buf = Vec::new();

    let mut data = CoverageData::new();
    let mut current_package: Option<String> = None;
    let mut current_sourcefile: Option<FileCoverage> = None;

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => return Err(super::xml_err(e, &reader)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"package" if is_start_event => {
                    current_package = get_attr(e, b"name").filter(|p| !p.is_empty());
                }
                b"sourcefile" if is_start_event => {
                    if let Some(name) = get_attr(e, b"name") {
                        let path = match &current_package {
                            Some(pkg) => format!("{}/{}", pkg.trim_end_matches('/'), name),
                            None => name,
                        };
                        current_sourcefile = Some(FileCoverage::new(path));
                    }
                }
                b"line" => {
                    if let (Some(file), Some(line_number)) =
                        (current_sourcefile.as_mut(), get_num::<u32>(e, b"nr"))
                    {
                        let line_number = check_line_number(line_number)?;
                        let ci = get_num::<u64>(e, b"ci").unwrap_or(0);
                        let mi = get_num::<u64>(e, b"mi").unwrap_or(0);
                        if ci > 0 || mi > 0 {
                            file.push(line_number, ci);
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

    // Unclosed <sourcefile> at EOF.
    if let Some(mut file) = current_sourcefile.take() {
        file.lines.sort_by_key(|l| l.line_number);
        data.files.push(file);
    }

    Ok(data)
}
