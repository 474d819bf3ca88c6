/// Formatter for Cobertura XML coverage reports.
///
/// Cobertura XML structure:
///   <coverage>
///     <sources><source>...</source></sources>
///     <packages>
///       <package name="...">
///         <classes>
///           <class name="..." filename="...">
///             <methods>
///               <method name="...">
///                 <lines><line number="..." hits="..."/></lines>
///               </method>
///             </methods>
///             <lines>
///               <line number="..." hits="..." branch="true|false"/>
///             </lines>
///           </class>
///         </classes>
///       </package>
///     </packages>
///   </coverage>
///
/// Relative `filename`s are joined to the first non-empty `<source>`.
use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use quick_xml::events::Event;

use super::{get_attr, get_num, Formatter};
use crate::model::*;

pub struct CoberturaFormatter;

impl Formatter for CoberturaFormatter {
    fn name(&self) -> &'static str {
        "cobertura"
    }

    fn search_paths(&self) -> &'static [&'static str] {
        &["cobertura.xml"]
    }

    fn recognizes(&self, _path: &Path, head: &str) -> bool {
        // Clover shares the <coverage> root but carries a clover= attribute.
        super::looks_like_xml(head) && head.contains("<coverage") && !head.contains("clover=")
    }

    fn decode(&self, input: &[u8]) -> Result<CoverageData> {
        parse(input)
    }
}

/// Parse Cobertura XML. Also used for coverage.py's XML report.
pub fn parse(input: &[u8]) -> Result<CoverageData> {
    let mut reader = super::xml_reader(input);
    let mut buf = Vec::new();

    let mut data = CoverageData::new();
    let mut current_file: Option<FileCoverage> = None;
    // Lines may appear under both <method><lines> and <class><lines>;
    // keep one entry per line number with the max hit count.
    let mut line_index_map: HashMap<u32, usize> = HashMap::new();

    let mut sources: Vec<String> = Vec::new();
    let mut in_source = false;

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => return Err(super::xml_err(e, &reader)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"source" => {
                    // A self-closing <source/> has no text and no End event.
                    if is_start_event {
                        in_source = true;
                    }
                }
                b"class" => {
                    if let Some(filename) = get_attr(e, b"filename") {
                        if let Some(file) = current_file.take() {
                            data.files.push(file);
                        }
                        let path = resolve_source_path(&filename, &sources);
                        current_file = Some(FileCoverage::new(path));
                        line_index_map.clear();
                    }
                }
                b"line" => {
                    if let (Some(file), Some(line_number)) =
                        (current_file.as_mut(), get_num::<u32>(e, b"number"))
                    {
                        let line_number = check_line_number(line_number)?;
                        let hit_count = get_num::<u64>(e, b"hits").unwrap_or(0);
                        if let Some(&idx) = line_index_map.get(&line_number) {
                            let existing = &mut file.lines[idx];
                            existing.hit_count = existing.hit_count.max(hit_count);
                        } else {
                            line_index_map.insert(line_number, file.lines.len());
                            file.push(line_number, hit_count);
                        }
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
                    if let Some(mut file) = current_file.take() {
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

    // Unclosed <class> at EOF.
    if let Some(mut file) = current_file.take() {
        file.lines.sort_by_key(|l| l.line_number);
        data.files.push(file);
    }

    Ok(data)
}

/// Resolve a filename against the list of `<source>` prefixes.
///
/// - If the filename is already absolute, return it as-is.
/// - Otherwise, prepend the first non-empty source prefix.
/// - If no non-empty sources exist, return the filename unchanged.
fn resolve_source_path(filename: &str, sources: &[String]) -> String {
    if filename.starts_with('/') {
        return filename.to_string();
    }
    for source in sources {
        let base = source.trim_end_matches('/');
        if !base.is_empty() {
            return format!("{}/{}", base, filename);
        }
    }
    filename.to_string()
}
