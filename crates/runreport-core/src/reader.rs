//! Streaming run-report reader.
//!
//! Each input file may hold a bare `GATK-run-report` or a `GATK-run-reports`
//! list. Reports are yielded one at a time, as soon as their closing tag has
//! been parsed, so memory use is bounded by the largest single report.
//! Files ending in `.gz` are decompressed transparently.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ReportError, Result};
use crate::report::{Element, RUN_REPORT};

/// Expand input paths: files are kept as given, directories are walked recursively.
pub fn resolve_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(ReportError::MissingPath(path.clone()));
        }
        if path.is_dir() {
            files.extend(walkdir(path)?);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn walkdir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    let mut files = Vec::new();
    for path in entries {
        if path.is_dir() {
            files.extend(walkdir(&path)?);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}

pub(crate) fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

/// Open `path` for reading, gunzipping `.gz` files.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Iterator over the run reports in one XML stream.
///
/// After the first error the iterator is exhausted; reports yielded before
/// the error remain valid.
pub struct ReportReader<R: BufRead> {
    reader: Reader<R>,
    finished: bool,
}

impl ReportReader<Box<dyn BufRead>> {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(open_input(path)?))
    }
}

impl<R: BufRead> ReportReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: Reader::from_reader(input),
            finished: false,
        }
    }

    fn next_report(&mut self) -> Result<Option<Element>> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let start = match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().as_ref() == RUN_REPORT.as_bytes() => {
                    element_from_start(&e)?
                }
                Event::Empty(e) if e.name().as_ref() == RUN_REPORT.as_bytes() => {
                    return Ok(Some(element_from_start(&e)?));
                }
                Event::Eof => return Ok(None),
                _ => continue,
            };
            return self.read_subtree(start).map(Some);
        }
    }

    /// Read until the end tag matching `root`, building its subtree.
    fn read_subtree(&mut self, root: Element) -> Result<Element> {
        let mut stack = vec![root];
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) => stack.push(element_from_start(&e)?),
                Event::Empty(e) => {
                    let child = element_from_start(&e)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(child);
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape()?;
                    if let Some(top) = stack.last_mut() {
                        top.push_text(&text);
                    }
                }
                Event::CData(c) => {
                    let raw = c.into_inner();
                    if let Some(top) = stack.last_mut() {
                        top.push_text(&String::from_utf8_lossy(&raw));
                    }
                }
                Event::End(_) => {
                    let mut done = stack.pop().ok_or_else(|| {
                        ReportError::MalformedReport("unbalanced end tag".to_string())
                    })?;
                    done.drop_layout_text();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(done),
                        None => return Ok(done),
                    }
                }
                Event::Eof => {
                    return Err(ReportError::MalformedReport(format!(
                        "unexpected end of input inside <{}>",
                        stack.last().map(|e| e.tag.as_str()).unwrap_or(RUN_REPORT)
                    )));
                }
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for ReportReader<R> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_report() {
            Ok(Some(report)) => Some(Ok(report)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}
