//! In-memory run-report element tree.
//!
//! A run report is a small tree of named elements carrying text. The tree is
//! produced by the reader, inspected by the filter and decoder, and written
//! back out verbatim by the XML sinks.

use std::io::{self, Write};

use quick_xml::escape::escape;

/// Tag of a single run report.
pub const RUN_REPORT: &str = "GATK-run-report";

/// Tag of the element wrapping a list of run reports.
pub const RUN_REPORT_LIST: &str = "GATK-run-reports";

/// One XML element with its attributes, text and children, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    /// Text directly inside this element; `None` when empty.
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Leaf element holding `text`.
    pub fn leaf(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First direct child with `tag`.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All direct children with `tag`, in document order.
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Text of the first direct child with `tag`.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.find(tag).and_then(Element::text)
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Forget whitespace-only text of an element that has children: it is
    /// indentation between them, not a value.
    pub(crate) fn drop_layout_text(&mut self) {
        let blank = self.text.as_deref().is_some_and(|t| t.trim().is_empty());
        if blank && !self.children.is_empty() {
            self.text = None;
        }
    }

    /// Serialize this element and its subtree as compact XML.
    pub fn write_xml<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "<{}", self.tag)?;
        for (key, value) in &self.attributes {
            write!(out, " {}=\"{}\"", key, escape(value.as_str()))?;
        }
        if self.text.is_none() && self.children.is_empty() {
            return out.write_all(b" />");
        }
        out.write_all(b">")?;
        if let Some(text) = &self.text {
            out.write_all(escape(text.as_str()).as_bytes())?;
        }
        for child in &self.children {
            child.write_xml(out)?;
        }
        write!(out, "</{}>", self.tag)
    }

    pub fn to_xml_string(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_xml(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new(RUN_REPORT)
            .with_child(Element::leaf("id", "abc"))
            .with_child(Element::leaf("walker-name", "CountReads"))
            .with_child(
                Element::new("exception")
                    .with_child(Element::leaf("message", "x < y & z"))
                    .with_child(Element::new("stacktrace")),
            )
    }

    #[test]
    fn find_returns_first_direct_child() {
        let report = sample();
        assert_eq!(report.child_text("id"), Some("abc"));
        assert!(report.find("message").is_none());
        assert_eq!(
            report.find("exception").and_then(|e| e.child_text("message")),
            Some("x < y & z")
        );
    }

    #[test]
    fn xml_output_escapes_text_and_collapses_empty() {
        let xml = sample().to_xml_string();
        assert!(xml.starts_with("<GATK-run-report><id>abc</id>"));
        assert!(xml.contains("<message>x &lt; y &amp; z</message>"));
        assert!(xml.contains("<stacktrace />"));
        assert!(xml.ends_with("</GATK-run-report>"));
    }
}
