//! Declarative run-report decoding.
//!
//! The decoder holds a fixed table mapping a source element tag to the
//! output fields it produces, each with a pure transform. A tag may fan out
//! into several fields: `svn-version` yields the raw version, its major and
//! minor parts and its release type; `exception` yields the message, stack
//! signature, brief location, user flag and run status.
//!
//! Every declared field is present in every decoded record. Tags absent from
//! the report run their transforms against `None`, and anything still
//! unbound gets [`MISSING_VALUE`].

use std::collections::{BTreeMap, HashMap};

use crate::error::DecodeError;
use crate::exception::extract_exception;
use crate::report::Element;
use crate::version::{parse_version, VersionTable};

/// Sentinel for a declared field that could not be derived.
pub const MISSING_VALUE: &str = "NA";

/// Host and domain name used when the host is not reported.
pub const UNKNOWN_HOST: &str = "unknown";

/// Output field names.
pub mod field {
    pub const ID: &str = "id";
    pub const WALKER_NAME: &str = "walker-name";
    pub const SVN_VERSION: &str = "svn-version";
    pub const GATK_VERSION: &str = "gatk-version";
    pub const GATK_MINOR_VERSION: &str = "gatk-minor-version";
    pub const RELEASE_TYPE: &str = "release-type";
    pub const START_TIME: &str = "start-time";
    pub const END_TIME: &str = "end-time";
    pub const RUN_TIME: &str = "run-time";
    pub const USER_NAME: &str = "user-name";
    pub const HOST_NAME: &str = "host-name";
    pub const DOMAIN_NAME: &str = "domain-name";
    pub const JAVA: &str = "java";
    pub const MACHINE: &str = "machine";
    pub const MAX_MEMORY: &str = "max-memory";
    pub const TOTAL_MEMORY: &str = "total-memory";
    pub const ITERATIONS: &str = "iterations";
    pub const EXCEPTION_MSG: &str = "exception-msg";
    pub const STACKTRACE: &str = "stacktrace";
    pub const EXCEPTION_AT_BRIEF: &str = "exception-at-brief";
    pub const IS_USER_EXCEPTION: &str = "is-user-exception";
    pub const RUN_STATUS: &str = "run-status";
}

/// Pure transform from an optional source element to a field value.
pub type Transform = fn(Option<&Element>, &VersionTable) -> String;

/// One output field produced from a source tag.
#[derive(Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub transform: Transform,
}

/// All fields produced from one source tag.
#[derive(Clone)]
pub struct TagRule {
    pub tag: &'static str,
    pub fields: Vec<FieldRule>,
}

/// A decoded run report: every declared field mapped to a string value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedRecord {
    values: BTreeMap<String, String>,
}

impl NormalizedRecord {
    /// Value of `field`, or [`MISSING_VALUE`] for a field the decoder never declared.
    pub fn get(&self, field: &str) -> &str {
        self.values
            .get(field)
            .map(String::as_str)
            .unwrap_or(MISSING_VALUE)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn id(&self) -> &str {
        self.get(field::ID)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NormalizedRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn text(elt: Option<&Element>, _: &VersionTable) -> String {
    elt.and_then(Element::text)
        .unwrap_or(MISSING_VALUE)
        .to_string()
}

fn major_version(elt: Option<&Element>, _: &VersionTable) -> String {
    match elt.and_then(Element::text) {
        Some(v) => parse_version(v).0,
        None => MISSING_VALUE.to_string(),
    }
}

fn minor_version(elt: Option<&Element>, _: &VersionTable) -> String {
    match elt.and_then(Element::text) {
        Some(v) => parse_version(v).1.to_string(),
        None => MISSING_VALUE.to_string(),
    }
}

fn release_type(elt: Option<&Element>, versions: &VersionTable) -> String {
    match elt.and_then(Element::text) {
        Some(v) => versions.classify_release_type(v).to_string(),
        None => MISSING_VALUE.to_string(),
    }
}

fn host_name(elt: Option<&Element>, _: &VersionTable) -> String {
    elt.and_then(Element::text)
        .unwrap_or(UNKNOWN_HOST)
        .to_string()
}

fn domain_name(elt: Option<&Element>, versions: &VersionTable) -> String {
    let host = host_name(elt, versions);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() >= 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        UNKNOWN_HOST.to_string()
    }
}

fn exception_msg(elt: Option<&Element>, _: &VersionTable) -> String {
    extract_exception(elt).message
}

fn stacktrace(elt: Option<&Element>, _: &VersionTable) -> String {
    extract_exception(elt).stack_signature
}

fn exception_location(elt: Option<&Element>, _: &VersionTable) -> String {
    extract_exception(elt).location_brief()
}

fn user_exception(elt: Option<&Element>, _: &VersionTable) -> String {
    extract_exception(elt).user_flag
}

fn run_status(elt: Option<&Element>, _: &VersionTable) -> String {
    extract_exception(elt).run_status.to_string()
}

fn rule(field: &'static str, transform: Transform) -> FieldRule {
    FieldRule { field, transform }
}

/// One rule per tag, each producing a field of the same name.
fn same_name(tags: &[&'static str], transform: Transform) -> Vec<TagRule> {
    tags.iter()
        .map(|&t| TagRule {
            tag: t,
            fields: vec![rule(t, transform)],
        })
        .collect()
}

/// The run-report field table, in declaration order.
pub fn default_rules() -> Vec<TagRule> {
    let mut rules = Vec::new();
    rules.extend(same_name(&[field::ID, field::WALKER_NAME], text));
    rules.push(TagRule {
        tag: field::SVN_VERSION,
        fields: vec![
            rule(field::SVN_VERSION, text),
            rule(field::GATK_VERSION, major_version),
            rule(field::GATK_MINOR_VERSION, minor_version),
            rule(field::RELEASE_TYPE, release_type),
        ],
    });
    rules.extend(same_name(&[field::START_TIME, field::END_TIME], text));
    rules.extend(same_name(&[field::RUN_TIME, field::USER_NAME], text));
    rules.push(TagRule {
        tag: field::HOST_NAME,
        fields: vec![
            rule(field::HOST_NAME, host_name),
            rule(field::DOMAIN_NAME, domain_name),
        ],
    });
    rules.extend(same_name(&[field::JAVA, field::MACHINE], text));
    rules.extend(same_name(
        &[field::MAX_MEMORY, field::TOTAL_MEMORY, field::ITERATIONS],
        text,
    ));
    rules.push(TagRule {
        tag: "exception",
        fields: vec![
            rule(field::EXCEPTION_MSG, exception_msg),
            rule(field::STACKTRACE, stacktrace),
            rule(field::EXCEPTION_AT_BRIEF, exception_location),
            rule(field::IS_USER_EXCEPTION, user_exception),
            rule(field::RUN_STATUS, run_status),
        ],
    });
    rules
}

/// Maps raw run reports to [`NormalizedRecord`]s.
pub struct RecordDecoder {
    rules: Vec<TagRule>,
    by_tag: HashMap<&'static str, usize>,
    fields: Vec<&'static str>,
    versions: VersionTable,
}

impl RecordDecoder {
    /// Decoder over the standard run-report field table.
    pub fn new(versions: VersionTable) -> Self {
        Self::with_rules(default_rules(), versions)
    }

    /// Decoder over a custom field table. A tag registered twice keeps its last rule.
    pub fn with_rules(rules: Vec<TagRule>, versions: VersionTable) -> Self {
        let mut by_tag = HashMap::with_capacity(rules.len());
        let mut fields = Vec::new();
        for (idx, tag_rule) in rules.iter().enumerate() {
            by_tag.insert(tag_rule.tag, idx);
            for f in &tag_rule.fields {
                if !fields.contains(&f.field) {
                    fields.push(f.field);
                }
            }
        }
        Self {
            rules,
            by_tag,
            fields,
            versions,
        }
    }

    /// Every field a decoded record carries, in declaration order.
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    /// Decode one run report.
    ///
    /// Fails only on structurally conflicting input: several `exception`
    /// children that disagree with each other.
    pub fn decode(&self, report: &Element) -> Result<NormalizedRecord, DecodeError> {
        let mut exceptions = report.find_all("exception");
        if let Some(first) = exceptions.next() {
            if exceptions.any(|other| other != first) {
                return Err(DecodeError {
                    id: report
                        .child_text(field::ID)
                        .unwrap_or("unknown")
                        .to_string(),
                    reason: "conflicting exception elements".to_string(),
                });
            }
        }

        let mut bindings: HashMap<&'static str, String> = HashMap::new();
        let mut seen = vec![false; self.rules.len()];

        for child in &report.children {
            let Some(&idx) = self.by_tag.get(child.tag.as_str()) else {
                continue;
            };
            seen[idx] = true;
            for f in &self.rules[idx].fields {
                bindings.insert(f.field, (f.transform)(Some(child), &self.versions));
            }
        }

        for (tag_rule, _) in self.rules.iter().zip(&seen).filter(|(_, s)| !**s) {
            for f in &tag_rule.fields {
                bindings
                    .entry(f.field)
                    .or_insert_with(|| (f.transform)(None, &self.versions));
            }
        }

        Ok(self
            .fields
            .iter()
            .map(|f| {
                let value = bindings
                    .remove(f)
                    .unwrap_or_else(|| MISSING_VALUE.to_string());
                (*f, value)
            })
            .collect())
    }
}
