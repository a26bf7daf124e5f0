//! Exception metadata carried by a run report.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::report::Element;

/// Message reported when no `message` child exists.
pub const MISSING_MESSAGE: &str = "MISSING";

/// Stack signature and user flag reported when absent.
pub const NOT_AVAILABLE: &str = "NA";

/// Outcome of a run, derived from its exception element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Success,
    /// Internal (engine) failure.
    StingException,
    /// Failure caused by user input.
    UserException,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::StingException => "sting-exception",
            RunStatus::UserException => "user-exception",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields extracted from an `exception` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub message: String,
    /// Newline-joined stack frames; the grouping key for exception digests.
    pub stack_signature: String,
    /// Text of `is-user-exception`, or `NA`.
    pub user_flag: String,
    pub run_status: RunStatus,
}

impl Default for ExceptionInfo {
    fn default() -> Self {
        Self {
            message: MISSING_MESSAGE.to_string(),
            stack_signature: NOT_AVAILABLE.to_string(),
            user_flag: NOT_AVAILABLE.to_string(),
            run_status: RunStatus::Success,
        }
    }
}

impl ExceptionInfo {
    /// `(file.java:line)` call site of the top frame, or the full signature.
    pub fn location_brief(&self) -> String {
        exception_at_brief(&self.stack_signature)
    }
}

/// Extract exception metadata from an optional `exception` element.
pub fn extract_exception(element: Option<&Element>) -> ExceptionInfo {
    let mut info = ExceptionInfo::default();
    let Some(element) = element else {
        return info;
    };

    if let Some(message) = element.find("message") {
        if let Some(text) = message.text() {
            info.message = text.to_string();
        }
        info.run_status = RunStatus::StingException;
    }

    if let Some(trace) = element.find("stacktrace") {
        let frames: Vec<&str> = trace
            .find_all("string")
            .map(|s| s.text().unwrap_or_default())
            .collect();
        if !frames.is_empty() {
            info.stack_signature = frames.join("\n");
        }
    }

    if let Some(flag) = element.find("is-user-exception") {
        info.user_flag = flag.text().unwrap_or(NOT_AVAILABLE).to_string();
        if info.user_flag == "true" {
            info.run_status = RunStatus::UserException;
        }
    }

    info
}

fn call_site_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((.*\.java:.*)\)").expect("valid call-site regex"))
}

/// First Java call site `(<file>.java:<line>)` in a stack signature.
pub fn exception_at_brief(stack_signature: &str) -> String {
    call_site_pattern()
        .captures(stack_signature)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| stack_signature.to_string())
}
