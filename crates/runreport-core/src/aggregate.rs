//! Exception digest: groups failed runs by stack signature.
//!
//! Each distinct stack signature becomes one [`AggregatedException`] that
//! accumulates the messages, versions, users, walkers, ids and end dates of
//! every run that failed with it. At end of stream the groups are sorted by
//! ascending occurrence count and rendered as [`DigestEntry`] values.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::decoder::{field, NormalizedRecord};
use crate::filter::{decode_date, NO_DATE};

/// Displayed sets show at most this many members.
pub const MAX_SET_ITEMS_TO_SHOW: usize = 5;

const DATE_FORMAT: &str = "%m/%d/%y";

/// Set of strings that remembers first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedSet {
    items: Vec<String>,
    index: HashSet<String>,
}

impl OrderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value`; returns `false` if it was already present.
    pub fn insert(&mut self, value: &str) -> bool {
        if self.index.contains(value) {
            return false;
        }
        self.index.insert(value.to_string());
        self.items.push(value.to_string());
        true
    }

    pub fn contains(&self, value: &str) -> bool {
        self.index.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Comma-joined members, truncated to [`MAX_SET_ITEMS_TO_SHOW`] plus `...`.
    pub fn display_truncated(&self) -> String {
        let mut shown: Vec<&str> = self.iter().take(MAX_SET_ITEMS_TO_SHOW).collect();
        if self.len() > MAX_SET_ITEMS_TO_SHOW {
            shown.push("...");
        }
        shown.join(",")
    }
}

impl<'a> FromIterator<&'a str> for OrderedSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = OrderedSet::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

/// Which digest entries to emit, by their user-exception flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionSelection {
    #[default]
    All,
    /// Only flag `true`.
    User,
    /// Only flag `false`.
    Sting,
}

impl ExceptionSelection {
    pub fn matches(&self, user_flag: &str) -> bool {
        match self {
            ExceptionSelection::All => true,
            ExceptionSelection::User => user_flag == "true",
            ExceptionSelection::Sting => user_flag == "false",
        }
    }
}

impl FromStr for ExceptionSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ExceptionSelection::All),
            "user" => Ok(ExceptionSelection::User),
            "sting" => Ok(ExceptionSelection::Sting),
            other => Err(format!("unknown exception selection: {other}")),
        }
    }
}

impl fmt::Display for ExceptionSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExceptionSelection::All => "all",
            ExceptionSelection::User => "user",
            ExceptionSelection::Sting => "sting",
        })
    }
}

/// All runs that failed with one stack signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedException {
    stack_signature: String,
    messages: OrderedSet,
    versions: OrderedSet,
    users: OrderedSet,
    walkers: OrderedSet,
    ids: OrderedSet,
    occurrences: u64,
    /// Flag of the first run seen with this signature.
    user_flag: String,
    dates: BTreeSet<NaiveDate>,
}

impl AggregatedException {
    pub fn new(record: &NormalizedRecord) -> Self {
        let mut group = Self {
            stack_signature: record.get(field::STACKTRACE).to_string(),
            messages: OrderedSet::new(),
            versions: OrderedSet::new(),
            users: OrderedSet::new(),
            walkers: OrderedSet::new(),
            ids: OrderedSet::new(),
            occurrences: 0,
            user_flag: record.get(field::IS_USER_EXCEPTION).to_string(),
            dates: BTreeSet::new(),
        };
        group.absorb(record);
        group
    }

    pub fn stack_signature(&self) -> &str {
        &self.stack_signature
    }

    pub fn same_signature(&self, record: &NormalizedRecord) -> bool {
        self.stack_signature == record.get(field::STACKTRACE)
    }

    /// Fold another run with the same signature into this group.
    pub fn merge(&mut self, record: &NormalizedRecord) {
        debug_assert!(self.same_signature(record));
        self.absorb(record);
    }

    fn absorb(&mut self, record: &NormalizedRecord) {
        self.messages.insert(record.get(field::EXCEPTION_MSG));
        self.versions.insert(record.get(field::SVN_VERSION));
        self.users.insert(record.get(field::USER_NAME));
        self.walkers.insert(record.get(field::WALKER_NAME));
        self.ids.insert(record.id());
        if let Some(date) = decode_date(record.get(field::END_TIME)) {
            self.dates.insert(date);
        }
        self.occurrences += 1;
    }

    pub fn occurrences(&self) -> u64 {
        self.occurrences
    }

    pub fn user_flag(&self) -> &str {
        &self.user_flag
    }

    pub fn ids(&self) -> &OrderedSet {
        &self.ids
    }

    /// Shortest message; the first one seen wins ties.
    pub fn representative_message(&self) -> &str {
        self.messages
            .iter()
            .reduce(|best, m| if m.len() < best.len() { m } else { best })
            .unwrap_or_default()
    }

    /// `MM/DD/YY-MM/DD/YY` span of the dated runs, a single date, or `ND`.
    pub fn duration(&self) -> String {
        match (self.dates.first(), self.dates.last()) {
            (Some(first), Some(last)) if first != last => format!(
                "{}-{}",
                first.format(DATE_FORMAT),
                last.format(DATE_FORMAT)
            ),
            (Some(only), _) => only.format(DATE_FORMAT).to_string(),
            _ => NO_DATE.to_string(),
        }
    }

    pub fn finalize(&self) -> DigestEntry {
        DigestEntry {
            message: self.representative_message().to_string(),
            user_flag: self.user_flag.clone(),
            at: self.stack_signature.clone(),
            walkers: self.walkers.display_truncated(),
            versions: self.versions.display_truncated(),
            duration: self.duration(),
            occurrences: self.occurrences,
            users: self.users.display_truncated(),
            ids: self.ids.display_truncated(),
        }
    }
}

/// One rendered line group of the exception digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestEntry {
    pub message: String,
    pub user_flag: String,
    pub at: String,
    pub walkers: String,
    pub versions: String,
    pub duration: String,
    pub occurrences: u64,
    pub users: String,
    pub ids: String,
}

impl DigestEntry {
    pub fn write_text<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", "*".repeat(80))?;
        writeln!(out, "Exception              : {}", self.message)?;
        writeln!(out, "    is-user-exception? : {}", self.user_flag)?;
        writeln!(out, "    at                 : {}", self.at)?;
        writeln!(out, "    walkers            : {}", self.walkers)?;
        writeln!(out, "    svns               : {}", self.versions)?;
        writeln!(out, "    duration           : {}", self.duration)?;
        writeln!(out, "    occurrences        : {}", self.occurrences)?;
        writeln!(out, "    users              : {}", self.users)?;
        writeln!(out, "    ids                : {}", self.ids)
    }
}

/// Accumulates exception records until end of stream.
#[derive(Debug, Default)]
pub struct ExceptionDigest {
    groups: Vec<AggregatedException>,
    by_signature: HashMap<String, usize>,
}

impl ExceptionDigest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `record` into the group for its stack signature, creating it if new.
    pub fn add(&mut self, record: &NormalizedRecord) {
        match self.by_signature.get(record.get(field::STACKTRACE)) {
            Some(&idx) => self.groups[idx].merge(record),
            None => {
                let group = AggregatedException::new(record);
                self.by_signature
                    .insert(group.stack_signature().to_string(), self.groups.len());
                self.groups.push(group);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[AggregatedException] {
        &self.groups
    }

    /// Entries in ascending occurrence order (ties keep discovery order),
    /// restricted to `selection`.
    pub fn finalize(&self, selection: ExceptionSelection) -> Vec<DigestEntry> {
        let mut ordered: Vec<&AggregatedException> = self.groups.iter().collect();
        ordered.sort_by_key(|g| g.occurrences());
        ordered
            .into_iter()
            .filter(|g| selection.matches(g.user_flag()))
            .map(AggregatedException::finalize)
            .collect()
    }
}
