//! Inclusion predicates applied to raw run reports before decoding.

use std::fmt;

use chrono::NaiveDate;

use crate::report::Element;

/// Placeholder used for a timestamp that carries no usable date.
pub const NO_DATE: &str = "ND";

/// Date portion (`YYYY/MM/DD`) of a run-report timestamp such as
/// `2010/08/31 15.38.00`; `None` for `ND` or anything unparsable.
pub fn decode_date(timestamp: &str) -> Option<NaiveDate> {
    let date = timestamp.split_whitespace().next()?;
    if date == NO_DATE {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y/%m/%d").ok()
}

/// Which filters are active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Drop reports from developer builds.
    pub no_dev: bool,
    /// Keep only reports whose version starts with this prefix.
    pub revision: Option<String>,
    /// Keep only reports that ended at most this many days before `today`.
    pub max_days: Option<i64>,
    /// Reference day for `max_days`.
    pub today: NaiveDate,
}

impl FilterConfig {
    /// No filtering, with `today` taken from the local clock.
    pub fn new() -> Self {
        Self {
            no_dev: false,
            revision: None,
            max_days: None,
            today: chrono::Local::now().date_naive(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a report was excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    DevBuild,
    Revision,
    TooOld,
    /// Age cutoff active but the end time carries no date.
    UnknownAge,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rejection::DevBuild => "dev build",
            Rejection::Revision => "revision mismatch",
            Rejection::TooOld => "older than max days",
            Rejection::UnknownAge => "no end date",
        })
    }
}

/// Applies a [`FilterConfig`] to raw reports.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    config: FilterConfig,
}

impl RecordFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn passes_filters(&self, report: &Element) -> bool {
        self.check(report).is_ok()
    }

    /// First filter that rejects `report`, if any.
    pub fn check(&self, report: &Element) -> Result<(), Rejection> {
        if self.config.no_dev && is_dev_build(report) {
            return Err(Rejection::DevBuild);
        }

        if let Some(prefix) = &self.config.revision {
            let matches = report
                .child_text("svn-version")
                .map(|v| v.starts_with(prefix.as_str()))
                .unwrap_or(false);
            if !matches {
                return Err(Rejection::Revision);
            }
        }

        if let Some(max_days) = self.config.max_days {
            let end = report
                .child_text("end-time")
                .and_then(decode_date)
                .ok_or(Rejection::UnknownAge)?;
            if (self.config.today - end).num_days() > max_days {
                return Err(Rejection::TooOld);
            }
        }

        Ok(())
    }
}

fn is_dev_build(report: &Element) -> bool {
    report
        .find("argument-collection")
        .and_then(|args| args.child_text("phone-home-type"))
        .map(|t| t == "DEV")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RUN_REPORT;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> FilterConfig {
        FilterConfig {
            today: day(2010, 9, 10),
            ..FilterConfig::new()
        }
    }

    fn report(version: &str, end: &str, phone_home: &str) -> Element {
        Element::new(RUN_REPORT)
            .with_child(Element::leaf("svn-version", version))
            .with_child(Element::leaf("end-time", end))
            .with_child(
                Element::new("argument-collection")
                    .with_child(Element::leaf("phone-home-type", phone_home)),
            )
    }

    #[test]
    fn decode_date_uses_only_the_date_part() {
        assert_eq!(decode_date("2010/08/31 15.38.00"), Some(day(2010, 8, 31)));
        assert_eq!(decode_date("2010/08/31"), Some(day(2010, 8, 31)));
        assert_eq!(decode_date("ND"), None);
        assert_eq!(decode_date("NA"), None);
        assert_eq!(decode_date(""), None);
    }

    #[test]
    fn no_filters_pass_everything() {
        let filter = RecordFilter::new(config());
        assert!(filter.passes_filters(&Element::new(RUN_REPORT)));
    }

    #[test]
    fn dev_builds_excluded_only_when_enabled() {
        let dev = report("1.3-1-gabc", "2010/09/09 00.00.00", "DEV");
        let standard = report("1.3-1-gabc", "2010/09/09 00.00.00", "STANDARD");

        assert!(RecordFilter::new(config()).passes_filters(&dev));

        let filter = RecordFilter::new(FilterConfig {
            no_dev: true,
            ..config()
        });
        assert_eq!(filter.check(&dev), Err(Rejection::DevBuild));
        assert!(filter.passes_filters(&standard));
    }

    #[test]
    fn revision_prefix_must_match() {
        let filter = RecordFilter::new(FilterConfig {
            revision: Some("1.3".to_string()),
            ..config()
        });
        assert!(filter.passes_filters(&report("1.3-5-gabc", "ND", "STANDARD")));
        assert_eq!(
            filter.check(&report("1.4-5-gabc", "ND", "STANDARD")),
            Err(Rejection::Revision)
        );
        assert_eq!(
            filter.check(&Element::new(RUN_REPORT)),
            Err(Rejection::Revision)
        );
    }

    #[test]
    fn max_days_cutoff() {
        let filter = RecordFilter::new(FilterConfig {
            max_days: Some(7),
            ..config()
        });
        // 2010/09/03 is exactly 7 days before 2010/09/10.
        assert!(filter.passes_filters(&report("1.3", "2010/09/03 23.59.59", "STANDARD")));
        assert_eq!(
            filter.check(&report("1.3", "2010/09/02 10.00.00", "STANDARD")),
            Err(Rejection::TooOld)
        );
        assert_eq!(
            filter.check(&report("1.3", "ND", "STANDARD")),
            Err(Rejection::UnknownAge)
        );
    }
}
