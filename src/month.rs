//! # Month Module
//!
//! Invoice months are `YYYY-MM` strings. The format sorts correctly as text, so
//! range checks compare the strings directly.

use chrono::{Datelike, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{InvoiceError, Result};

static MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(0[1-9]|1[0-2])$").unwrap());

/// A validated invoice month
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct InvoiceMonth(String);

impl InvoiceMonth {
    pub fn parse(s: &str) -> Result<Self> {
        let t = s.trim();
        if MONTH_RE.is_match(t) {
            Ok(InvoiceMonth(t.to_string()))
        } else {
            Err(InvoiceError::InvalidMonth(s.to_string()))
        }
    }

    /// The calendar month before `today`, the default billing period
    pub fn previous(today: NaiveDate) -> Self {
        let prev = today
            .with_day(1)
            .and_then(|d| d.checked_sub_months(Months::new(1)))
            .unwrap_or(today);
        InvoiceMonth(format!("{:04}-{:02}", prev.year(), prev.month()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parts(&self) -> (i32, i32) {
        // Both halves are guaranteed numeric by MONTH_RE
        let (y, m) = self.0.split_at(4);
        (
            y.parse().unwrap_or_default(),
            m[1..].parse().unwrap_or_default(),
        )
    }

    /// Whole months from `earlier` to `self` (negative when `earlier` is later)
    pub fn months_since(&self, earlier: &InvoiceMonth) -> i32 {
        let (y1, m1) = self.parts();
        let (y2, m2) = earlier.parts();
        (y1 - y2) * 12 + (m1 - m2)
    }
}

impl fmt::Display for InvoiceMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InvoiceMonth {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self> {
        InvoiceMonth::parse(s)
    }
}

impl<'de> Deserialize<'de> for InvoiceMonth {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        InvoiceMonth::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Inclusive month window; a missing bound is open
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonthRange {
    pub start: Option<InvoiceMonth>,
    pub end: Option<InvoiceMonth>,
}

impl MonthRange {
    pub fn new(start: Option<InvoiceMonth>, end: Option<InvoiceMonth>) -> Option<Self> {
        if start.is_none() && end.is_none() {
            None
        } else {
            Some(MonthRange { start, end })
        }
    }

    pub fn contains(&self, month: &InvoiceMonth) -> bool {
        self.start.as_ref().is_none_or(|s| s <= month)
            && self.end.as_ref().is_none_or(|e| month <= e)
    }
}
