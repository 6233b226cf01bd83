// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Budget accounting periods and their canonical keys.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Length of a budget's accounting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum PeriodKind {
    Daily,
    Weekly,
    Monthly,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Daily => "daily",
            PeriodKind::Weekly => "weekly",
            PeriodKind::Monthly => "monthly",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical identifier of one accounting window, e.g. `2024-06`.
///
/// Keys of the same kind compare equal iff they name the same window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeriodKey(String);

impl PeriodKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for PeriodKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PeriodKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Derive the period key for `date`.
///
/// - Daily: `YYYY-MM-DD`
/// - Weekly: `YYYY-Www`; weeks start on Sunday and week 1 is the week
///   containing January 1st.
/// - Monthly: `YYYY-MM`
pub fn current_period(kind: PeriodKind, date: NaiveDate) -> PeriodKey {
    let key = match kind {
        PeriodKind::Daily => date.format("%Y-%m-%d").to_string(),
        PeriodKind::Weekly => format!("{}-W{:02}", date.year(), week_of_year(date)),
        PeriodKind::Monthly => format!("{}-{:02}", date.year(), date.month()),
    };
    PeriodKey(key)
}

/// Week number counted from January 1st (1-based, Sunday-start weeks).
fn week_of_year(date: NaiveDate) -> u32 {
    let jan1_weekday = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);
    (date.ordinal0() + jan1_weekday) / 7 + 1
}
