//! Row selection over a normalized [`FireTable`].
//!
//! Filters borrow from the table and never modify it.

use chrono::NaiveDate;

use crate::detection::{FireDetection, FireTable};

/// Rows acquired on `date`. An empty result is a valid selection.
pub fn filter_by_date(table: &FireTable, date: NaiveDate) -> Vec<&FireDetection> {
    table.iter().filter(|r| r.acq_date == date).collect()
}

/// Distinct acquisition dates, ascending.
pub fn available_dates(table: &FireTable) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = table.iter().map(|r| r.acq_date).collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// Most recent acquisition date; the default date selection.
pub fn latest_date(table: &FireTable) -> Option<NaiveDate> {
    table.iter().map(|r| r.acq_date).max()
}
