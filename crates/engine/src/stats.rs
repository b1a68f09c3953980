//! Time-bucketed statistics primitives.
//!
//! This module owns the pure part of the statistics aggregator: canonical
//! window construction for each [`Granularity`], bucket assignment, and the
//! stale-request guard. The database query lives in the engine ops; see
//! `Engine::stats_at`.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::{EngineError, ResultEngine, Transaction, TransactionKind};

/// Statistics window granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Week,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl TryFrom<&str> for Granularity {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(EngineError::Validation(format!(
                "invalid granularity: {other}"
            ))),
        }
    }
}

/// One aggregation period, covering the half-open range
/// `[period_start, period_end)`.
///
/// Buckets are computed fresh on every request and never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    /// Sum of income amounts in minor units.
    pub income: i64,
    /// Sum of expense amounts in minor units.
    pub expense: i64,
}

impl Bucket {
    fn over_days(start: NaiveDate, end: NaiveDate, label: String) -> Self {
        Self {
            label,
            period_start: day_start(start),
            period_end: day_start(end),
            income: 0,
            expense: 0,
        }
    }
}

/// Aggregation result: ordered buckets plus the flat in-window transaction
/// list (newest first).
#[derive(Clone, Debug, Serialize)]
pub struct StatsReport {
    pub granularity: Granularity,
    pub buckets: Vec<Bucket>,
    pub transactions: Vec<Transaction>,
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn invalid_date() -> EngineError {
    EngineError::Validation("date out of range".to_string())
}

fn first_of_month(year: i32, month: u32) -> ResultEngine<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid_date)
}

fn first_of_next_month(year: i32, month: u32) -> ResultEngine<NaiveDate> {
    if month == 12 {
        first_of_month(year + 1, 1)
    } else {
        first_of_month(year, month + 1)
    }
}

/// Builds the empty bucket skeleton for `granularity` around `now`.
///
/// - `Week`: the 7 days of the current ISO week (Mon..Sun), labeled by
///   weekday abbreviation.
/// - `Month`: calendar-week slices of the current month. The first bucket
///   starts at day 1; every later bucket starts on a Monday; the last one is
///   clipped to the month end. Labeled by week-start date ("Sep 1").
/// - `Year`: the 12 months of the current year, labeled by month
///   abbreviation.
///
/// All windows are oldest-first.
pub(crate) fn window(granularity: Granularity, now: DateTime<Utc>) -> ResultEngine<Vec<Bucket>> {
    let today = now.date_naive();
    match granularity {
        Granularity::Week => {
            let monday = today
                .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
                .ok_or_else(invalid_date)?;
            let mut buckets = Vec::with_capacity(7);
            for offset in 0..7 {
                let start = monday
                    .checked_add_days(Days::new(offset))
                    .ok_or_else(invalid_date)?;
                let end = start.checked_add_days(Days::new(1)).ok_or_else(invalid_date)?;
                buckets.push(Bucket::over_days(start, end, start.format("%a").to_string()));
            }
            Ok(buckets)
        }
        Granularity::Month => {
            let month_start = first_of_month(today.year(), today.month())?;
            let month_end = first_of_next_month(today.year(), today.month())?;
            let mut buckets = Vec::new();
            let mut cursor = month_start;
            while cursor < month_end {
                let to_monday = (7 - cursor.weekday().num_days_from_monday()) % 7;
                let step = if to_monday == 0 { 7 } else { u64::from(to_monday) };
                let end = cursor
                    .checked_add_days(Days::new(step))
                    .ok_or_else(invalid_date)?
                    .min(month_end);
                let label = format!("{} {}", cursor.format("%b"), cursor.day());
                buckets.push(Bucket::over_days(cursor, end, label));
                cursor = end;
            }
            Ok(buckets)
        }
        Granularity::Year => {
            let mut buckets = Vec::with_capacity(12);
            for month in 1..=12 {
                let start = first_of_month(today.year(), month)?;
                let end = first_of_next_month(today.year(), month)?;
                buckets.push(Bucket::over_days(start, end, start.format("%b").to_string()));
            }
            Ok(buckets)
        }
    }
}

/// Accumulates a transaction into the bucket whose half-open range contains
/// its effective date. Dates outside every bucket are skipped.
pub(crate) fn assign(buckets: &mut [Bucket], tx: &Transaction) {
    let Some(bucket) = buckets
        .iter_mut()
        .find(|b| b.period_start <= tx.occurred_at && tx.occurred_at < b.period_end)
    else {
        return;
    };
    match tx.kind {
        TransactionKind::Income => bucket.income += tx.amount,
        TransactionKind::Expense => bucket.expense += tx.amount,
    }
}

/// Stale-request guard for in-flight statistics fetches.
///
/// The UI may switch granularity before a previous fetch resolves; whichever
/// request was issued last must win regardless of completion order. Each
/// request takes a ticket via [`begin`]; when its response arrives, the caller
/// applies it only if [`is_current`] still holds.
///
/// [`begin`]: StatsSession::begin
/// [`is_current`]: StatsSession::is_current
#[derive(Debug, Default)]
pub struct StatsSession {
    latest: AtomicU64,
}

/// Token identifying one statistics request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsTicket {
    serial: u64,
}

impl StatsSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new request, superseding all earlier ones.
    pub fn begin(&self) -> StatsTicket {
        let serial = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        StatsTicket { serial }
    }

    /// Whether `ticket` is still the latest issued request.
    pub fn is_current(&self, ticket: StatsTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.serial
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single().expect("valid date")
    }

    #[test]
    fn week_window_is_monday_first() {
        // 2025-09-10 is a Wednesday; its ISO week starts Monday 2025-09-08.
        let buckets = window(Granularity::Week, at(2025, 9, 10)).unwrap();
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
        assert_eq!(
            buckets[0].period_start,
            day_start(NaiveDate::from_ymd_opt(2025, 9, 8).unwrap())
        );
        assert_eq!(
            buckets[6].period_end,
            day_start(NaiveDate::from_ymd_opt(2025, 9, 15).unwrap())
        );
    }

    #[test]
    fn month_window_slices_at_mondays() {
        // September 2025 starts on a Monday, so buckets are clean weeks plus
        // the final partial week.
        let buckets = window(Granularity::Month, at(2025, 9, 10)).unwrap();
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["Sep 1", "Sep 8", "Sep 15", "Sep 22", "Sep 29"]);
        // Last bucket is clipped to the month end.
        let last = buckets.last().unwrap();
        assert_eq!(last.period_end, day_start(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()));
    }

    #[test]
    fn month_window_first_bucket_starts_midweek() {
        // October 2025 starts on a Wednesday: first bucket is Oct 1..Oct 6.
        let buckets = window(Granularity::Month, at(2025, 10, 20)).unwrap();
        assert_eq!(buckets[0].label, "Oct 1");
        assert_eq!(
            buckets[0].period_end,
            day_start(NaiveDate::from_ymd_opt(2025, 10, 6).unwrap())
        );
        assert_eq!(buckets[1].label, "Oct 6");
    }

    #[test]
    fn year_window_has_twelve_months() {
        let buckets = window(Granularity::Year, at(2025, 9, 10)).unwrap();
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].label, "Jan");
        assert_eq!(buckets[11].label, "Dec");
        assert_eq!(
            buckets[11].period_end,
            day_start(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
        );
    }

    #[test]
    fn boundary_instant_belongs_to_the_bucket_it_starts() {
        let mut buckets = window(Granularity::Week, at(2025, 9, 10)).unwrap();
        let tx = Transaction::new(
            "alice".to_string(),
            Uuid::new_v4(),
            TransactionKind::Income,
            100,
            None,
            // Exactly midnight Tuesday: excluded from Monday (end exclusive),
            // included in Tuesday.
            day_start(NaiveDate::from_ymd_opt(2025, 9, 9).unwrap()),
            None,
            None,
        )
        .unwrap();
        assign(&mut buckets, &tx);
        assert_eq!(buckets[0].income, 0);
        assert_eq!(buckets[1].income, 100);
    }

    #[test]
    fn out_of_window_transaction_is_skipped() {
        let mut buckets = window(Granularity::Week, at(2025, 9, 10)).unwrap();
        let tx = Transaction::new(
            "alice".to_string(),
            Uuid::new_v4(),
            TransactionKind::Expense,
            100,
            Some(crate::Category::Others),
            at(2025, 8, 1),
            None,
            None,
        )
        .unwrap();
        assign(&mut buckets, &tx);
        assert!(buckets.iter().all(|b| b.income == 0 && b.expense == 0));
    }

    #[test]
    fn latest_ticket_wins() {
        let session = StatsSession::new();
        let slow = session.begin();
        let fast = session.begin();
        // The older request resolves late; its result must be discarded.
        assert!(!session.is_current(slow));
        assert!(session.is_current(fast));
    }
}
