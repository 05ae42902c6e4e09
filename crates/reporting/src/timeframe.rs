//! Converts a relative timeframe into a calendar-anchored start date and an
//! ordered set of reporting buckets.
//!
//! "A month ago" is always a calendar-month subtraction, never a fixed
//! millisecond offset, so windows stay correct across 28-31 day months.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use affiliate_core::types::Timeframe;

/// One reporting bucket inside a timeframe window. Buckets are half-open
/// `[start, end)` except the final bucket of a window, whose end is
/// clamped to "today" and is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Segment {
    /// Membership under the half-open rule; the last bucket of a window
    /// includes its end.
    pub fn contains(&self, date: NaiveDate, is_last: bool) -> bool {
        if is_last {
            date >= self.start && date <= self.end
        } else {
            date >= self.start && date < self.end
        }
    }
}

/// Calendar-correct start of the window ending today.
pub fn interval_start(timeframe: Timeframe, today: NaiveDate) -> NaiveDate {
    match timeframe {
        Timeframe::LastWeek => today.checked_sub_days(Days::new(6)).unwrap_or(today),
        Timeframe::LastMonth => today.checked_sub_months(Months::new(1)).unwrap_or(today),
        Timeframe::LastThreeMonths => today.checked_sub_months(Months::new(3)).unwrap_or(today),
        Timeframe::LastSixMonths => today.checked_sub_months(Months::new(6)).unwrap_or(today),
        Timeframe::LastYear => today.checked_sub_months(Months::new(12)).unwrap_or(today),
    }
}

/// Partition `[interval_start, today]` into the timeframe's fixed bucket
/// count: 7 daily, 4 weekly, 6, 6 monthly, 4 quarterly.
///
/// The first bucket starts exactly at `interval_start` and the last bucket
/// ends exactly at `today`; both are asserted.
pub fn divide_timeframe_into_segments(timeframe: Timeframe, today: NaiveDate) -> Vec<Segment> {
    let window_start = interval_start(timeframe, today);

    let starts: Vec<NaiveDate> = match timeframe {
        Timeframe::LastWeek => (0..7u64)
            .map(|i| window_start.checked_add_days(Days::new(i)).unwrap_or(window_start))
            .collect(),
        Timeframe::LastMonth => (0..4u64)
            .map(|i| {
                window_start
                    .checked_add_days(Days::new(7 * i))
                    .unwrap_or(window_start)
            })
            .collect(),
        Timeframe::LastThreeMonths => {
            let span_days = (today - window_start).num_days().max(0) as u64;
            (0..6u64)
                .map(|i| {
                    window_start
                        .checked_add_days(Days::new(span_days * i / 6))
                        .unwrap_or(window_start)
                })
                .collect()
        }
        Timeframe::LastSixMonths => (0..6u32)
            .map(|i| {
                window_start
                    .checked_add_months(Months::new(i))
                    .unwrap_or(window_start)
            })
            .collect(),
        Timeframe::LastYear => (0..4u32)
            .map(|i| {
                window_start
                    .checked_add_months(Months::new(3 * i))
                    .unwrap_or(window_start)
            })
            .collect(),
    };

    let mut segments = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let is_last = i + 1 == starts.len();
        let end = match starts.get(i + 1) {
            Some(&next) => next,
            None => today,
        };
        segments.push(Segment {
            label: segment_label(start, end, is_last),
            start,
            end,
        });
    }

    assert_eq!(segments.first().map(|s| s.start), Some(window_start));
    assert_eq!(segments.last().map(|s| s.end), Some(today));

    segments
}

/// Single-day buckets show the day; wider buckets show the inclusive range.
fn segment_label(start: NaiveDate, end: NaiveDate, is_last: bool) -> String {
    let inclusive_end = if is_last {
        end
    } else {
        end.pred_opt().unwrap_or(end)
    };
    if inclusive_end <= start {
        start.format("%b %d").to_string()
    } else {
        format!(
            "{} to {}",
            start.format("%b %d"),
            inclusive_end.format("%b %d")
        )
    }
}
