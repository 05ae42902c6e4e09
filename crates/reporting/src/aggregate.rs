//! Pure derivation functions over conversion sets. Every figure is
//! recomputed on demand from the raw fact list; there are no cached
//! running totals that could drift.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use affiliate_core::types::{Conversion, ConversionStatus, Timeframe};

use crate::timeframe::{divide_timeframe_into_segments, interval_start, Segment};

/// Revenue earned from clients: the sum of CPA over all conversions.
pub fn total_revenue(conversions: &[Conversion]) -> f64 {
    conversions.iter().map(|c| c.affiliate_link.cpa).sum()
}

/// Commission owed to agents across all conversions.
pub fn total_commission(conversions: &[Conversion]) -> f64 {
    conversions.iter().map(|c| c.affiliate_link.commission).sum()
}

/// Commission on approved conversions that have not been paid out yet.
pub fn total_unpaid_commission(conversions: &[Conversion]) -> f64 {
    conversions
        .iter()
        .filter(|c| c.status == ConversionStatus::ApprovedUnpaid)
        .map(|c| c.affiliate_link.commission)
        .sum()
}

/// CPA minus bet size minus commission, summed.
pub fn total_gross_profit(conversions: &[Conversion]) -> f64 {
    conversions
        .iter()
        .map(|c| c.affiliate_link.cpa - c.amount - c.affiliate_link.commission)
        .sum()
}

/// What the conversions cost the business: bet size plus commission, summed.
pub fn total_cost_of_conversions(conversions: &[Conversion]) -> f64 {
    conversions
        .iter()
        .map(|c| c.amount + c.affiliate_link.commission)
        .sum()
}

/// Mean bet size; 0 on an empty set.
pub fn average_bet_size(conversions: &[Conversion]) -> f64 {
    mean(conversions, |c| c.amount)
}

/// Mean commission; 0 on an empty set.
pub fn average_commission(conversions: &[Conversion]) -> f64 {
    mean(conversions, |c| c.affiliate_link.commission)
}

/// Mean CPA; 0 on an empty set.
pub fn average_cpa(conversions: &[Conversion]) -> f64 {
    mean(conversions, |c| c.affiliate_link.cpa)
}

fn mean(conversions: &[Conversion], value: impl Fn(&Conversion) -> f64) -> f64 {
    if conversions.is_empty() {
        return 0.0;
    }
    conversions.iter().map(value).sum::<f64>() / conversions.len() as f64
}

/// Conversions that occurred inside the timeframe window ending today.
pub fn filter_conversions_by_timeframe(
    conversions: &[Conversion],
    timeframe: Timeframe,
    today: NaiveDate,
) -> Vec<Conversion> {
    let start = interval_start(timeframe, today);
    conversions
        .iter()
        .filter(|c| c.date_occurred >= start)
        .cloned()
        .collect()
}

/// Conversions within an optional two-sided inclusive date bound.
pub fn filter_conversions_by_date_interval(
    conversions: &[Conversion],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<Conversion> {
    conversions
        .iter()
        .filter(|c| {
            from.map_or(true, |f| c.date_occurred >= f)
                && to.map_or(true, |t| c.date_occurred <= t)
        })
        .cloned()
        .collect()
}

/// Pair each reporting bucket with the conversions that fall into it under
/// the half-open membership rule (the final bucket includes today).
pub fn segment_conversions_by_timeframe(
    conversions: &[Conversion],
    timeframe: Timeframe,
    today: NaiveDate,
) -> Vec<(Segment, Vec<Conversion>)> {
    let segments = divide_timeframe_into_segments(timeframe, today);
    let last_index = segments.len().saturating_sub(1);

    segments
        .into_iter()
        .enumerate()
        .map(|(i, segment)| {
            let bucket: Vec<Conversion> = conversions
                .iter()
                .filter(|c| segment.contains(c.date_occurred, i == last_index))
                .cloned()
                .collect();
            (segment, bucket)
        })
        .collect()
}

/// Per-status conversion counts for back-office dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved_unpaid: usize,
    pub approved_paid: usize,
    pub rejected: usize,
}

pub fn count_by_status(conversions: &[Conversion]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for conversion in conversions {
        match conversion.status {
            ConversionStatus::Pending => counts.pending += 1,
            ConversionStatus::ApprovedUnpaid => counts.approved_unpaid += 1,
            ConversionStatus::ApprovedPaid => counts.approved_paid += 1,
            ConversionStatus::Rejected => counts.rejected += 1,
        }
    }
    counts
}

/// The approved-but-unpaid subset, in input order, ready for payout batching.
pub fn unpaid_conversions(conversions: &[Conversion]) -> Vec<Conversion> {
    conversions
        .iter()
        .filter(|c| c.status == ConversionStatus::ApprovedUnpaid)
        .cloned()
        .collect()
}
