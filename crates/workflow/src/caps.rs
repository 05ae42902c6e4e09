//! Monthly cap validation. Both checks evaluate the full candidate batch
//! against what already exists this month before anything is committed:
//! a violation rejects the whole batch, never a prefix of it.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::warn;

use affiliate_core::error::{AffiliateError, AffiliateResult};
use affiliate_core::types::{
    AffiliateLink, CompensationGroup, Conversion, ConversionFact, ConversionType,
    RetentionIncentive,
};
use affiliate_store::DocumentStore;

/// First day of the month containing `today`.
pub fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

/// Affiliate-link check: existing conversions against the exact same link
/// since month start plus the batch's must stay within `monthly_limit`.
pub fn check_link_caps<F: ConversionFact>(
    links: &[AffiliateLink],
    existing: &[Conversion],
    batch: &[F],
    month_start: NaiveDate,
) -> AffiliateResult<()> {
    for link in links {
        let Some(limit) = link.monthly_limit else {
            continue;
        };

        let existing_count = existing
            .iter()
            .filter(|c| c.date_occurred >= month_start && c.affiliate_link.same_link(link))
            .count();
        let batch_count = batch
            .iter()
            .filter(|f| f.affiliate_link().same_link(link))
            .count();

        let total = existing_count + batch_count;
        if total > limit as usize {
            warn!(
                client_id = %link.client_id,
                total,
                limit,
                "affiliate link monthly cap rejected a batch"
            );
            return Err(AffiliateError::CapExceeded(format!(
                "affiliate link for client {} ({:?}) would reach {} of {} monthly conversions",
                link.client_id, link.link_type, total, limit
            )));
        }
    }
    Ok(())
}

/// Retention-incentive check: existing retention conversions for the
/// client since month start plus the batch's must stay within the
/// incentive's `monthly_limit`.
pub fn check_retention_caps<F: ConversionFact>(
    incentives: &[RetentionIncentive],
    existing: &[Conversion],
    batch: &[F],
    month_start: NaiveDate,
) -> AffiliateResult<()> {
    for incentive in incentives {
        let existing_count = existing
            .iter()
            .filter(|c| {
                c.date_occurred >= month_start
                    && c.conversion_type == ConversionType::RetentionIncentive
                    && c.affiliate_link.client_id == incentive.client_id
            })
            .count();
        let batch_count = batch
            .iter()
            .filter(|f| {
                f.conversion_type() == ConversionType::RetentionIncentive
                    && f.affiliate_link().client_id == incentive.client_id
            })
            .count();

        let total = existing_count + batch_count;
        if total > incentive.monthly_limit as usize {
            warn!(
                client_id = %incentive.client_id,
                total,
                limit = incentive.monthly_limit,
                "retention incentive monthly cap rejected a batch"
            );
            return Err(AffiliateError::CapExceeded(format!(
                "retention incentive for client {} would reach {} of {} this month",
                incentive.client_id, total, incentive.monthly_limit
            )));
        }
    }
    Ok(())
}

/// Store-reading wrapper gating both the manual and bulk submission paths.
pub struct CapEnforcer {
    conversions: Arc<dyn DocumentStore<Conversion>>,
}

impl CapEnforcer {
    pub fn new(conversions: Arc<dyn DocumentStore<Conversion>>) -> Self {
        Self { conversions }
    }

    /// Validate a candidate batch against the group's current terms.
    pub async fn validate_batch<F: ConversionFact>(
        &self,
        group: &CompensationGroup,
        batch: &[F],
        today: NaiveDate,
    ) -> AffiliateResult<()> {
        let start = month_start(today);
        let existing = self
            .conversions
            .query(Box::new(move |c: &Conversion| c.date_occurred >= start))
            .await?;

        check_link_caps(group.current_links(), &existing, batch, start)?;
        check_retention_caps(group.current_incentives(), &existing, batch, start)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use affiliate_core::types::{Attribution, ConversionStatus, Customer, ReferralType};
    use chrono::Utc;

    fn capped_link(limit: u32) -> AffiliateLink {
        AffiliateLink {
            client_id: "pointsbet".to_string(),
            link_type: Some(ReferralType::Sports),
            commission: 50.0,
            min_bet_size: 0.0,
            cpa: 300.0,
            monthly_limit: Some(limit),
            enabled: true,
        }
    }

    fn conversion_on(
        date: NaiveDate,
        conversion_type: ConversionType,
        customer_id: &str,
    ) -> Conversion {
        Conversion {
            conversion_type,
            date_occurred: date,
            logged_at: Utc::now(),
            attribution: Attribution::Agent {
                user_id: "agent-1".to_string(),
            },
            status: ConversionStatus::Pending,
            compensation_group_id: "group-1".to_string(),
            affiliate_link: capped_link(5),
            customer: Customer {
                id: customer_id.to_string(),
                name: "Jane".to_string(),
            },
            amount: 100.0,
            attachment_urls: vec![],
            currency: "CAD".to_string(),
            messages: vec![],
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_link_cap_allows_batch_at_the_limit() {
        let links = vec![capped_link(3)];
        let existing = vec![conversion_on(day(2024, 3, 2), ConversionType::FreeBet, "c1")];
        let batch = vec![
            conversion_on(day(2024, 3, 10), ConversionType::FreeBet, "c2"),
            conversion_on(day(2024, 3, 11), ConversionType::FreeBet, "c3"),
        ];

        assert!(check_link_caps(&links, &existing, &batch, day(2024, 3, 1)).is_ok());
    }

    #[test]
    fn test_link_cap_rejects_batch_over_the_limit() {
        let links = vec![capped_link(3)];
        let existing = vec![conversion_on(day(2024, 3, 2), ConversionType::FreeBet, "c1")];
        let batch: Vec<Conversion> = (0..3)
            .map(|i| conversion_on(day(2024, 3, 10), ConversionType::FreeBet, &format!("c{i}")))
            .collect();

        let result = check_link_caps(&links, &existing, &batch, day(2024, 3, 1));
        assert!(matches!(result, Err(AffiliateError::CapExceeded(_))));
    }

    #[test]
    fn test_link_cap_ignores_previous_months() {
        let links = vec![capped_link(2)];
        let existing = vec![
            conversion_on(day(2024, 2, 28), ConversionType::FreeBet, "c1"),
            conversion_on(day(2024, 2, 27), ConversionType::FreeBet, "c2"),
        ];
        let batch = vec![conversion_on(day(2024, 3, 10), ConversionType::FreeBet, "c3")];

        assert!(check_link_caps(&links, &existing, &batch, day(2024, 3, 1)).is_ok());
    }

    #[test]
    fn test_retention_cap_rejects_whole_batch_from_limit_minus_one() {
        let incentives = vec![RetentionIncentive {
            client_id: "pointsbet".to_string(),
            amount: 25.0,
            monthly_limit: 5,
        }];
        // Already at limit - 1.
        let existing: Vec<Conversion> = (0..4)
            .map(|i| {
                conversion_on(
                    day(2024, 3, 2),
                    ConversionType::RetentionIncentive,
                    &format!("c{i}"),
                )
            })
            .collect();
        // A two-item batch would land at limit + 1: the whole batch dies,
        // not just the second item.
        let batch: Vec<Conversion> = (4..6)
            .map(|i| {
                conversion_on(
                    day(2024, 3, 10),
                    ConversionType::RetentionIncentive,
                    &format!("c{i}"),
                )
            })
            .collect();

        let result = check_retention_caps(&incentives, &existing, &batch, day(2024, 3, 1));
        assert!(matches!(result, Err(AffiliateError::CapExceeded(_))));
    }

    #[test]
    fn test_retention_cap_ignores_other_conversion_types() {
        let incentives = vec![RetentionIncentive {
            client_id: "pointsbet".to_string(),
            amount: 25.0,
            monthly_limit: 1,
        }];
        let batch = vec![
            conversion_on(day(2024, 3, 10), ConversionType::FreeBet, "c1"),
            conversion_on(day(2024, 3, 11), ConversionType::BetMatch, "c2"),
        ];

        assert!(check_retention_caps(&incentives, &[], &batch, day(2024, 3, 1)).is_ok());
    }
}
