//! Conversion status lifecycle. The status type itself does not forbid
//! illegal edges; this machine is the single place that does. A transition
//! always produces a new immutable conversion, never an in-place change.

use affiliate_core::error::{AffiliateError, AffiliateResult};
use affiliate_core::types::{Conversion, ConversionStatus};

/// A single valid status transition.
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub from: ConversionStatus,
    pub to: ConversionStatus,
    pub trigger: &'static str,
}

/// Guards conversion review/settlement by enforcing the finite set of
/// valid status edges.
#[derive(Debug, Clone)]
pub struct ConversionLifecycle {
    transitions: Vec<StatusTransition>,
}

impl ConversionLifecycle {
    pub fn new() -> Self {
        let transitions = vec![
            // Pending ->
            StatusTransition {
                from: ConversionStatus::Pending,
                to: ConversionStatus::ApprovedUnpaid,
                trigger: "approve",
            },
            StatusTransition {
                from: ConversionStatus::Pending,
                to: ConversionStatus::Rejected,
                trigger: "reject",
            },
            // ApprovedUnpaid <->
            StatusTransition {
                from: ConversionStatus::ApprovedUnpaid,
                to: ConversionStatus::ApprovedPaid,
                trigger: "mark_paid",
            },
            StatusTransition {
                from: ConversionStatus::ApprovedPaid,
                to: ConversionStatus::ApprovedUnpaid,
                trigger: "unmark_paid",
            },
            // Rejected ->
            StatusTransition {
                from: ConversionStatus::Rejected,
                to: ConversionStatus::Pending,
                trigger: "reopen",
            },
        ];

        Self { transitions }
    }

    /// Returns `true` if the given edge is allowed.
    pub fn can_transition(&self, from: ConversionStatus, to: ConversionStatus) -> bool {
        self.transitions
            .iter()
            .any(|t| t.from == from && t.to == to)
    }

    /// Produce a copy of the conversion in the new status, or an error if
    /// the edge is not permitted.
    pub fn transition(
        &self,
        conversion: &Conversion,
        to: ConversionStatus,
    ) -> AffiliateResult<Conversion> {
        if self.can_transition(conversion.status, to) {
            Ok(conversion.with_status(to))
        } else {
            Err(AffiliateError::Transition(format!(
                "{:?} -> {:?} is not a valid edge",
                conversion.status, to
            )))
        }
    }
}

impl Default for ConversionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use affiliate_core::types::{
        AffiliateLink, Attribution, ConversionType, Customer, ReferralType,
    };
    use chrono::{NaiveDate, Utc};

    fn pending_conversion() -> Conversion {
        Conversion {
            conversion_type: ConversionType::FreeBet,
            date_occurred: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            logged_at: Utc::now(),
            attribution: Attribution::Agent {
                user_id: "agent-1".to_string(),
            },
            status: ConversionStatus::Pending,
            compensation_group_id: "group-1".to_string(),
            affiliate_link: AffiliateLink {
                client_id: "pointsbet".to_string(),
                link_type: Some(ReferralType::Sports),
                commission: 50.0,
                min_bet_size: 0.0,
                cpa: 300.0,
                monthly_limit: None,
                enabled: true,
            },
            customer: Customer {
                id: "cust-1".to_string(),
                name: "Jane".to_string(),
            },
            amount: 100.0,
            attachment_urls: vec![],
            currency: "CAD".to_string(),
            messages: vec![],
        }
    }

    #[test]
    fn test_every_legal_edge_is_accepted() {
        let lifecycle = ConversionLifecycle::new();
        let pending = pending_conversion();

        let approved = lifecycle
            .transition(&pending, ConversionStatus::ApprovedUnpaid)
            .unwrap();
        let paid = lifecycle
            .transition(&approved, ConversionStatus::ApprovedPaid)
            .unwrap();
        let unpaid_again = lifecycle
            .transition(&paid, ConversionStatus::ApprovedUnpaid)
            .unwrap();
        assert_eq!(unpaid_again.status, ConversionStatus::ApprovedUnpaid);

        let rejected = lifecycle
            .transition(&pending, ConversionStatus::Rejected)
            .unwrap();
        let reopened = lifecycle
            .transition(&rejected, ConversionStatus::Pending)
            .unwrap();
        assert_eq!(reopened.status, ConversionStatus::Pending);
    }

    #[test]
    fn test_illegal_edges_are_rejected() {
        let lifecycle = ConversionLifecycle::new();
        let pending = pending_conversion();

        // Pending cannot jump straight to paid.
        assert!(lifecycle
            .transition(&pending, ConversionStatus::ApprovedPaid)
            .is_err());

        // Rejected cannot be approved without reopening first.
        let rejected = pending.with_status(ConversionStatus::Rejected);
        assert!(lifecycle
            .transition(&rejected, ConversionStatus::ApprovedUnpaid)
            .is_err());
    }

    #[test]
    fn test_transition_does_not_mutate_the_original() {
        let lifecycle = ConversionLifecycle::new();
        let pending = pending_conversion();
        let _ = lifecycle
            .transition(&pending, ConversionStatus::ApprovedUnpaid)
            .unwrap();
        assert_eq!(pending.status, ConversionStatus::Pending);
    }
}
