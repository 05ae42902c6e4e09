//! Core data model for the affiliate back office: clients and the deals they
//! offer, compensation groups, conversion facts and payouts.
//!
//! Conversions are immutable value facts. Every "mutation" produces a new
//! instance (`with_status`, `with_message`, ...) because instances are shared
//! across reporting snapshots.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Enums ──────────────────────────────────────────────────────────────

/// The product vertical a referral link points at. Deals and links carry
/// `Option<ReferralType>`; `None` means the terms apply to both verticals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralType {
    Sports,
    Casino,
}

/// The kind of customer action that earned the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionType {
    FreeBet,
    BetMatch,
    RetentionIncentive,
}

/// Review/settlement status of a conversion. Valid edges are enforced by
/// the lifecycle engine, not by this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Pending,
    ApprovedUnpaid,
    ApprovedPaid,
    Rejected,
}

/// A relative reporting window anchored to "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    LastWeek,
    LastMonth,
    LastThreeMonths,
    LastSixMonths,
    LastYear,
}

// ─── Clients & deals ────────────────────────────────────────────────────

/// Commercial terms a sportsbook client offers, prior to activation into
/// any compensation group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliateDeal {
    pub link_type: Option<ReferralType>,
    pub cpa: f64,
    pub currency: String,
    pub target_bet_size: Option<f64>,
    pub target_monthly_conversions: Option<u32>,
    pub enabled: bool,
}

/// One append-only snapshot of a client's deal list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientVersion {
    pub effective_at: DateTime<Utc>,
    pub deals: Vec<AffiliateDeal>,
}

/// A sportsbook client. Edits append a new timestamped version; old
/// versions are kept for point-in-time correctness of historical reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    /// Appended in chronological order, oldest first.
    pub versions: Vec<ClientVersion>,
}

impl Client {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            versions: Vec::new(),
        }
    }

    /// Append a new deal snapshot effective now.
    pub fn push_version(&mut self, deals: Vec<AffiliateDeal>) {
        self.versions.push(ClientVersion {
            effective_at: Utc::now(),
            deals,
        });
    }

    /// The latest snapshot at or before the given instant, if any.
    pub fn valid_version_at(&self, at: DateTime<Utc>) -> Option<&ClientVersion> {
        self.versions.iter().rev().find(|v| v.effective_at <= at)
    }

    /// Deals of the newest snapshot.
    pub fn current_deals(&self) -> &[AffiliateDeal] {
        self.versions.last().map(|v| v.deals.as_slice()).unwrap_or(&[])
    }

    /// First deal whose type equals the resolved type or is `None`
    /// (applies to both). Deal storage order is significant.
    pub fn matching_deal(&self, link_type: Option<ReferralType>) -> Option<&AffiliateDeal> {
        self.current_deals()
            .iter()
            .find(|d| d.link_type == link_type || d.link_type.is_none())
    }
}

// ─── Compensation groups ────────────────────────────────────────────────

/// Activated commission terms for a client+type inside a compensation
/// group. `cpa` is copied from the underlying deal at activation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliateLink {
    pub client_id: String,
    pub link_type: Option<ReferralType>,
    /// Commission paid to the agent per conversion.
    pub commission: f64,
    pub min_bet_size: f64,
    pub cpa: f64,
    pub monthly_limit: Option<u32>,
    pub enabled: bool,
}

impl AffiliateLink {
    /// Cap identity: two conversions count against the same monthly limit
    /// when their links share client and type.
    pub fn same_link(&self, other: &AffiliateLink) -> bool {
        self.client_id == other.client_id && self.link_type == other.link_type
    }
}

/// Fixed bonus paid for retaining a client's customer, capped per month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionIncentive {
    pub client_id: String,
    pub amount: f64,
    pub monthly_limit: u32,
}

/// One append-only snapshot of a compensation group's terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupVersion {
    pub effective_at: DateTime<Utc>,
    pub affiliate_links: Vec<AffiliateLink>,
    pub retention_incentives: Vec<RetentionIncentive>,
}

/// Versioned bundle of affiliate links and retention incentives assigned
/// to agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationGroup {
    pub id: String,
    pub enabled: bool,
    /// Appended in chronological order, oldest first.
    pub versions: Vec<GroupVersion>,
}

impl CompensationGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            versions: Vec::new(),
        }
    }

    /// Append a new terms snapshot effective now.
    pub fn push_version(
        &mut self,
        affiliate_links: Vec<AffiliateLink>,
        retention_incentives: Vec<RetentionIncentive>,
    ) {
        self.versions.push(GroupVersion {
            effective_at: Utc::now(),
            affiliate_links,
            retention_incentives,
        });
    }

    /// The latest snapshot at or before the given instant, if any.
    pub fn valid_version_at(&self, at: DateTime<Utc>) -> Option<&GroupVersion> {
        self.versions.iter().rev().find(|v| v.effective_at <= at)
    }

    /// Affiliate links of the newest snapshot.
    pub fn current_links(&self) -> &[AffiliateLink] {
        self.versions
            .last()
            .map(|v| v.affiliate_links.as_slice())
            .unwrap_or(&[])
    }

    /// Retention incentives of the newest snapshot.
    pub fn current_incentives(&self) -> &[RetentionIncentive] {
        self.versions
            .last()
            .map(|v| v.retention_incentives.as_slice())
            .unwrap_or(&[])
    }
}

// ─── Conversions ────────────────────────────────────────────────────────

/// The end customer whose action earned the conversion. Embedded value,
/// not a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
}

/// Who a conversion belongs to: a known sales agent, or an assignment code
/// waiting to be claimed. Exactly one of the two: the enum makes the
/// invariant structural, so a fact with both or neither cannot be built
/// or deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribution {
    Agent { user_id: String },
    Code { assignment_code: String },
}

impl Attribution {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Attribution::Agent { user_id } => Some(user_id),
            Attribution::Code { .. } => None,
        }
    }

    pub fn assignment_code(&self) -> Option<&str> {
        match self {
            Attribution::Agent { .. } => None,
            Attribution::Code { assignment_code } => Some(assignment_code),
        }
    }

    /// The identity segment used in deterministic conversion ids.
    pub fn id_key(&self) -> &str {
        match self {
            Attribution::Agent { user_id } => user_id,
            Attribution::Code { assignment_code } => assignment_code,
        }
    }
}

/// Common read surface shared by assigned and unassigned conversion facts,
/// used by cap enforcement over mixed candidate batches.
pub trait ConversionFact {
    fn affiliate_link(&self) -> &AffiliateLink;
    fn date_occurred(&self) -> NaiveDate;
    fn conversion_type(&self) -> ConversionType;
}

/// A recorded, commission-bearing customer action attributed to an
/// affiliate link and a sales agent (or a claimable assignment code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub conversion_type: ConversionType,
    pub date_occurred: NaiveDate,
    pub logged_at: DateTime<Utc>,
    pub attribution: Attribution,
    pub status: ConversionStatus,
    pub compensation_group_id: String,
    /// Denormalized snapshot of the link terms at conversion time, not a
    /// live reference into any compensation group.
    pub affiliate_link: AffiliateLink,
    pub customer: Customer,
    /// Bet size.
    pub amount: f64,
    pub attachment_urls: Vec<String>,
    pub currency: String,
    pub messages: Vec<String>,
}

impl Conversion {
    /// Deterministic identity, doubling as the natural dedup key. Status
    /// and message differences do not change it.
    pub fn id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.date_occurred.format("%Y-%m-%d"),
            self.attribution.id_key(),
            self.affiliate_link.client_id,
            self.customer.id
        )
    }

    pub fn with_status(&self, status: ConversionStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    pub fn with_message(&self, message: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.messages.push(message.into());
        next
    }

    /// Attach durable URLs produced by the file store after creation.
    pub fn with_attachment_urls(&self, urls: Vec<String>) -> Self {
        let mut next = self.clone();
        next.attachment_urls.extend(urls);
        next
    }
}

impl ConversionFact for Conversion {
    fn affiliate_link(&self) -> &AffiliateLink {
        &self.affiliate_link
    }
    fn date_occurred(&self) -> NaiveDate {
        self.date_occurred
    }
    fn conversion_type(&self) -> ConversionType {
        self.conversion_type
    }
}

/// The identical fact recorded before any agent is known, keyed by its
/// assignment code. Claiming moves it into a [`Conversion`] bound to a
/// user id; the same fact never exists in both sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnassignedConversion {
    pub conversion_type: ConversionType,
    pub date_occurred: NaiveDate,
    pub logged_at: DateTime<Utc>,
    pub assignment_code: String,
    pub status: ConversionStatus,
    pub compensation_group_id: String,
    pub affiliate_link: AffiliateLink,
    pub customer: Customer,
    pub amount: f64,
    pub attachment_urls: Vec<String>,
    pub currency: String,
    pub messages: Vec<String>,
}

impl UnassignedConversion {
    /// Deterministic identity; the code fills the attribution slot.
    pub fn id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.date_occurred.format("%Y-%m-%d"),
            self.assignment_code,
            self.affiliate_link.client_id,
            self.customer.id
        )
    }

    /// Bind this fact to the claiming agent, preserving every other field.
    pub fn claim(self, user_id: impl Into<String>) -> Conversion {
        Conversion {
            conversion_type: self.conversion_type,
            date_occurred: self.date_occurred,
            logged_at: self.logged_at,
            attribution: Attribution::Agent {
                user_id: user_id.into(),
            },
            status: self.status,
            compensation_group_id: self.compensation_group_id,
            affiliate_link: self.affiliate_link,
            customer: self.customer,
            amount: self.amount,
            attachment_urls: self.attachment_urls,
            currency: self.currency,
            messages: self.messages,
        }
    }
}

impl ConversionFact for UnassignedConversion {
    fn affiliate_link(&self) -> &AffiliateLink {
        &self.affiliate_link
    }
    fn date_occurred(&self) -> NaiveDate {
        self.date_occurred
    }
    fn conversion_type(&self) -> ConversionType {
        self.conversion_type
    }
}

// ─── Payouts ────────────────────────────────────────────────────────────

/// A settlement batch paying out a set of approved conversions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub id: Uuid,
    pub user_id: String,
    pub amount: f64,
    pub conversion_ids: Vec<String>,
    pub date_occurred: DateTime<Utc>,
    pub date_paid: Option<DateTime<Utc>>,
    /// Payment method/address snapshot at settlement time.
    pub payment_method: String,
    pub payment_address: String,
}
