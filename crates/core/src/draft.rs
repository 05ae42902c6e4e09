//! Draft types for partially-edited records. Editors accumulate optional
//! fields and `finalize()` raises a validation error per missing required
//! field, distinct from import-time row skips.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AffiliateError, AffiliateResult};
use crate::types::{
    AffiliateLink, Attribution, Conversion, ConversionStatus, ConversionType, Customer,
    ReferralType,
};

/// Editor state for an affiliate link before activation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffiliateLinkDraft {
    pub client_id: Option<String>,
    /// `None` is a valid final value (applies to both verticals).
    pub link_type: Option<ReferralType>,
    pub commission: Option<f64>,
    pub min_bet_size: Option<f64>,
    pub cpa: Option<f64>,
    pub monthly_limit: Option<u32>,
    pub enabled: Option<bool>,
}

impl AffiliateLinkDraft {
    pub fn finalize(self) -> AffiliateResult<AffiliateLink> {
        let client_id = self
            .client_id
            .ok_or_else(|| AffiliateError::Validation("affiliate link has no client".into()))?;
        let commission = self
            .commission
            .ok_or_else(|| AffiliateError::Validation("affiliate link has no commission".into()))?;
        let cpa = self
            .cpa
            .ok_or_else(|| AffiliateError::Validation("affiliate link has no CPA".into()))?;

        Ok(AffiliateLink {
            client_id,
            link_type: self.link_type,
            commission,
            min_bet_size: self.min_bet_size.unwrap_or(0.0),
            cpa,
            monthly_limit: self.monthly_limit,
            enabled: self.enabled.unwrap_or(true),
        })
    }
}

/// Editor state for a manually-entered conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionDraft {
    pub conversion_type: Option<ConversionType>,
    pub date_occurred: Option<NaiveDate>,
    pub attribution: Option<Attribution>,
    pub compensation_group_id: Option<String>,
    pub affiliate_link: Option<AffiliateLink>,
    pub customer: Option<Customer>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

impl ConversionDraft {
    pub fn finalize(self) -> AffiliateResult<Conversion> {
        let conversion_type = self
            .conversion_type
            .ok_or_else(|| AffiliateError::Validation("conversion has no type".into()))?;
        let date_occurred = self
            .date_occurred
            .ok_or_else(|| AffiliateError::Validation("conversion has no date".into()))?;
        let attribution = self.attribution.ok_or_else(|| {
            AffiliateError::Validation("conversion has neither an agent nor an assignment code".into())
        })?;
        let compensation_group_id = self.compensation_group_id.ok_or_else(|| {
            AffiliateError::Validation("conversion has no compensation group".into())
        })?;
        let affiliate_link = self
            .affiliate_link
            .ok_or_else(|| AffiliateError::Validation("conversion has no affiliate link".into()))?;
        let customer = self
            .customer
            .ok_or_else(|| AffiliateError::Validation("conversion has no customer".into()))?;
        let amount = self
            .amount
            .ok_or_else(|| AffiliateError::Validation("conversion has no bet size".into()))?;

        let currency = self
            .currency
            .ok_or_else(|| AffiliateError::Validation("conversion has no currency".into()))?;

        Ok(Conversion {
            conversion_type,
            date_occurred,
            logged_at: Utc::now(),
            attribution,
            status: ConversionStatus::Pending,
            compensation_group_id,
            affiliate_link,
            customer,
            amount,
            attachment_urls: Vec::new(),
            currency,
            messages: Vec::new(),
        })
    }
}
