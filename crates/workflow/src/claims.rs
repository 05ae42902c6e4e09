//! Unassigned-conversion claim workflow keyed by assignment codes.
//!
//! A claim moves every unassigned fact sharing a code into the assigned
//! set, bound to the claiming agent; the same fact never exists in both
//! sets. Codes are single-use at batch granularity: the persisted claim
//! receipt marks a code as spent, so the rule survives restarts with the
//! same store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use affiliate_core::error::{AffiliateError, AffiliateResult};
use affiliate_core::types::{Conversion, UnassignedConversion};
use affiliate_store::{Document, DocumentStore, FileStore};

/// Audit record written when an assignment code is successfully claimed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub id: Uuid,
    pub assignment_code: String,
    pub user_id: String,
    pub claimed_at: DateTime<Utc>,
    pub conversion_ids: Vec<String>,
}

impl Document for ClaimReceipt {
    fn doc_id(&self) -> String {
        self.id.to_string()
    }
}

/// Claim workflow over the store collaborators.
///
/// Claim and bulk-record are all-or-nothing: everything is validated
/// before the first write. There is a read-then-write window against
/// concurrent claimers; accepted for a low-write-concurrency back office.
pub struct ClaimEngine {
    conversions: Arc<dyn DocumentStore<Conversion>>,
    unassigned: Arc<dyn DocumentStore<UnassignedConversion>>,
    receipts: Arc<dyn DocumentStore<ClaimReceipt>>,
    files: Arc<dyn FileStore>,
}

impl ClaimEngine {
    pub fn new(
        conversions: Arc<dyn DocumentStore<Conversion>>,
        unassigned: Arc<dyn DocumentStore<UnassignedConversion>>,
        receipts: Arc<dyn DocumentStore<ClaimReceipt>>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            conversions,
            unassigned,
            receipts,
            files,
        }
    }

    /// Persist a freshly imported unassigned batch, all-or-nothing.
    pub async fn record_unassigned(
        &self,
        batch: Vec<UnassignedConversion>,
    ) -> AffiliateResult<usize> {
        let count = batch.len();
        self.unassigned.create_bulk(&batch).await?;
        info!(count, "unassigned conversions recorded");
        Ok(count)
    }

    /// Persist an agent-attributed batch, all-or-nothing.
    pub async fn record_assigned(&self, batch: Vec<Conversion>) -> AffiliateResult<usize> {
        let count = batch.len();
        self.conversions.create_bulk(&batch).await?;
        info!(count, "conversions recorded");
        Ok(count)
    }

    /// A code is valid until the first successful claim against it.
    pub async fn is_assignment_code_valid(&self, code: &str) -> AffiliateResult<bool> {
        let needle = code.to_string();
        let spent = self
            .receipts
            .query(Box::new(move |r: &ClaimReceipt| {
                r.assignment_code == needle
            }))
            .await?;
        Ok(spent.is_empty())
    }

    /// Attribute every unassigned conversion sharing `code` to the
    /// claiming agent. Facts are moved out of the unassigned set, never
    /// duplicated; the receipt write marks the code as spent.
    pub async fn claim(&self, code: &str, user_id: &str) -> AffiliateResult<Vec<Conversion>> {
        if !self.is_assignment_code_valid(code).await? {
            return Err(AffiliateError::Claim(format!(
                "assignment code {code} has already been claimed"
            )));
        }

        let needle = code.to_string();
        let pending = self
            .unassigned
            .query(Box::new(move |u: &UnassignedConversion| {
                u.assignment_code == needle
            }))
            .await?;
        if pending.is_empty() {
            return Err(AffiliateError::Claim(format!(
                "no unassigned conversions carry code {code}"
            )));
        }

        let claimed: Vec<Conversion> = pending
            .iter()
            .cloned()
            .map(|u| u.claim(user_id))
            .collect();

        self.conversions.create_bulk(&claimed).await?;
        self.receipts
            .set(&ClaimReceipt {
                id: Uuid::new_v4(),
                assignment_code: code.to_string(),
                user_id: user_id.to_string(),
                claimed_at: Utc::now(),
                conversion_ids: claimed.iter().map(Conversion::id).collect(),
            })
            .await?;
        for unassigned in &pending {
            self.unassigned.remove(&unassigned.id()).await?;
        }

        info!(
            code,
            user_id,
            count = claimed.len(),
            "assignment code claimed"
        );
        Ok(claimed)
    }

    /// Upload attachment files and attach the resulting durable URLs to an
    /// existing conversion, producing (and persisting) the new instance.
    pub async fn attach_files(
        &self,
        conversion_id: &str,
        files: Vec<(String, Vec<u8>)>,
    ) -> AffiliateResult<Conversion> {
        let conversion = self.conversions.get(conversion_id).await?.ok_or_else(|| {
            AffiliateError::Storage(format!("no conversion with id {conversion_id}"))
        })?;

        let mut urls = Vec::with_capacity(files.len());
        for (name, contents) in files {
            let path = format!("conversions/{conversion_id}/{name}");
            urls.push(self.files.upload(&path, contents).await?);
        }

        let updated = conversion.with_attachment_urls(urls);
        self.conversions.set(&updated).await?;
        Ok(updated)
    }
}
