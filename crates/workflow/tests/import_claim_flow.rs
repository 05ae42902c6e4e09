//! Integration test for the full back-office flow: CSV import with fuzzy
//! client matching, cap validation, the claim workflow, and reporting
//! aggregation. Runs entirely on the in-memory stores.

use std::sync::Arc;

use chrono::NaiveDate;

use affiliate_core::config::ImportConfig;
use affiliate_core::types::{
    AffiliateDeal, AffiliateLink, Client, CompensationGroup, Conversion, ConversionStatus,
    ConversionType, ReferralType, RetentionIncentive, Timeframe, UnassignedConversion,
};
use affiliate_import::import_csv;
use affiliate_reporting::{
    filter_conversions_by_timeframe, segment_conversions_by_timeframe, total_commission,
    total_revenue,
};
use affiliate_store::{DocumentStore, MemoryDocumentStore, MemoryFileStore};
use affiliate_workflow::{CapEnforcer, ClaimEngine, ClaimReceipt, ConversionLifecycle};

fn sample_clients() -> Vec<Client> {
    let mut pointsbet = Client::new("pointsbet", "PointsBet");
    pointsbet.push_version(vec![AffiliateDeal {
        link_type: Some(ReferralType::Sports),
        cpa: 300.0,
        currency: "CAD".to_string(),
        target_bet_size: Some(25.0),
        target_monthly_conversions: Some(50),
        enabled: true,
    }]);

    let mut bet99 = Client::new("bet99", "Bet99");
    bet99.push_version(vec![AffiliateDeal {
        link_type: None,
        cpa: 250.0,
        currency: "CAD".to_string(),
        target_bet_size: None,
        target_monthly_conversions: None,
        enabled: true,
    }]);

    vec![pointsbet, bet99]
}

fn sample_group() -> CompensationGroup {
    let mut group = CompensationGroup::new("group-1");
    group.push_version(
        vec![AffiliateLink {
            client_id: "pointsbet".to_string(),
            link_type: Some(ReferralType::Sports),
            commission: 50.0,
            min_bet_size: 25.0,
            cpa: 300.0,
            monthly_limit: Some(100),
            enabled: true,
        }],
        vec![RetentionIncentive {
            client_id: "pointsbet".to_string(),
            amount: 25.0,
            monthly_limit: 10,
        }],
    );
    group
}

const CSV_BATCH: &str = "\
Date,Sportsbook,Type,Bet Size,Commission,Customer Name,Code
2024-03-01,PointsBet,sports,$100,$50,Jane Doe,march batch
2024-03-02,points bet,sports,$120,$50,Alex Chen,march batch
not-a-date,PointsBet,sports,$90,$45,Broken Row,march batch
2024-03-04,Bet99,casino,$60,$30,Sam Roy,march batch
";

#[tokio::test]
async fn test_import_claim_and_report_flow() {
    let conversions: Arc<MemoryDocumentStore<Conversion>> = Arc::new(MemoryDocumentStore::new());
    let engine = ClaimEngine::new(
        conversions.clone(),
        Arc::new(MemoryDocumentStore::<UnassignedConversion>::new()),
        Arc::new(MemoryDocumentStore::<ClaimReceipt>::new()),
        Arc::new(MemoryFileStore::new()),
    );
    let enforcer = CapEnforcer::new(conversions.clone());
    let clients = sample_clients();
    let group = sample_group();
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

    // Import: the malformed row is skipped, the batch survives.
    let outcome = import_csv(CSV_BATCH, &clients, "group-1", None, &ImportConfig::default())
        .expect("import should not fail on a bad row");
    assert_eq!(outcome.summary.processed, 3);
    assert_eq!(outcome.summary.skipped.len(), 1);
    assert!(outcome.assigned.is_empty());

    // Caps pass, so the batch is recorded as unassigned facts.
    enforcer
        .validate_batch(&group, &outcome.unassigned, today)
        .await
        .expect("batch is within all monthly caps");
    engine
        .record_unassigned(outcome.unassigned.clone())
        .await
        .unwrap();

    // Claim the whole batch for an agent.
    assert!(engine.is_assignment_code_valid("MARCH-BATCH").await.unwrap());
    let claimed = engine.claim("MARCH-BATCH", "agent-7").await.unwrap();
    assert_eq!(claimed.len(), 3);
    assert!(claimed
        .iter()
        .all(|c| c.attribution.user_id() == Some("agent-7")));

    // The code is spent and the unassigned set is empty.
    assert!(!engine.is_assignment_code_valid("MARCH-BATCH").await.unwrap());
    assert!(engine.claim("MARCH-BATCH", "agent-8").await.is_err());

    // Review one conversion through the lifecycle.
    let lifecycle = ConversionLifecycle::new();
    let approved = lifecycle
        .transition(&claimed[0], ConversionStatus::ApprovedUnpaid)
        .unwrap();
    conversions.set(&approved).await.unwrap();

    // Reporting over the persisted facts.
    let all = conversions.get_all().await.unwrap();
    assert_eq!(all.len(), 3);
    // 300 + 300 + 250 CPA across the three claimed conversions.
    assert!((total_revenue(&all) - 850.0).abs() < f64::EPSILON);
    assert!((total_commission(&all) - 130.0).abs() < f64::EPSILON);

    let recent = filter_conversions_by_timeframe(&all, Timeframe::LastMonth, today);
    assert_eq!(recent.len(), 3);

    let segmented = segment_conversions_by_timeframe(&all, Timeframe::LastMonth, today);
    let bucketed: usize = segmented.iter().map(|(_, bucket)| bucket.len()).sum();
    assert_eq!(bucketed, 3);
}

#[tokio::test]
async fn test_cap_violation_blocks_the_whole_batch() {
    let conversions: Arc<MemoryDocumentStore<Conversion>> = Arc::new(MemoryDocumentStore::new());
    let enforcer = CapEnforcer::new(conversions.clone());
    let clients = sample_clients();
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

    // A tight retention cap for the same client.
    let mut group = CompensationGroup::new("group-1");
    group.push_version(
        vec![],
        vec![RetentionIncentive {
            client_id: "pointsbet".to_string(),
            amount: 25.0,
            monthly_limit: 1,
        }],
    );

    // Two retention rows for the capped client in one batch.
    let csv_text = "\
2024-03-01,PointsBet,sports,$100,$25,Jane Doe,retention batch
2024-03-02,PointsBet,sports,$100,$25,Alex Chen,retention batch
";
    let mut outcome = import_csv(csv_text, &clients, "group-1", None, &ImportConfig::default())
        .unwrap();
    for unassigned in &mut outcome.unassigned {
        unassigned.conversion_type = ConversionType::RetentionIncentive;
    }

    let verdict = enforcer
        .validate_batch(&group, &outcome.unassigned, today)
        .await;
    assert!(verdict.is_err());
    // Nothing was recorded: rejection is batch-level, never partial.
    assert!(conversions.get_all().await.unwrap().is_empty());
}
