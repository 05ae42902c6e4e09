//! AffiliateDesk — accounting core of the affiliate commission back office.
//!
//! CLI entry point wiring configuration, the in-memory reference stores and
//! the import/claim/reporting engines together. Each subcommand runs a CSV
//! batch through the pipeline and prints what happened.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use affiliate_core::config::AppConfig;
use affiliate_core::types::{
    AffiliateDeal, AffiliateLink, Client, CompensationGroup, Conversion, ReferralType,
    RetentionIncentive, Timeframe, UnassignedConversion,
};
use affiliate_import::import_csv;
use affiliate_reporting::{
    average_bet_size, count_by_status, segment_conversions_by_timeframe, total_commission,
    total_gross_profit, total_revenue,
};
use affiliate_store::{DocumentStore, MemoryDocumentStore, MemoryFileStore};
use affiliate_workflow::{CapEnforcer, ClaimEngine, ClaimReceipt};

#[derive(Parser, Debug)]
#[command(name = "affiliate-desk")]
#[command(about = "Affiliate commission back office: import, claim and report on conversions")]
#[command(version)]
struct Cli {
    /// Fuzzy client-match threshold (overrides config)
    #[arg(long, env = "AFFILIATE_DESK__IMPORT__MATCH_THRESHOLD")]
    match_threshold: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a CSV batch, enforce monthly caps and record the conversions
    Import {
        /// Path to the CSV extract
        file: PathBuf,
        /// Compensation group the batch belongs to
        #[arg(long, default_value = "group-demo")]
        group: String,
        /// Attribute code-less rows directly to this agent
        #[arg(long)]
        agent: Option<String>,
    },
    /// Import a CSV batch, then claim an assignment code for an agent
    Claim {
        /// Path to the CSV extract
        file: PathBuf,
        /// Assignment code to claim
        code: String,
        /// Claiming agent
        #[arg(long)]
        agent: String,
        #[arg(long, default_value = "group-demo")]
        group: String,
    },
    /// Import a CSV batch for an agent and print aggregate figures
    Report {
        /// Path to the CSV extract
        file: PathBuf,
        #[arg(long, default_value = "agent-demo")]
        agent: String,
        #[arg(long, value_enum, default_value_t = TimeframeArg::LastMonth)]
        timeframe: TimeframeArg,
        #[arg(long, default_value = "group-demo")]
        group: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TimeframeArg {
    LastWeek,
    LastMonth,
    LastThreeMonths,
    LastSixMonths,
    LastYear,
}

impl From<TimeframeArg> for Timeframe {
    fn from(arg: TimeframeArg) -> Self {
        match arg {
            TimeframeArg::LastWeek => Timeframe::LastWeek,
            TimeframeArg::LastMonth => Timeframe::LastMonth,
            TimeframeArg::LastThreeMonths => Timeframe::LastThreeMonths,
            TimeframeArg::LastSixMonths => Timeframe::LastSixMonths,
            TimeframeArg::LastYear => Timeframe::LastYear,
        }
    }
}

struct Desk {
    conversions: Arc<MemoryDocumentStore<Conversion>>,
    engine: ClaimEngine,
    enforcer: CapEnforcer,
    clients: Vec<Client>,
    group: CompensationGroup,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "affiliate_desk=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(threshold) = cli.match_threshold {
        config.import.match_threshold = threshold;
    }

    info!("AffiliateDesk starting up");

    match cli.command {
        Command::Import { file, group, agent } => {
            let desk = Desk::with_demo_catalog(&group);
            let csv_text = std::fs::read_to_string(&file)?;
            let outcome = import_csv(
                &csv_text,
                &desk.clients,
                &group,
                agent.as_deref(),
                &config.import,
            )?;

            let today = Utc::now().date_naive();
            desk.enforcer
                .validate_batch(&desk.group, &outcome.unassigned, today)
                .await?;
            desk.enforcer
                .validate_batch(&desk.group, &outcome.assigned, today)
                .await?;

            let codes: Vec<String> = outcome
                .unassigned
                .iter()
                .map(|u| u.assignment_code.clone())
                .collect();
            desk.engine.record_unassigned(outcome.unassigned).await?;
            desk.engine.record_assigned(outcome.assigned).await?;

            println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
            for code in codes {
                println!("claimable code: {code}");
            }
        }
        Command::Claim {
            file,
            code,
            agent,
            group,
        } => {
            let desk = Desk::with_demo_catalog(&group);
            let csv_text = std::fs::read_to_string(&file)?;
            let outcome = import_csv(&csv_text, &desk.clients, &group, None, &config.import)?;

            let today = Utc::now().date_naive();
            desk.enforcer
                .validate_batch(&desk.group, &outcome.unassigned, today)
                .await?;
            desk.engine.record_unassigned(outcome.unassigned).await?;

            let claimed = desk.engine.claim(&code, &agent).await?;
            println!("claimed {} conversions for {agent}:", claimed.len());
            for conversion in &claimed {
                println!("  {}", conversion.id());
            }
        }
        Command::Report {
            file,
            agent,
            timeframe,
            group,
        } => {
            let desk = Desk::with_demo_catalog(&group);
            let csv_text = std::fs::read_to_string(&file)?;
            let outcome = import_csv(
                &csv_text,
                &desk.clients,
                &group,
                Some(agent.as_str()),
                &config.import,
            )?;
            desk.engine.record_assigned(outcome.assigned).await?;

            let all = desk.conversions.get_all().await?;
            let today = Utc::now().date_naive();
            let timeframe = Timeframe::from(timeframe);

            println!("conversions: {}", all.len());
            println!("revenue:     {:.2}", total_revenue(&all));
            println!("commission:  {:.2}", total_commission(&all));
            println!("gross:       {:.2}", total_gross_profit(&all));
            println!("avg bet:     {:.2}", average_bet_size(&all));
            println!("by status:   {:?}", count_by_status(&all));
            println!();
            for (segment, bucket) in segment_conversions_by_timeframe(&all, timeframe, today) {
                println!("{:<20} {}", segment.label, bucket.len());
            }
        }
    }

    Ok(())
}

impl Desk {
    /// Wire the engines over fresh in-memory stores and a small demo
    /// client catalog, the stand-in for a real persistence backend.
    fn with_demo_catalog(group_id: &str) -> Self {
        let conversions: Arc<MemoryDocumentStore<Conversion>> =
            Arc::new(MemoryDocumentStore::new());
        let engine = ClaimEngine::new(
            conversions.clone(),
            Arc::new(MemoryDocumentStore::<UnassignedConversion>::new()),
            Arc::new(MemoryDocumentStore::<ClaimReceipt>::new()),
            Arc::new(MemoryFileStore::new()),
        );
        let enforcer = CapEnforcer::new(conversions.clone());

        Self {
            conversions,
            engine,
            enforcer,
            clients: demo_clients(),
            group: demo_group(group_id),
        }
    }
}

fn demo_clients() -> Vec<Client> {
    let mut pointsbet = Client::new("pointsbet", "PointsBet");
    pointsbet.push_version(vec![
        AffiliateDeal {
            link_type: Some(ReferralType::Sports),
            cpa: 300.0,
            currency: "CAD".to_string(),
            target_bet_size: Some(25.0),
            target_monthly_conversions: Some(50),
            enabled: true,
        },
        AffiliateDeal {
            link_type: Some(ReferralType::Casino),
            cpa: 200.0,
            currency: "CAD".to_string(),
            target_bet_size: None,
            target_monthly_conversions: None,
            enabled: true,
        },
    ]);

    let mut bet99 = Client::new("bet99", "Bet99");
    bet99.push_version(vec![AffiliateDeal {
        link_type: None,
        cpa: 250.0,
        currency: "CAD".to_string(),
        target_bet_size: None,
        target_monthly_conversions: None,
        enabled: true,
    }]);

    let mut sia = Client::new("sports-interaction", "Sports Interaction");
    sia.push_version(vec![AffiliateDeal {
        link_type: Some(ReferralType::Sports),
        cpa: 275.0,
        currency: "CAD".to_string(),
        target_bet_size: Some(20.0),
        target_monthly_conversions: None,
        enabled: true,
    }]);

    vec![pointsbet, bet99, sia]
}

fn demo_group(group_id: &str) -> CompensationGroup {
    let mut group = CompensationGroup::new(group_id);
    group.push_version(
        vec![
            AffiliateLink {
                client_id: "pointsbet".to_string(),
                link_type: Some(ReferralType::Sports),
                commission: 50.0,
                min_bet_size: 25.0,
                cpa: 300.0,
                monthly_limit: Some(100),
                enabled: true,
            },
            AffiliateLink {
                client_id: "bet99".to_string(),
                link_type: None,
                commission: 40.0,
                min_bet_size: 0.0,
                cpa: 250.0,
                monthly_limit: None,
                enabled: true,
            },
        ],
        vec![RetentionIncentive {
            client_id: "pointsbet".to_string(),
            amount: 25.0,
            monthly_limit: 20,
        }],
    );
    group
}
