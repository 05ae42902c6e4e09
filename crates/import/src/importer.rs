//! Bulk conversion import from sportsbook CSV extracts.
//!
//! Row shape (positional, optional header, optional leading numeric index):
//! `[index], date, sportsbook, type, bet_size, commission, customer[, code]`
//!
//! Bad rows are skipped, never fatal: the batch continues and the summary
//! reports what was processed and what was dropped, by row.

use chrono::{NaiveDate, Utc};
use csv::ReaderBuilder;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use affiliate_core::config::ImportConfig;
use affiliate_core::error::{AffiliateError, AffiliateResult};
use affiliate_core::types::{
    AffiliateLink, Attribution, Client, Conversion, ConversionStatus, ConversionType, Customer,
    ReferralType, UnassignedConversion,
};

use crate::matcher::find_closest_match;

/// Keywords expected somewhere in a genuine header row. Source exports
/// vary in wording and column order, so these are matched anywhere in the
/// first row's concatenated text.
const HEADER_KEYWORDS: &[&str] = &[
    "date",
    "sportsbook",
    "type",
    "bet",
    "commission",
    "customer",
    "amount",
    "name",
    "code",
];

const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// What a bulk import produced and what it dropped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub processed: usize,
    pub skipped: Vec<SkippedRow>,
}

/// A dropped row and the reason it was dropped.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

/// Result of running a CSV batch against the client catalog. Rows carrying
/// (or given) an assignment code land in `unassigned`; rows attributed
/// directly to an agent land in `assigned`.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub assigned: Vec<Conversion>,
    pub unassigned: Vec<UnassignedConversion>,
    pub summary: ImportSummary,
}

/// A single CSV row resolved against the client catalog.
#[derive(Debug, Clone)]
pub struct MappedRow {
    /// 1-based content row position, or the row's explicit numeric index.
    pub row_index: usize,
    pub date_occurred: NaiveDate,
    pub link_type: Option<ReferralType>,
    pub affiliate_link: AffiliateLink,
    pub customer: Customer,
    pub amount: f64,
    pub currency: String,
    pub assignment_code: Option<String>,
}

/// Parse raw CSV text into positional string rows.
pub fn parse_rows(csv_text: &str) -> AffiliateResult<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AffiliateError::Csv(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Drop the first row when it looks like a header: at least
/// `keyword_threshold` of the expected keywords appear (case-insensitive)
/// anywhere in its concatenated text.
pub fn filter_csv_headers(rows: Vec<Vec<String>>, keyword_threshold: usize) -> Vec<Vec<String>> {
    let is_header = rows.first().is_some_and(|first| {
        let joined = first.join(" ").to_lowercase();
        let hits = HEADER_KEYWORDS
            .iter()
            .filter(|keyword| joined.contains(*keyword))
            .count();
        hits >= keyword_threshold
    });

    if is_header {
        rows.into_iter().skip(1).collect()
    } else {
        rows
    }
}

/// Resolve one content row against the client catalog. Every failure is a
/// row-level validation error the batch turns into a skip.
pub fn map_csv_row(
    row: &[String],
    position: usize,
    clients: &[&Client],
    match_threshold: f64,
) -> AffiliateResult<MappedRow> {
    // Blank leading/trailing cells come from ragged exports.
    let cells = trim_blank_edges(row);

    // Optional leading numeric row-index column.
    let (row_index, cells) = match cells.first() {
        Some(first) if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) => {
            let explicit = first.parse::<usize>().unwrap_or(position);
            (explicit, &cells[1..])
        }
        _ => (position, &cells[..]),
    };

    if cells.len() < 6 {
        return Err(AffiliateError::Validation(format!(
            "expected at least 6 columns, found {}",
            cells.len()
        )));
    }

    let date_occurred = parse_conversion_date(cells[0])?;
    let link_type = parse_link_type(cells[2]);

    let client = find_closest_match(cells[1], clients, |c| c.name.as_str(), match_threshold)
        .ok_or_else(|| {
            AffiliateError::Validation(format!("no client matches sportsbook '{}'", cells[1]))
        })?;

    let deal = client.matching_deal(link_type).ok_or_else(|| {
        AffiliateError::Validation(format!(
            "client {} has no deal for type {:?}",
            client.name, link_type
        ))
    })?;

    let amount = parse_money(cells[3])?;
    let commission = parse_money(cells[4])?;

    let customer_name = cells[5];
    if customer_name.is_empty() {
        return Err(AffiliateError::Validation("customer name is empty".into()));
    }

    let assignment_code = cells
        .get(6)
        .filter(|c| !c.is_empty())
        .map(|c| normalize_assignment_code(c));

    // The link is synthesized from the deal's identity plus the row's own
    // commission and bet size; a bulk import's commission is whatever the
    // CSV states, never a compensation-group lookup.
    let affiliate_link = AffiliateLink {
        client_id: client.id.clone(),
        link_type,
        commission,
        min_bet_size: amount,
        cpa: deal.cpa,
        monthly_limit: None,
        enabled: true,
    };

    Ok(MappedRow {
        row_index,
        date_occurred,
        link_type,
        affiliate_link,
        customer: Customer {
            id: slugify(customer_name),
            name: customer_name.to_string(),
        },
        amount,
        currency: deal.currency.clone(),
        assignment_code,
    })
}

/// Run a whole CSV batch. Rows with an assignment code (or without one
/// when no `default_agent` is given, in which case a code is generated)
/// become unassigned conversions; the rest are attributed to the agent.
pub fn import_csv(
    csv_text: &str,
    clients: &[Client],
    compensation_group_id: &str,
    default_agent: Option<&str>,
    config: &ImportConfig,
) -> AffiliateResult<ImportOutcome> {
    let rows = filter_csv_headers(parse_rows(csv_text)?, config.header_keyword_threshold);
    let enabled: Vec<&Client> = clients.iter().filter(|c| c.enabled).collect();

    let mut outcome = ImportOutcome::default();
    let mut seen_ids: Vec<String> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let position = i + 1;
        let mapped = match map_csv_row(row, position, &enabled, config.match_threshold) {
            Ok(mapped) => mapped,
            Err(e) => {
                warn!(row = position, error = %e, "skipping unparseable csv row");
                outcome.summary.skipped.push(SkippedRow {
                    row: position,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let row_index = mapped.row_index;
        match build_conversion(mapped, compensation_group_id, default_agent) {
            Built::Assigned(conversion) => {
                let id = conversion.id();
                if seen_ids.contains(&id) {
                    outcome.summary.skipped.push(SkippedRow {
                        row: row_index,
                        reason: format!("duplicate of conversion {id}"),
                    });
                    continue;
                }
                seen_ids.push(id);
                outcome.assigned.push(conversion);
            }
            Built::Unassigned(conversion) => {
                let id = conversion.id();
                if seen_ids.contains(&id) {
                    outcome.summary.skipped.push(SkippedRow {
                        row: row_index,
                        reason: format!("duplicate of conversion {id}"),
                    });
                    continue;
                }
                seen_ids.push(id);
                outcome.unassigned.push(conversion);
            }
        }
    }

    outcome.summary.processed = outcome.assigned.len() + outcome.unassigned.len();
    info!(
        processed = outcome.summary.processed,
        skipped = outcome.summary.skipped.len(),
        "csv batch mapped"
    );
    Ok(outcome)
}

enum Built {
    Assigned(Conversion),
    Unassigned(UnassignedConversion),
}

fn build_conversion(
    mapped: MappedRow,
    compensation_group_id: &str,
    default_agent: Option<&str>,
) -> Built {
    let logged_at = Utc::now();
    match (mapped.assignment_code, default_agent) {
        (None, Some(user_id)) => Built::Assigned(Conversion {
            conversion_type: ConversionType::FreeBet,
            date_occurred: mapped.date_occurred,
            logged_at,
            attribution: Attribution::Agent {
                user_id: user_id.to_string(),
            },
            status: ConversionStatus::Pending,
            compensation_group_id: compensation_group_id.to_string(),
            affiliate_link: mapped.affiliate_link,
            customer: mapped.customer,
            amount: mapped.amount,
            attachment_urls: Vec::new(),
            currency: mapped.currency,
            messages: Vec::new(),
        }),
        (code, _) => Built::Unassigned(UnassignedConversion {
            conversion_type: ConversionType::FreeBet,
            date_occurred: mapped.date_occurred,
            logged_at,
            assignment_code: code.unwrap_or_else(generate_assignment_code),
            status: ConversionStatus::Pending,
            compensation_group_id: compensation_group_id.to_string(),
            affiliate_link: mapped.affiliate_link,
            customer: mapped.customer,
            amount: mapped.amount,
            attachment_urls: Vec::new(),
            currency: mapped.currency,
            messages: Vec::new(),
        }),
    }
}

/// Claimable `XXXX-XXXX` code for rows imported without one.
pub fn generate_assignment_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(9);
    for i in 0..8 {
        if i == 4 {
            code.push('-');
        }
        let idx = rng.gen_range(0..CODE_CHARSET.len());
        code.push(CODE_CHARSET[idx] as char);
    }
    code
}

/// Strict `yyyy-mm-dd`, falling back to `yyyy-dd-mm`.
fn parse_conversion_date(cell: &str) -> AffiliateResult<NaiveDate> {
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(cell, "%Y-%d-%m"))
        .map_err(|_| AffiliateError::Validation(format!("unparseable date '{cell}'")))
}

/// Case-insensitive substring match against the two known verticals;
/// anything else leaves the type unset (applies to both).
fn parse_link_type(cell: &str) -> Option<ReferralType> {
    let lowered = cell.to_lowercase();
    if lowered.contains("sports") {
        Some(ReferralType::Sports)
    } else if lowered.contains("casino") {
        Some(ReferralType::Casino)
    } else {
        None
    }
}

fn parse_money(cell: &str) -> AffiliateResult<f64> {
    let cleaned = cell.replace('$', "");
    cleaned
        .trim()
        .parse::<f64>()
        .map_err(|_| AffiliateError::Validation(format!("unparseable amount '{cell}'")))
}

fn normalize_assignment_code(cell: &str) -> String {
    cell.trim().to_uppercase().replace(' ', "-")
}

fn trim_blank_edges(row: &[String]) -> Vec<&str> {
    let cells: Vec<&str> = row.iter().map(String::as_str).collect();
    let start = cells.iter().position(|c| !c.is_empty()).unwrap_or(0);
    let end = cells
        .iter()
        .rposition(|c| !c.is_empty())
        .map(|i| i + 1)
        .unwrap_or(0);
    cells.get(start..end).unwrap_or(&[]).to_vec()
}

fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
