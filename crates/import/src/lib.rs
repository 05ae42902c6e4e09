pub mod attachments;
pub mod importer;
pub mod matcher;

pub use importer::{import_csv, ImportOutcome, ImportSummary};
pub use matcher::{find_closest_match, DEFAULT_MATCH_THRESHOLD};
