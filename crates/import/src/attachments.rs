//! Attachment-to-row matching for bulk imports. Uploaded files follow the
//! `conv{N}_attach{M}.ext` naming convention, where N is the CSV row's
//! 1-based (or explicit) numeric index.

use std::collections::BTreeMap;

/// The row index a filename belongs to, if it follows the convention.
pub fn attachment_row_index(filename: &str) -> Option<usize> {
    let rest = filename.strip_prefix("conv")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let after = rest.get(digits.len()..)?;
    if !after.starts_with("_attach") {
        return None;
    }
    digits.parse().ok()
}

/// Group filenames by the row they attach to, preserving input order
/// within each row. Non-conforming names are ignored.
pub fn group_attachments_by_row(filenames: &[String]) -> BTreeMap<usize, Vec<String>> {
    let mut grouped: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for filename in filenames {
        if let Some(row) = attachment_row_index(filename) {
            grouped.entry(row).or_default().push(filename.clone());
        }
    }
    grouped
}
