use std::collections::HashSet;

use super::domain::JobRecord;

/// Drops records whose link was already seen. Order is preserved and the
/// first occurrence of each link wins.
pub fn dedupe(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.link.clone()))
        .collect()
}

/// Relevance gate between dedupe and export. Every record currently passes.
pub fn filter_relevant(records: Vec<JobRecord>) -> Vec<JobRecord> {
    records
}
