//! Result reconciliation utilities: ranking, dedupe, socials cleanup.
//!
//! Every strategy and the final merge go through these, so the rules live in
//! one place: stable confidence-descending sort, case-insensitive identity
//! keys, keep-first semantics (which, after sorting, means keep-highest).

use std::collections::HashSet;

use super::types::{CandidateRecord, Social};

/// Length of the case-insensitive identity key.
const DEDUPE_KEY_LEN: usize = 80;

/// Identity key for a candidate: lowercased author, else title, else URL,
/// truncated to [`DEDUPE_KEY_LEN`] characters. `None` for records with no
/// identity at all (those are never emitted in the first place).
#[must_use]
pub fn dedupe_key(record: &CandidateRecord) -> Option<String> {
    let raw = record
        .author
        .as_deref()
        .or(record.title.as_deref())
        .or(record.url.as_deref())?;
    let key: String = raw.to_lowercase().chars().take(DEDUPE_KEY_LEN).collect();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Sort by confidence descending (stable, so strategy order breaks ties),
/// drop duplicate identity keys keeping the first occurrence, cap at `max`.
#[must_use]
pub fn rank(mut records: Vec<CandidateRecord>, max: usize) -> Vec<CandidateRecord> {
    records.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    let mut seen = HashSet::new();
    records.retain(|r| match dedupe_key(r) {
        Some(key) => seen.insert(key),
        None => false,
    });
    records.truncate(max);
    records
}

/// Drop socials whose URL was already seen, preserving discovery order.
#[must_use]
pub fn dedupe_socials(socials: Vec<Social>) -> Vec<Social> {
    let mut seen = HashSet::new();
    socials
        .into_iter()
        .filter(|s| !s.url.is_empty() && seen.insert(s.url.clone()))
        .collect()
}
