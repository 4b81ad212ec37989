//! Canonicalizer - deduplicates streamed re-emissions and orders by time.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::decoder::decode_records;
use crate::models::Message;

/// How candidates without an identifier are keyed during dedup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingIdPolicy {
    /// Give each one a distinct `anon-<n>` id so none are lost.
    #[default]
    Synthesize,
    /// Share the empty-string slot; at most one survives.
    Collapse,
}

/// Options for [`canonicalize`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CanonOptions {
    pub missing_ids: MissingIdPolicy,
}

/// Deduplicate candidates by id and sort ascending by timestamp.
///
/// For a repeated id the candidate with the strictly longest serialized
/// content wins; ties keep the earliest one seen. The sort is stable, and
/// unparseable timestamps sort as the Unix epoch.
pub fn canonicalize(candidates: Vec<Message>, options: &CanonOptions) -> Vec<Message> {
    let total = candidates.len();
    let candidates = match options.missing_ids {
        MissingIdPolicy::Synthesize => assign_missing_ids(candidates),
        MissingIdPolicy::Collapse => candidates,
    };

    let mut slots: HashMap<String, usize> = HashMap::with_capacity(candidates.len());
    let mut best: Vec<(usize, Message)> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let weight = candidate.content_weight();
        match slots.get(&candidate.id).copied() {
            Some(slot) => {
                if weight > best[slot].0 {
                    best[slot] = (weight, candidate);
                }
            }
            None => {
                slots.insert(candidate.id.clone(), best.len());
                best.push((weight, candidate));
            }
        }
    }

    let mut keyed: Vec<_> = best
        .into_iter()
        .map(|(_, message)| (message.sort_key(), message))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    debug!(candidates = total, canonical = keyed.len(), "canonicalized");
    keyed.into_iter().map(|(_, message)| message).collect()
}

/// Replace empty ids with `anon-<n>`, skipping any value already in use.
fn assign_missing_ids(mut candidates: Vec<Message>) -> Vec<Message> {
    if candidates.iter().all(|c| !c.id.is_empty()) {
        return candidates;
    }

    let taken: HashSet<String> = candidates
        .iter()
        .filter(|c| !c.id.is_empty())
        .map(|c| c.id.clone())
        .collect();

    let mut counter = 0usize;
    for candidate in candidates.iter_mut().filter(|c| c.id.is_empty()) {
        let id = loop {
            let id = format!("anon-{}", counter);
            counter += 1;
            if !taken.contains(&id) {
                break id;
            }
        };
        candidate.id = id;
    }
    candidates
}

/// Full pipeline from raw JSONL text, with default options.
pub fn decode_and_canonicalize(raw: &str) -> Vec<Message> {
    decode_and_canonicalize_with(raw, &CanonOptions::default())
}

/// Full pipeline from raw JSONL text.
pub fn decode_and_canonicalize_with(raw: &str, options: &CanonOptions) -> Vec<Message> {
    canonicalize(decode_records(raw), options)
}
