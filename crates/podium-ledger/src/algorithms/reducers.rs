//! # State Reducers
//!
//! Pure folds from record sequences to views. Placeholders are skipped
//! everywhere; profile, balance and follow-set reduce in `created_at`
//! order regardless of how the records arrived.

use crate::domain::{Address, Document, PostContent, Record};
use indexmap::IndexSet;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::trace;

/// Fields that describe a record rather than the entity.
const RECORD_META_KEYS: [&str; 2] = ["record", "type"];

/// Stable sort by ledger timestamp.
pub fn order_by_creation(records: &mut [Record]) {
    records.sort_by_key(|r| r.created_at);
}

fn ordered(records: &[Record]) -> Vec<&Record> {
    let mut out: Vec<&Record> = records.iter().filter(|r| !r.is_placeholder()).collect();
    out.sort_by_key(|r| r.created_at);
    out
}

/// Merge `source` into `target`. Objects merge recursively, anything else
/// overwrites.
pub fn deep_merge(target: &mut Document, source: &Document) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Profile document: later records win per field.
pub fn reduce_profile(records: &[Record]) -> Document {
    let mut profile = Document::new();
    for record in ordered(records) {
        let mut payload = record.payload.clone();
        for key in RECORD_META_KEYS {
            payload.remove(key);
        }
        deep_merge(&mut profile, &payload);
    }
    profile
}

/// Token balance: sum of `value` over transaction records.
pub fn reduce_balance(records: &[Record]) -> i64 {
    ordered(records)
        .into_iter()
        .filter_map(|r| r.get_i64("value"))
        .fold(0i64, i64::saturating_add)
}

/// Follow graph membership.
pub fn reduce_follow_set(records: &[Record]) -> IndexSet<Address> {
    let mut set = IndexSet::new();
    for record in ordered(records) {
        let (Some(address), Some(status)) = (record.get_address("address"), record.get_bool("status")) else {
            trace!(created_at = record.created_at, "skipping malformed follow record");
            continue;
        };
        if status {
            set.insert(address);
        } else {
            set.shift_remove(&address);
        }
    }
    set
}

/// Reassemble a chunked post.
pub fn reduce_post(records: &[Record]) -> PostContent {
    let mut slots: BTreeMap<u64, String> = BTreeMap::new();
    let mut fields = Document::new();
    let mut created: Option<u64> = None;
    let mut latest: Option<u64> = None;

    for record in ordered(records) {
        let mut payload = record.payload.clone();
        let entry = payload.remove("entry").and_then(|v| v.as_u64());
        let text = payload.remove("text");
        // Only the head chunk describes the post itself.
        if entry != Some(0) {
            for key in RECORD_META_KEYS {
                payload.remove(key);
            }
        }
        if let (Some(entry), Some(Value::String(text))) = (entry, text) {
            slots.insert(entry, text);
        }
        deep_merge(&mut fields, &payload);
        created = Some(created.map_or(record.created_at, |c| c.min(record.created_at)));
        latest = Some(latest.map_or(record.created_at, |l| l.max(record.created_at)));
    }

    let entries = fields
        .remove("entries")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    let complete = entries > 0
        && slots.len() as u64 == entries
        && slots.keys().copied().eq(0..entries);
    let text = complete.then(|| slots.into_values().collect::<String>());

    PostContent {
        incomplete: text.is_none(),
        text,
        entries: usize::try_from(entries).unwrap_or(usize::MAX),
        created,
        latest,
        fields,
    }
}

/// Ordered, deduplicated `address` fields.
pub fn reduce_reference_set(records: &[Record]) -> IndexSet<Address> {
    reduce_reference_set_by(records, "address")
}

/// Ordered, deduplicated addresses read from `field`.
pub fn reduce_reference_set_by(records: &[Record], field: &str) -> IndexSet<Address> {
    records
        .iter()
        .filter(|r| !r.is_placeholder())
        .filter_map(|r| r.get_address(field))
        .collect()
}
