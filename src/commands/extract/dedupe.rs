use std::collections::BTreeSet;

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::model::{CandidateRecord, CanonicalRecord};

const UNKNOWN_MANUFACTURER: &str = "unknown";

pub(super) fn identity_key(product_name: &str) -> String {
    product_name
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

fn is_unknown(manufacturer: &str) -> bool {
    manufacturer.eq_ignore_ascii_case(UNKNOWN_MANUFACTURER)
}

struct MergedRecord {
    product_name: String,
    manufacturer: String,
    pages: BTreeSet<u32>,
}

/// One record per identity key, in first-occurrence order. A contributor's
/// manufacturer replaces the merged one only while the merged one is "unknown".
pub(super) fn dedupe_records<I>(candidates: I) -> Vec<CanonicalRecord>
where
    I: IntoIterator<Item = CandidateRecord>,
{
    let mut merged: IndexMap<String, MergedRecord> = IndexMap::new();

    for candidate in candidates {
        let key = identity_key(&candidate.product_name);
        match merged.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(MergedRecord {
                    product_name: candidate.product_name,
                    manufacturer: candidate.manufacturer,
                    pages: candidate.pages.into_iter().collect(),
                });
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.pages.extend(candidate.pages);
                if is_unknown(&existing.manufacturer) && !is_unknown(&candidate.manufacturer) {
                    existing.manufacturer = candidate.manufacturer;
                }
            }
        }
    }

    merged
        .into_iter()
        .map(|(identity_key, record)| CanonicalRecord {
            identity_key,
            product_name: record.product_name,
            manufacturer: record.manufacturer,
            pages: record.pages.into_iter().collect(),
        })
        .collect()
}
