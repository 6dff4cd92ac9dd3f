use std::collections::{BTreeSet, HashMap};

use flowtrace_core::FlowRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointEntry {
    pub endpoint: String,
    pub count: usize,
    pub status_codes: BTreeSet<u16>,
}

/// Single-pass endpoint aggregation keyed by `"METHOD path"`. Holds one entry
/// per distinct endpoint; insertion order is retained so ranking ties stay
/// deterministic across runs.
#[derive(Debug, Default)]
pub struct EndpointAggregator {
    order: Vec<String>,
    counts: HashMap<String, usize>,
    status_codes: HashMap<String, BTreeSet<u16>>,
}

impl EndpointAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, record: &FlowRecord) {
        let key = record.request.endpoint();
        if !self.counts.contains_key(&key) {
            self.order.push(key.clone());
        }
        *self.counts.entry(key.clone()).or_insert(0) += 1;
        if let Some(response) = &record.response {
            self.status_codes
                .entry(key)
                .or_default()
                .insert(response.status_code);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries sorted by descending count; the sort is stable, so equal counts
    /// keep first-seen order.
    pub fn ranked(&self) -> Vec<EndpointEntry> {
        let mut entries: Vec<EndpointEntry> = self
            .order
            .iter()
            .map(|key| EndpointEntry {
                endpoint: key.clone(),
                count: self.counts[key],
                status_codes: self.status_codes.get(key).cloned().unwrap_or_default(),
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries
    }
}
