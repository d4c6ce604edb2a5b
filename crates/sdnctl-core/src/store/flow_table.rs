// ── Per-switch flow table cache ──
//
// Entries are kept in insertion order; reads sort by (table_id asc,
// priority desc) with a stable sort so insertion order breaks ties.

use std::collections::HashMap;

use crate::model::{Action, AggregateFlowStats, FlowEntry, FlowKey};

#[derive(Debug, Clone, Default)]
pub(crate) struct FlowTable {
    entries: Vec<FlowEntry>,
    aggregate: Option<AggregateFlowStats>,
}

impl FlowTable {
    fn position(&self, key: &FlowKey) -> Option<usize> {
        self.entries.iter().position(|e| e.has_key(key))
    }

    pub(crate) fn get(&self, key: &FlowKey) -> Option<&FlowEntry> {
        self.position(key).map(|pos| &self.entries[pos])
    }

    /// Same key replaces in place; a new key goes to the end.
    pub(crate) fn insert_or_replace(&mut self, entry: FlowEntry) {
        match self.position(&entry.key()) {
            Some(pos) => self.entries[pos] = entry,
            None => self.entries.push(entry),
        }
    }

    pub(crate) fn remove(&mut self, key: &FlowKey) -> Option<FlowEntry> {
        self.position(key).map(|pos| self.entries.remove(pos))
    }

    pub(crate) fn replace_actions(&mut self, key: &FlowKey, actions: Vec<Action>) -> bool {
        match self.position(key) {
            Some(pos) => {
                self.entries[pos].actions = actions;
                true
            }
            None => false,
        }
    }

    /// Drop entries that reference `meter_id`, as a switch does when the
    /// meter is deleted. Returns how many were dropped.
    pub(crate) fn remove_using_meter(&mut self, meter_id: u32) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !e.actions.contains(&Action::Meter { meter_id }));
        before - self.entries.len()
    }

    /// Full replace from a switch report. Surviving keys keep their
    /// position, new keys follow in reported order, and a key reported
    /// twice keeps the last copy. Returns whether the table changed.
    pub(crate) fn replace_all(&mut self, reported: Vec<FlowEntry>) -> bool {
        let mut index: HashMap<FlowKey, usize> = HashMap::with_capacity(reported.len());
        let mut incoming: Vec<Option<FlowEntry>> = Vec::with_capacity(reported.len());
        for entry in reported {
            let key = entry.key();
            match index.get(&key) {
                Some(&slot) => incoming[slot] = Some(entry),
                None => {
                    index.insert(key, incoming.len());
                    incoming.push(Some(entry));
                }
            }
        }

        let mut next = Vec::with_capacity(incoming.len());
        for existing in &self.entries {
            if let Some(&slot) = index.get(&existing.key()) {
                if let Some(entry) = incoming[slot].take() {
                    next.push(entry);
                }
            }
        }
        next.extend(incoming.into_iter().flatten());

        let changed = next != self.entries;
        self.entries = next;
        changed
    }

    pub(crate) fn set_aggregate(&mut self, aggregate: AggregateFlowStats) {
        self.aggregate = Some(aggregate);
    }

    pub(crate) fn aggregate(&self) -> Option<AggregateFlowStats> {
        self.aggregate
    }

    pub(crate) fn sorted(&self) -> Vec<FlowEntry> {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| {
            a.table_id
                .cmp(&b.table_id)
                .then_with(|| b.priority.cmp(&a.priority))
        });
        entries
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
