use std::collections::BTreeMap;

use crate::engine::CycleTally;
use crate::models::{Identity, ReviewerRecord};
use crate::roster::Roster;

/// Run-wide reviewer records, merged additively cycle by cycle.
#[derive(Debug, Default)]
pub struct AccumulatorStore {
    records: BTreeMap<Identity, ReviewerRecord>,
}

impl AccumulatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, identity: &Identity, partial: &ReviewerRecord) {
        self.records
            .entry(identity.clone())
            .or_insert_with(|| ReviewerRecord::new(&partial.full_name, &partial.email))
            .merge(partial);
    }

    pub fn merge_cycle(&mut self, tally: &CycleTally) {
        for (identity, partial) in &tally.records {
            self.merge(identity, partial);
        }
    }

    /// Adds zeroed records for roster members who never show up in a log.
    pub fn enroll(&mut self, roster: &Roster) {
        for member in roster.members() {
            self.records
                .entry(member.identity.clone())
                .or_insert_with(|| ReviewerRecord::new(&member.full_name, &member.email));
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn get(&self, identity: &Identity) -> Option<&ReviewerRecord> {
        self.records.get(identity)
    }

    /// Records in identity order, so repeated runs print identical reports.
    pub fn into_records(self) -> Vec<ReviewerRecord> {
        self.records.into_values().collect()
    }
}
