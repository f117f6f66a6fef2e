use std::collections::BTreeMap;

use tracing::debug;

use crate::config::CycleConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::models::{Action, Identity, LogEvent, ReviewerRecord};
use crate::roster::{Member, Resolution, Roster};
use crate::tracker::AssignmentTracker;
use crate::window::{classify, membership, Period};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReductionStats {
    pub events: usize,
    pub ignored: usize,
    pub unrecognized: usize,
    pub unresolved: usize,
    pub decisions: usize,
    pub comments_by_period: BTreeMap<Period, usize>,
}

/// One cycle's contribution, ready to merge into the run-wide store.
#[derive(Debug)]
pub struct CycleTally {
    pub cycle: u32,
    pub records: BTreeMap<Identity, ReviewerRecord>,
    pub stats: ReductionStats,
}

/// Single-pass reducer over one cycle's action log.
///
/// The log is newest-first, but nothing here relies on that: counters are
/// plain sums and review state lives in the [`AssignmentTracker`], whose
/// merges are order-independent.
pub struct LogReducer<'a> {
    cycle: &'a CycleConfig,
    roster: &'a Roster,
    tracker: AssignmentTracker,
    records: BTreeMap<Identity, ReviewerRecord>,
    stats: ReductionStats,
}

impl<'a> LogReducer<'a> {
    pub fn new(cycle: &'a CycleConfig, roster: &'a Roster) -> Self {
        LogReducer {
            cycle,
            roster,
            tracker: AssignmentTracker::new(cycle.cycle_number),
            records: BTreeMap::new(),
            stats: ReductionStats::default(),
        }
    }

    fn record(&mut self, member: &Member) -> &mut ReviewerRecord {
        self.records
            .entry(member.identity.clone())
            .or_insert_with(|| ReviewerRecord::new(&member.full_name, &member.email))
    }

    fn resolve(&mut self, event: &LogEvent, diagnostics: &mut Diagnostics) -> Option<&'a Member> {
        let roster = self.roster;
        match roster.resolve(event.subject()) {
            Resolution::Resolved(member) => Some(member),
            Resolution::Unresolved(raw) => {
                self.stats.unresolved += 1;
                diagnostics.push(Warning::UnresolvedActor {
                    cycle: self.cycle.cycle_number,
                    line: event.line,
                    actor: raw,
                    action: event.action.label(),
                    paper: event.paper,
                });
                None
            }
        }
    }

    pub fn apply(&mut self, event: &LogEvent, diagnostics: &mut Diagnostics) {
        self.stats.events += 1;
        let cycle = self.cycle;
        let timestamps = &cycle.timestamps;

        match &event.action {
            Action::Ignored => {
                self.stats.ignored += 1;
                debug!(line = event.line, "ignored action");
            }
            Action::Unrecognized(text) => {
                self.stats.unrecognized += 1;
                diagnostics.push(Warning::UnrecognizedAction {
                    cycle: cycle.cycle_number,
                    line: event.line,
                    action: text.clone(),
                });
            }
            Action::DecisionNotified => {
                self.stats.decisions += 1;
                debug!(line = event.line, paper = ?event.paper, "decision recorded");
            }
            Action::ReviewAssigned { round } | Action::ReviewRemoved { round } => {
                let (Some(member), Some(paper)) = (self.resolve(event, diagnostics), event.paper)
                else {
                    return;
                };
                let deadline = timestamps.deadline(*round);
                self.record(member);
                if matches!(event.action, Action::ReviewAssigned { .. }) {
                    self.tracker.record_assignment(
                        paper,
                        &member.identity,
                        *round,
                        deadline,
                        event.timestamp,
                    );
                } else {
                    self.tracker.record_removal(
                        paper,
                        &member.identity,
                        *round,
                        deadline,
                        event.timestamp,
                    );
                }
            }
            Action::ReviewSubmitted => {
                let (Some(member), Some(paper)) = (self.resolve(event, diagnostics), event.paper)
                else {
                    return;
                };
                self.record(member);
                self.tracker
                    .record_completion(paper, &member.identity, None, event.timestamp);
            }
            Action::CommentPosted => {
                let Some(member) = self.resolve(event, diagnostics) else {
                    return;
                };
                let at = event.timestamp;
                let windows = membership(at, timestamps);
                *self
                    .stats
                    .comments_by_period
                    .entry(classify(at, timestamps))
                    .or_insert(0) += 1;

                let record = self.record(member);
                record.num_comments += 1;
                if windows.r1_discussion {
                    record.num_comments_r1_disc += 1;
                }
                if windows.r2_discussion {
                    record.num_comments_r2_disc += 1;
                }
                if windows.rebuttal {
                    record.num_comments_rebuttal += 1;
                }
                if windows.post_decision {
                    record.num_comments_after_notification += 1;
                }
            }
            // A reassigned shepherd leaves both people credited for the paper.
            Action::ShepherdAssigned => {
                let Some(member) = self.resolve(event, diagnostics) else {
                    return;
                };
                self.record(member).num_shepherd += 1;
            }
        }
    }

    /// Settles review assignments and folds them into the per-reviewer records.
    pub fn finish(self, diagnostics: &mut Diagnostics) -> CycleTally {
        let LogReducer {
            cycle,
            tracker,
            mut records,
            stats,
            ..
        } = self;
        debug!(
            cycle = cycle.cycle_number,
            reviews = tracker.len(),
            "settling review assignments"
        );

        for (identity, totals) in tracker.finalize(diagnostics) {
            let record = records
                .entry(identity.clone())
                .or_insert_with(|| ReviewerRecord::new("", identity.as_str()));
            record.num_assigned_reviews += totals.assigned;
            record.num_completed_reviews += totals.completed;
            record.record_late(totals.days_late);
        }

        CycleTally {
            cycle: cycle.cycle_number,
            records,
            stats,
        }
    }
}

pub fn reduce_cycle(
    cycle: &CycleConfig,
    roster: &Roster,
    events: &[LogEvent],
    diagnostics: &mut Diagnostics,
) -> CycleTally {
    let mut reducer = LogReducer::new(cycle, roster);
    for event in events {
        reducer.apply(event, diagnostics);
    }
    reducer.finish(diagnostics)
}
