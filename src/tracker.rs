use std::collections::BTreeMap;

use crate::diagnostics::{Diagnostics, Warning};
use crate::models::{Identity, Round, Timestamp};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Whole days past the deadline, rounded up. Zero when on time.
pub fn days_late(deadline: Timestamp, completed: Timestamp) -> u64 {
    let seconds = (completed - deadline).num_seconds();
    if seconds <= 0 {
        0
    } else {
        ((seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY) as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mark {
    at: Timestamp,
    removed: bool,
    round: Round,
    deadline: Timestamp,
}

impl Mark {
    /// Latest event wins; on a timestamp tie an assignment beats a removal
    /// and R2 beats R1, so the winner never depends on arrival order.
    fn supersedes(&self, other: &Mark) -> bool {
        (self.at, !self.removed, self.round) > (other.at, !other.removed, other.round)
    }
}

#[derive(Debug, Default)]
struct Slot {
    mark: Option<Mark>,
    assigned_events: BTreeMap<Round, u32>,
    /// Earliest submission and the round hint that came with it.
    submitted: Option<(Timestamp, Option<Round>)>,
}

impl Slot {
    fn observe(&mut self, mark: Mark) {
        match &self.mark {
            Some(current) if !mark.supersedes(current) => {}
            _ => self.mark = Some(mark),
        }
    }
}

/// What one reviewer's assignments in a cycle add up to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignmentTotals {
    pub assigned: u32,
    pub completed: u32,
    pub late: u32,
    pub days_late: u64,
}

/// Review assignments for one cycle, keyed by (paper, reviewer).
///
/// Events may arrive in any order. Every update is a commutative merge:
/// the latest assign/remove event decides whether the review stands and
/// the earliest submission decides when it was completed.
#[derive(Debug)]
pub struct AssignmentTracker {
    cycle: u32,
    slots: BTreeMap<(u32, Identity), Slot>,
}

impl AssignmentTracker {
    pub fn new(cycle: u32) -> Self {
        AssignmentTracker {
            cycle,
            slots: BTreeMap::new(),
        }
    }

    fn slot(&mut self, paper: u32, reviewer: &Identity) -> &mut Slot {
        self.slots.entry((paper, reviewer.clone())).or_default()
    }

    pub fn record_assignment(
        &mut self,
        paper: u32,
        reviewer: &Identity,
        round: Round,
        deadline: Timestamp,
        at: Timestamp,
    ) {
        let slot = self.slot(paper, reviewer);
        *slot.assigned_events.entry(round).or_insert(0) += 1;
        slot.observe(Mark {
            at,
            removed: false,
            round,
            deadline,
        });
    }

    pub fn record_removal(
        &mut self,
        paper: u32,
        reviewer: &Identity,
        round: Round,
        deadline: Timestamp,
        at: Timestamp,
    ) {
        self.slot(paper, reviewer).observe(Mark {
            at,
            removed: true,
            round,
            deadline,
        });
    }

    /// The log does not say which round a submission belongs to, so `round`
    /// is only a hint checked against the assignment at finalize time. The
    /// hint travels with the earliest submission; ties keep the lower hint.
    pub fn record_completion(
        &mut self,
        paper: u32,
        reviewer: &Identity,
        round: Option<Round>,
        at: Timestamp,
    ) {
        let slot = self.slot(paper, reviewer);
        match slot.submitted {
            Some(earliest) if earliest <= (at, round) => {}
            _ => slot.submitted = Some((at, round)),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Settles every slot. Pending reviews count as assigned only; a
    /// submission with no logged assignment counts as one implied assignment
    /// and one completion with no lateness.
    pub fn finalize(self, diagnostics: &mut Diagnostics) -> BTreeMap<Identity, AssignmentTotals> {
        let cycle = self.cycle;
        let mut totals: BTreeMap<Identity, AssignmentTotals> = BTreeMap::new();

        for ((paper, reviewer), slot) in self.slots {
            for (&round, &count) in &slot.assigned_events {
                if count > 1 {
                    diagnostics.push(Warning::DuplicateAssignment {
                        cycle,
                        paper,
                        reviewer: reviewer.clone(),
                        round,
                    });
                }
            }

            let entry = totals.entry(reviewer.clone()).or_default();
            match (slot.mark, slot.submitted) {
                (Some(mark), _) if mark.removed => {}
                (Some(_), None) => entry.assigned += 1,
                (Some(mark), Some((submitted, hint))) => {
                    entry.assigned += 1;
                    entry.completed += 1;
                    if let Some(hint) = hint.filter(|r| *r != mark.round) {
                        diagnostics.push(Warning::RoundMismatch {
                            cycle,
                            paper,
                            reviewer: reviewer.clone(),
                            assigned: mark.round,
                            submitted: hint,
                        });
                    }
                    // Reviews handed out after the deadline are never late.
                    if mark.at <= mark.deadline {
                        let late = days_late(mark.deadline, submitted);
                        if late > 0 {
                            entry.late += 1;
                            entry.days_late += late;
                        }
                    }
                }
                (None, Some(_)) => {
                    diagnostics.push(Warning::OrphanCompletion {
                        cycle,
                        paper,
                        reviewer: reviewer.clone(),
                    });
                    entry.assigned += 1;
                    entry.completed += 1;
                }
                (None, None) => {}
            }
        }

        totals
    }
}
