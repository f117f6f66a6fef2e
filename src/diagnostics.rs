use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

use crate::models::{Identity, Round};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    UnresolvedActor {
        cycle: u32,
        line: u64,
        actor: String,
        action: &'static str,
        paper: Option<u32>,
    },
    UnrecognizedAction {
        cycle: u32,
        line: u64,
        action: String,
    },
    DuplicateAssignment {
        cycle: u32,
        paper: u32,
        reviewer: Identity,
        round: Round,
    },
    OrphanCompletion {
        cycle: u32,
        paper: u32,
        reviewer: Identity,
    },
    RoundMismatch {
        cycle: u32,
        paper: u32,
        reviewer: Identity,
        assigned: Round,
        submitted: Round,
    },
    SuspiciousConfig {
        cycle: u32,
        detail: String,
    },
    DuplicateRosterEntry {
        cycle: u32,
        email: String,
    },
}

impl Warning {
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::UnresolvedActor { .. } => "unresolved actor",
            Warning::UnrecognizedAction { .. } => "unrecognized action encountered",
            Warning::DuplicateAssignment { .. } => "duplicate assignment",
            Warning::OrphanCompletion { .. } => "completion without assignment",
            Warning::RoundMismatch { .. } => "round mismatch",
            Warning::SuspiciousConfig { .. } => "suspicious configuration",
            Warning::DuplicateRosterEntry { .. } => "duplicate roster entry",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnresolvedActor {
                cycle,
                line,
                actor,
                action,
                paper,
            } => {
                write!(f, "cycle {cycle} line {line}: could not find {actor} for {action}")?;
                if let Some(paper) = paper {
                    write!(f, " #{paper}")?;
                }
                Ok(())
            }
            Warning::UnrecognizedAction {
                cycle,
                line,
                action,
            } => write!(f, "cycle {cycle} line {line}: unknown action [{action}]"),
            Warning::DuplicateAssignment {
                cycle,
                paper,
                reviewer,
                round,
            } => write!(
                f,
                "cycle {cycle}: {reviewer} assigned {round} review of #{paper} more than once"
            ),
            Warning::OrphanCompletion {
                cycle,
                paper,
                reviewer,
            } => write!(
                f,
                "cycle {cycle}: {reviewer} submitted a review of #{paper} with no logged assignment"
            ),
            Warning::RoundMismatch {
                cycle,
                paper,
                reviewer,
                assigned,
                submitted,
            } => write!(
                f,
                "cycle {cycle}: {reviewer} was assigned #{paper} in {assigned} but submitted for {submitted}"
            ),
            Warning::SuspiciousConfig { cycle, detail } => write!(f, "cycle {cycle}: {detail}"),
            Warning::DuplicateRosterEntry { cycle, email } => {
                write!(f, "cycle {cycle}: roster lists {email} more than once")
            }
        }
    }
}

/// Run-scoped warning collector, flushed once after all cycles are reduced.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    #[cfg(test)]
    pub fn count(&self, kind: &str) -> usize {
        self.warnings.iter().filter(|w| w.kind() == kind).count()
    }

    /// Lines for the diagnostic channel in emit order. Unresolved commenters
    /// are mostly authors, so they are folded into one line per cycle; a
    /// count per kind closes the list.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut unresolved_comments: BTreeMap<u32, usize> = BTreeMap::new();
        let mut totals: BTreeMap<&'static str, usize> = BTreeMap::new();

        for warning in &self.warnings {
            *totals.entry(warning.kind()).or_insert(0) += 1;
            match warning {
                Warning::UnresolvedActor {
                    cycle,
                    action: "comment",
                    ..
                } => *unresolved_comments.entry(*cycle).or_insert(0) += 1,
                other => lines.push(other.to_string()),
            }
        }

        for (cycle, count) in unresolved_comments {
            lines.push(format!(
                "cycle {cycle}: {count} comments by users outside the roster were skipped"
            ));
        }

        for (kind, count) in totals {
            lines.push(format!("{count} warnings of kind: {kind}"));
        }
        lines
    }

    pub fn flush(self) {
        for line in self.summary() {
            warn!("{line}");
        }
    }
}
