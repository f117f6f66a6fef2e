use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};

pub type Timestamp = DateTime<FixedOffset>;

/// Roster identity, keyed by normalized email.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn from_email(email: &str) -> Self {
        Identity(normalize_email(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Round {
    R1,
    R2,
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Round::R1 => f.write_str("R1"),
            Round::R2 => f.write_str("R2"),
        }
    }
}

/// Logged actor text exactly as it appears in the action log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorText {
    pub email: String,
    pub name: Option<String>,
}

impl ActorText {
    #[cfg(test)]
    pub fn email(email: &str) -> Self {
        ActorText {
            email: email.to_string(),
            name: None,
        }
    }
}

impl fmt::Display for ActorText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.email.trim().is_empty()) {
            (Some(name), true) => write!(f, "{name}"),
            (Some(name), false) => write!(f, "{name} <{}>", self.email.trim()),
            (None, _) => write!(f, "{}", self.email.trim()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ReviewAssigned { round: Round },
    ReviewRemoved { round: Round },
    ReviewSubmitted,
    CommentPosted,
    ShepherdAssigned,
    DecisionNotified,
    /// Known log noise that carries nothing the report measures.
    Ignored,
    Unrecognized(String),
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::ReviewAssigned { .. } => "review assignment",
            Action::ReviewRemoved { .. } => "review removal",
            Action::ReviewSubmitted => "review submission",
            Action::CommentPosted => "comment",
            Action::ShepherdAssigned => "shepherd assignment",
            Action::DecisionNotified => "decision",
            Action::Ignored => "ignored action",
            Action::Unrecognized(_) => "unrecognized action",
        }
    }

    pub fn needs_paper(&self) -> bool {
        matches!(
            self,
            Action::ReviewAssigned { .. }
                | Action::ReviewRemoved { .. }
                | Action::ReviewSubmitted
                | Action::ShepherdAssigned
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// 1-based line in the source log, for diagnostics.
    pub line: u64,
    pub timestamp: Timestamp,
    pub actor: ActorText,
    pub affected: ActorText,
    pub paper: Option<u32>,
    pub action: Action,
}

impl LogEvent {
    /// The person whose record the event changes. Assignment-style actions
    /// name the affected user; everything else is attributed to the actor.
    pub fn subject(&self) -> &ActorText {
        match self.action {
            Action::ReviewAssigned { .. }
            | Action::ReviewRemoved { .. }
            | Action::ShepherdAssigned => &self.affected,
            _ => &self.actor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewerRecord {
    pub full_name: String,
    pub email: String,
    pub num_assigned_reviews: u32,
    pub num_completed_reviews: u32,
    #[serde(serialize_with = "yes_no")]
    pub all_on_time: bool,
    pub sum_days_late: u64,
    pub num_comments: u32,
    pub num_comments_r1_disc: u32,
    pub num_comments_r2_disc: u32,
    pub num_comments_rebuttal: u32,
    pub num_shepherd: u32,
    pub num_comments_after_notification: u32,
}

impl ReviewerRecord {
    pub fn new(full_name: &str, email: &str) -> Self {
        ReviewerRecord {
            full_name: full_name.to_string(),
            email: email.to_string(),
            num_assigned_reviews: 0,
            num_completed_reviews: 0,
            all_on_time: true,
            sum_days_late: 0,
            num_comments: 0,
            num_comments_r1_disc: 0,
            num_comments_r2_disc: 0,
            num_comments_rebuttal: 0,
            num_shepherd: 0,
            num_comments_after_notification: 0,
        }
    }

    /// Folds another partial record for the same identity into this one.
    pub fn merge(&mut self, other: &ReviewerRecord) {
        if self.full_name.trim().is_empty() {
            self.full_name = other.full_name.clone();
        }
        if self.email.trim().is_empty() {
            self.email = other.email.clone();
        }
        self.num_assigned_reviews += other.num_assigned_reviews;
        self.num_completed_reviews += other.num_completed_reviews;
        self.all_on_time &= other.all_on_time;
        self.sum_days_late += other.sum_days_late;
        self.num_comments += other.num_comments;
        self.num_comments_r1_disc += other.num_comments_r1_disc;
        self.num_comments_r2_disc += other.num_comments_r2_disc;
        self.num_comments_rebuttal += other.num_comments_rebuttal;
        self.num_shepherd += other.num_shepherd;
        self.num_comments_after_notification += other.num_comments_after_notification;
    }

    pub fn record_late(&mut self, days_late: u64) {
        if days_late > 0 {
            self.all_on_time = false;
            self.sum_days_late += days_late;
        }
    }
}

fn yes_no<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "Y" } else { "N" })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(assigned: u32, completed: u32, late: u64) -> ReviewerRecord {
        let mut record = ReviewerRecord::new("Avery Lee", "avery@example.com");
        record.num_assigned_reviews = assigned;
        record.num_completed_reviews = completed;
        record.record_late(late);
        record.num_comments = 4;
        record.num_shepherd = 1;
        record
    }

    #[test]
    fn identity_normalizes_email() {
        assert_eq!(
            Identity::from_email("  Avery@Example.COM "),
            Identity::from_email("avery@example.com")
        );
    }

    #[test]
    fn name_normalization_collapses_whitespace() {
        assert_eq!(normalize_name(" Avery   LEE "), "avery lee");
    }

    #[test]
    fn merge_sums_counters_and_ands_on_time() {
        let mut total = record(3, 3, 0);
        total.merge(&record(2, 1, 2));
        assert_eq!(total.num_assigned_reviews, 5);
        assert_eq!(total.num_completed_reviews, 4);
        assert_eq!(total.sum_days_late, 2);
        assert!(!total.all_on_time);
        assert_eq!(total.num_comments, 8);
        assert_eq!(total.num_shepherd, 2);
    }

    #[test]
    fn on_time_cycles_stay_on_time() {
        let mut total = record(1, 1, 0);
        total.merge(&record(2, 2, 0));
        assert!(total.all_on_time);
        assert_eq!(total.sum_days_late, 0);
    }

    #[test]
    fn zero_lateness_does_not_flip_on_time() {
        let mut record = ReviewerRecord::new("Jules Moreno", "jules@example.com");
        record.record_late(0);
        assert!(record.all_on_time);
    }

    #[test]
    fn assignment_events_target_affected_user() {
        let event = LogEvent {
            line: 2,
            timestamp: DateTime::parse_from_rfc3339("2024-07-01T10:00:00-04:00").unwrap(),
            actor: ActorText::email("chair@example.com"),
            affected: ActorText::email("avery@example.com"),
            paper: Some(12),
            action: Action::ReviewAssigned { round: Round::R1 },
        };
        assert_eq!(event.subject().email, "avery@example.com");
    }
}
