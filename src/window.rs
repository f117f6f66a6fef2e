use crate::config::CycleTimestamps;
use crate::models::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Period {
    PreR1,
    R1Discussion,
    Rebuttal,
    R2Discussion,
    PostDecision,
    Other,
}

/// Every window a timestamp falls in. Windows overlap: rebuttal sits inside
/// the round 2 discussion, and post-decision is counted on its own axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Membership {
    pub pre_r1: bool,
    pub r1_discussion: bool,
    pub rebuttal: bool,
    pub r2_discussion: bool,
    pub post_decision: bool,
}

fn within(at: Timestamp, start: Timestamp, end: Timestamp) -> bool {
    start <= at && at <= end
}

pub fn membership(at: Timestamp, timestamps: &CycleTimestamps) -> Membership {
    Membership {
        pre_r1: at < timestamps.round1_discussion_start,
        r1_discussion: within(
            at,
            timestamps.round1_discussion_start,
            timestamps.round1_discussion_end,
        ),
        rebuttal: within(
            at,
            timestamps.rebuttal_discussion_start,
            timestamps.rebuttal_discussion_end,
        ),
        r2_discussion: within(
            at,
            timestamps.round2_discussion_start,
            timestamps.round2_discussion_end,
        ),
        post_decision: at > timestamps.acceptance,
    }
}

/// The single most specific period for a timestamp. Post-decision wins over
/// any window, and rebuttal wins over the discussion it overlaps.
pub fn classify(at: Timestamp, timestamps: &CycleTimestamps) -> Period {
    let m = membership(at, timestamps);
    if m.post_decision {
        Period::PostDecision
    } else if m.rebuttal {
        Period::Rebuttal
    } else if m.r1_discussion {
        Period::R1Discussion
    } else if m.r2_discussion {
        Period::R2Discussion
    } else if m.pre_r1 {
        Period::PreR1
    } else {
        Period::Other
    }
}
