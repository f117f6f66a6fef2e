use std::io::Write;

use crate::models::ReviewerRecord;

/// Writes the committee report: a header row, then one row per reviewer.
pub fn write_report<W: Write>(out: W, records: &[ReviewerRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for record in records {
        writer.serialize(record)?;
    }
    if records.is_empty() {
        writer.write_record(HEADER)?;
    }
    writer.flush()?;
    Ok(())
}

const HEADER: [&str; 12] = [
    "full_name",
    "email",
    "num_assigned_reviews",
    "num_completed_reviews",
    "all_on_time",
    "sum_days_late",
    "num_comments",
    "num_comments_r1_disc",
    "num_comments_r2_disc",
    "num_comments_rebuttal",
    "num_shepherd",
    "num_comments_after_notification",
];
