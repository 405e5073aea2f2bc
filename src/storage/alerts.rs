//! Alert audit trail storage

use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::info;
use crate::types::AlertRecord;

pub fn save_alert_record(record: &AlertRecord) -> Result<()> {
    let filename = format!("output/alerts/alerts_{}.jsonl",
        Utc::now().format("%Y-%m-%d"));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)?;

    writeln!(file, "{}", serde_json::to_string(record)?)?;

    info!(
        alert_id = %record.id,
        delivered = record.delivered,
        "Saved alert record"
    );

    Ok(())
}
