//! Observed liquidation storage

use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::info;
use crate::types::LiquidationRecord;

pub fn save_liquidation(record: &LiquidationRecord) -> Result<()> {
    let filename = format!("output/liquidations/liquidations_{}.jsonl",
        Utc::now().format("%Y-%m-%d"));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)?;

    writeln!(file, "{}", serde_json::to_string(record)?)?;

    info!(
        account = %record.account,
        liquidator = %record.liquidator,
        "Saved liquidation record"
    );

    Ok(())
}
