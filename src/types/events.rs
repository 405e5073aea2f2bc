//! Normalized protocol notifications

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone)]
pub enum ProtocolNotification {
    RoutineActivity { account: Address, kind: ActivityKind },
    PendingLiquidationAttempt { account: Address },
    ConfirmedLiquidation(LiquidationDetails),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityKind {
    Supply,
    Withdraw,
    Borrow,
    Repay,
}

#[derive(Debug, Clone)]
pub struct LiquidationDetails {
    pub account: Address,
    pub collateral_asset: Address,
    pub debt_asset: Address,
    pub debt_to_cover: U256,
    pub liquidated_collateral: U256,
    pub liquidator: Address,
    pub receive_atoken: bool,
    pub tx_hash: Option<B256>,
}

impl LiquidationDetails {
    pub fn to_record(&self) -> LiquidationRecord {
        LiquidationRecord {
            timestamp: Utc::now(),
            account: self.account.to_string(),
            collateral_asset: self.collateral_asset.to_string(),
            debt_asset: self.debt_asset.to_string(),
            debt_to_cover: self.debt_to_cover.to_string(),
            liquidated_collateral: self.liquidated_collateral.to_string(),
            liquidator: self.liquidator.to_string(),
            receive_atoken: self.receive_atoken,
            tx_hash: self.tx_hash.map(|h| h.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LiquidationRecord {
    pub timestamp: DateTime<Utc>,
    pub account: String,
    pub collateral_asset: String,
    pub debt_asset: String,
    pub debt_to_cover: String,
    pub liquidated_collateral: String,
    pub liquidator: String,
    pub receive_atoken: bool,
    pub tx_hash: Option<String>,
}
