//! Event signatures and call selectors for the Aave v3 pool

use alloy::primitives::{B256, keccak256};
use lazy_static::lazy_static;

lazy_static! {
    pub static ref SUPPLY_TOPIC: B256 =
        keccak256("Supply(address,address,address,uint256,uint16)");
    pub static ref WITHDRAW_TOPIC: B256 =
        keccak256("Withdraw(address,address,address,uint256)");
    pub static ref BORROW_TOPIC: B256 =
        keccak256("Borrow(address,address,address,uint256,uint8,uint256,uint16)");
    pub static ref REPAY_TOPIC: B256 =
        keccak256("Repay(address,address,address,uint256,bool)");
    pub static ref LIQUIDATION_CALL_TOPIC: B256 =
        keccak256("LiquidationCall(address,address,address,uint256,uint256,address,bool)");

    /// Topic0 set for the confirmed-log subscription filter.
    pub static ref TRACKED_EVENT_TOPICS: Vec<B256> = vec![
        *SUPPLY_TOPIC,
        *WITHDRAW_TOPIC,
        *BORROW_TOPIC,
        *REPAY_TOPIC,
        *LIQUIDATION_CALL_TOPIC,
    ];

    /// `liquidationCall(address,address,address,uint256,bool)`
    pub static ref LIQUIDATION_CALL_SELECTOR: [u8; 4] = {
        let hash = keccak256("liquidationCall(address,address,address,uint256,bool)");
        [hash[0], hash[1], hash[2], hash[3]]
    };
}
