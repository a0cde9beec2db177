//! 链与代币相关的通用类型

use serde::{Deserialize, Serialize};

/// 链 ID
pub type ChainId = u64;

/// 以太坊主网
pub const MAINNET: ChainId = 1;

/// 原生代币的哨兵地址（余额查询时走 eth_getBalance 而不是 balanceOf）
pub const NATIVE_TOKEN: &str = "0x0000000000000000000000000000000000000000";

/// 一条受支持的跨链路由
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeRoute {
    pub origin_chain_id: ChainId,
    pub destination_chain_id: ChainId,
    pub token_symbol: String,
    pub token_address: String,
}
