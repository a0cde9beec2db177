//! 费用报价端点
//!
//! 不挂请求缓存中间件；区块号和 gas 价格通过 memoized 查询复用，
//! 与原始路由的接线方式一致

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use causeway_cache::{KeyBuilder, memoized};
use causeway_errors::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// 链上读数变化快，短 TTL
const CHAIN_DATA_TTL_SECS: u64 = 10;

/// 中继一笔转账估计消耗的 gas
const FILL_GAS_UNITS: u128 = 120_000;

/// 服务费率：大额走优惠档。费用用整数除法算（0.1% = /1000，
/// 0.05% = /2000），wei 级金额上不经过浮点
const SERVICE_FEE_PCT: f64 = 0.001;
const SERVICE_FEE_DIVISOR: u128 = 1_000;
const SERVICE_FEE_PCT_LARGE: f64 = 0.0005;
const SERVICE_FEE_DIVISOR_LARGE: u128 = 2_000;
const LARGE_AMOUNT_WEI: u128 = 100_000_000_000_000_000_000; // 100 ETH

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeesQuery {
    /// wei 计的存入数量（十进制字符串）
    pub amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeesResponse {
    pub relayer_gas_fee: String,
    pub service_fee_pct: f64,
    pub total_fee: String,
    pub quote_block: u64,
}

/// GET /api/suggested-fees
pub async fn suggested_fees(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeesQuery>,
) -> ApiResult<Json<FeesResponse>> {
    let amount: u128 = query.amount.parse().map_err(|_| {
        ApiError::from(AppError::validation(format!(
            "Invalid amount: {}",
            query.amount
        )))
    })?;

    let chain = state.rpc.chain_id.to_string();
    let block_key = KeyBuilder::new("latestBlock")
        .key(&BTreeMap::from([("chain_id", chain.as_str())]))?;
    let quote_block = memoized(
        state.cache.as_ref(),
        &block_key,
        Some(CHAIN_DATA_TTL_SECS),
        || state.rpc.latest_block_number(),
    )
    .await?;

    let gas_key = KeyBuilder::new("gasPrice")
        .key(&BTreeMap::from([("chain_id", chain.as_str())]))?;
    let gas_price = memoized(
        state.cache.as_ref(),
        &gas_key,
        Some(CHAIN_DATA_TTL_SECS),
        || state.rpc.gas_price(),
    )
    .await?;

    let relayer_gas_fee = gas_price.saturating_mul(FILL_GAS_UNITS);
    let (service_fee_pct, service_fee) = service_fee(amount);
    let total_fee = relayer_gas_fee.saturating_add(service_fee);

    Ok(Json(FeesResponse {
        relayer_gas_fee: relayer_gas_fee.to_string(),
        service_fee_pct,
        total_fee: total_fee.to_string(),
        quote_block,
    }))
}

/// 按金额档位计算服务费（展示用费率，整数 wei 费用）
fn service_fee(amount: u128) -> (f64, u128) {
    if amount >= LARGE_AMOUNT_WEI {
        (SERVICE_FEE_PCT_LARGE, amount / SERVICE_FEE_DIVISOR_LARGE)
    } else {
        (SERVICE_FEE_PCT, amount / SERVICE_FEE_DIVISOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_fee_tiers() {
        let (pct, fee) = service_fee(1_000_000);
        assert_eq!(pct, SERVICE_FEE_PCT);
        assert_eq!(fee, 1_000);

        let (pct, fee) = service_fee(LARGE_AMOUNT_WEI);
        assert_eq!(pct, SERVICE_FEE_PCT_LARGE);
        assert_eq!(fee, LARGE_AMOUNT_WEI / 2_000);
    }

    #[test]
    fn test_service_fee_exact_above_f64_precision() {
        // 超出 f64 53 位精度的金额也要精确到 wei
        let amount = (1u128 << 90) + 2_000;
        let (_, fee) = service_fee(amount);
        assert_eq!(fee, amount / 2_000);
        assert_ne!(fee, (amount as f64 * 0.0005) as u128);
    }
}
