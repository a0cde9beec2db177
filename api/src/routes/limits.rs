//! 存入限额端点
//!
//! 限额以 USD 设定，按 memoized 的代币价格换算成代币数量

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use causeway_cache::{KeyBuilder, memoized};
use causeway_common::is_address;
use causeway_errors::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

const PRICE_TTL_SECS: u64 = 150;

/// USD 计价的限额档位
const MIN_DEPOSIT_USD: f64 = 10.0;
const MAX_DEPOSIT_INSTANT_USD: f64 = 250_000.0;
const MAX_DEPOSIT_USD: f64 = 1_000_000.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsQuery {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsResponse {
    pub token: String,
    /// 单位：代币数量
    pub min_deposit: f64,
    pub max_deposit_instant: f64,
    pub max_deposit: f64,
}

/// GET /api/limits
pub async fn deposit_limits(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitsQuery>,
) -> ApiResult<Json<LimitsResponse>> {
    if !is_address(&query.token) {
        return Err(ApiError::from(AppError::validation(format!(
            "Invalid token address: {}",
            query.token
        ))));
    }
    let token = query.token.to_lowercase();

    let key = KeyBuilder::new("tokenPrice").key(&BTreeMap::from([
        ("token", token.as_str()),
        ("base_currency", "usd"),
    ]))?;
    let usd_price = memoized(state.cache.as_ref(), &key, Some(PRICE_TTL_SECS), || {
        state.oracle.token_price(&token, "usd")
    })
    .await?;

    if usd_price <= 0.0 {
        return Err(ApiError::from(AppError::upstream(format!(
            "Oracle returned non-positive price for {}",
            token
        ))));
    }

    Ok(Json(LimitsResponse {
        token,
        min_deposit: MIN_DEPOSIT_USD / usd_price,
        max_deposit_instant: MAX_DEPOSIT_INSTANT_USD / usd_price,
        max_deposit: MAX_DEPOSIT_USD / usd_price,
    }))
}
