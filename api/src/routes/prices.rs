//! 代币价格端点

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
use tracing::debug;

/// 预言机价格的缓存 TTL
const PRICE_TTL_SECS: u64 = 150;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    pub l1_token: String,
    pub base_currency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub token: String,
    pub base_currency: String,
    pub price: f64,
}

/// GET /api/coingecko
pub async fn token_price(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PriceQuery>,
) -> ApiResult<Json<PriceResponse>> {
    if !is_address(&query.l1_token) {
        return Err(ApiError::from(AppError::validation(format!(
            "Invalid token address: {}",
            query.l1_token
        ))));
    }
    let token = query.l1_token.to_lowercase();
    // 预言机文档没有保证大写符号可用，统一转小写
    let base_currency = query
        .base_currency
        .as_deref()
        .unwrap_or("eth")
        .to_lowercase();

    debug!(token = %token, base_currency = %base_currency, "Price lookup");

    let key = KeyBuilder::new("tokenPrice").key(&BTreeMap::from([
        ("token", token.as_str()),
        ("base_currency", base_currency.as_str()),
    ]))?;

    let price = memoized(state.cache.as_ref(), &key, Some(PRICE_TTL_SECS), || {
        state.oracle.token_price(&token, &base_currency)
    })
    .await?;

    Ok(Json(PriceResponse {
        token,
        base_currency,
        price,
    }))
}
