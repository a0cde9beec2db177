//! 账户余额端点
//!
//! handler 本身不做记忆化，缓存完全由路由层的请求缓存中间件承担

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use causeway_common::{NATIVE_TOKEN, is_address};
use causeway_errors::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceQuery {
    pub token: String,
    pub account: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub balance: String,
    pub account: String,
    pub token: String,
    pub chain_id: u64,
}

/// GET /api/account-balance
pub async fn account_balance(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BalanceQuery>,
) -> ApiResult<Json<BalanceResponse>> {
    for (name, value) in [("token", &query.token), ("account", &query.account)] {
        if !is_address(value) {
            return Err(ApiError::from(AppError::validation(format!(
                "Invalid {} address: {}",
                name, value
            ))));
        }
    }
    let token = query.token.to_lowercase();
    let account = query.account.to_lowercase();

    debug!(token = %token, account = %account, "Balance lookup");

    let balance = if token == NATIVE_TOKEN {
        state.rpc.get_balance(&account).await?
    } else {
        state.rpc.erc20_balance(&token, &account).await?
    };

    Ok(Json(BalanceResponse {
        balance: balance.to_string(),
        account,
        token,
        chain_id: state.rpc.chain_id,
    }))
}
