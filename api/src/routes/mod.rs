//! API 路由

pub mod balance;
pub mod fees;
pub mod limits;
pub mod prices;

use crate::state::AppState;
use crate::swr::{RequestCache, check_cache, store_cache};
use axum::{Json, Router, middleware, routing::get};
use causeway_common::{BridgeRoute, MAINNET, NATIVE_TOKEN};
use serde::Serialize;
use std::sync::Arc;

/// 组装全部路由
///
/// 价格和余额端点共用 check(150)/store(150+150) 的请求缓存；
/// limits 用 check(60)/store(240+60)；suggested-fees 不挂请求缓存，
/// 只依赖 handler 内部的 memoized 查询
pub fn router(state: Arc<AppState>) -> Router {
    let quick = RequestCache::new(state.cache.clone(), 150, 150);
    let slow = RequestCache::new(state.cache.clone(), 240, 60);

    let cached_quick = Router::new()
        .route("/api/coingecko", get(prices::token_price))
        .route("/api/account-balance", get(balance::account_balance))
        .layer(middleware::from_fn_with_state(quick.clone(), store_cache))
        .layer(middleware::from_fn_with_state(quick, check_cache));

    let cached_slow = Router::new()
        .route("/api/limits", get(limits::deposit_limits))
        .layer(middleware::from_fn_with_state(slow.clone(), store_cache))
        .layer(middleware::from_fn_with_state(slow, check_cache));

    let uncached = Router::new()
        .route("/api/suggested-fees", get(fees::suggested_fees))
        .route("/api/available-routes", get(available_routes))
        .route("/health", get(health_check));

    cached_quick
        .merge(cached_slow)
        .merge(uncached)
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// 受支持的跨链路由（静态清单，不走缓存）
async fn available_routes() -> Json<Vec<BridgeRoute>> {
    Json(vec![
        BridgeRoute {
            origin_chain_id: MAINNET,
            destination_chain_id: 10,
            token_symbol: "ETH".to_string(),
            token_address: NATIVE_TOKEN.to_string(),
        },
        BridgeRoute {
            origin_chain_id: MAINNET,
            destination_chain_id: 10,
            token_symbol: "USDC".to_string(),
            token_address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(),
        },
        BridgeRoute {
            origin_chain_id: MAINNET,
            destination_chain_id: 42161,
            token_symbol: "USDC".to_string(),
            token_address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(),
        },
    ])
}
