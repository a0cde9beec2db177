//! 第三方价格预言机客户端
//!
//! 上游有速率限制且响应偏慢，调用方应当通过 memoized 包装访问

use causeway_config::OracleConfig;
use causeway_errors::{AppError, AppResult};
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// 演示层 API key 的请求头
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

pub struct PriceOracle {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    platform: String,
}

impl PriceOracle {
    pub fn new(config: &OracleConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build oracle client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config
                .api_key
                .as_ref()
                .map(|k| k.expose_secret().to_string()),
            platform: config.platform.clone(),
        })
    }

    /// 按合约地址查询代币价格
    ///
    /// 预言机返回 { "<token>": { "<currency>": price } } 形状的负载
    pub async fn token_price(&self, token: &str, base_currency: &str) -> AppResult<f64> {
        let url = format!("{}/simple/token_price/{}", self.base_url, self.platform);
        debug!(token, base_currency, "Fetching token price from oracle");

        let mut request = self
            .client
            .get(&url)
            .query(&[
                ("contract_addresses", token),
                ("vs_currencies", base_currency),
            ])
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("Price oracle request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::upstream(format!(
                "Price oracle returned HTTP {}",
                response.status()
            )));
        }

        let prices: HashMap<String, HashMap<String, f64>> = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Invalid oracle response: {}", e)))?;

        prices
            .get(&token.to_lowercase())
            .and_then(|by_currency| by_currency.get(base_currency))
            .copied()
            .ok_or_else(|| {
                AppError::not_found(format!("No {} price for token {}", base_currency, token))
            })
    }
}
