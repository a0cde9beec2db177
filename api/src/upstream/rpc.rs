//! 极简 JSON-RPC 2.0 客户端
//!
//! 只覆盖余额与费用报价所需的方法

use causeway_common::parse_hex_quantity;
use causeway_config::RpcConfig;
use causeway_errors::{AppError, AppResult};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// balanceOf(address) 的函数选择器
const BALANCE_OF_SELECTOR: &str = "0x70a08231";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    pub chain_id: u64,
}

impl RpcClient {
    pub fn new(config: &RpcConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build RPC client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.expose_secret().to_string(),
            chain_id: config.chain_id,
        })
    }

    async fn call(&self, method: &str, params: Value) -> AppResult<Value> {
        debug!(method, "JSON-RPC call");
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("RPC request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::upstream(format!(
                "RPC node returned HTTP {}",
                response.status()
            )));
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Invalid RPC response: {}", e)))?;

        if let Some(err) = rpc.error {
            return Err(AppError::upstream(format!(
                "RPC error {}: {}",
                err.code, err.message
            )));
        }
        rpc.result
            .ok_or_else(|| AppError::upstream("RPC response missing result".to_string()))
    }

    async fn call_quantity(&self, method: &str, params: Value) -> AppResult<u128> {
        let result = self.call(method, params).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| AppError::upstream("RPC result is not a string".to_string()))?;
        parse_hex_quantity(hex)
            .ok_or_else(|| AppError::upstream(format!("Unparseable RPC quantity: {}", hex)))
    }

    /// 原生代币余额
    pub async fn get_balance(&self, account: &str) -> AppResult<u128> {
        self.call_quantity("eth_getBalance", json!([account, "latest"]))
            .await
    }

    /// ERC-20 余额（eth_call balanceOf）
    pub async fn erc20_balance(&self, token: &str, account: &str) -> AppResult<u128> {
        let data = balance_of_calldata(account)?;
        self.call_quantity("eth_call", json!([{ "to": token, "data": data }, "latest"]))
            .await
    }

    /// 最新区块号
    pub async fn latest_block_number(&self) -> AppResult<u64> {
        Ok(self
            .call_quantity("eth_blockNumber", json!([]))
            .await? as u64)
    }

    /// 当前 gas 价格（wei）
    pub async fn gas_price(&self) -> AppResult<u128> {
        self.call_quantity("eth_gasPrice", json!([])).await
    }
}

/// 编码 balanceOf(address) 的 calldata：选择器 + 左填充 32 字节的地址
fn balance_of_calldata(account: &str) -> AppResult<String> {
    let stripped = account
        .strip_prefix("0x")
        .ok_or_else(|| AppError::validation(format!("Invalid account address: {}", account)))?;
    if stripped.len() != 40 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::validation(format!(
            "Invalid account address: {}",
            account
        )));
    }
    Ok(format!(
        "{}{:0>64}",
        BALANCE_OF_SELECTOR,
        stripped.to_lowercase()
    ))
}
