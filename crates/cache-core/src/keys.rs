//! 缓存键派生
//!
//! 同一参数集（相同键值对，任意枚举顺序）必须得到同一个键串，
//! 否则调用方每次重建参数都会击穿缓存

use causeway_errors::{AppError, AppResult};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// 带命名空间前缀的确定性键构造器
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// 从任意可序列化参数派生 "{prefix}:{hash}" 形式的键
    ///
    /// 规范化依赖 serde_json::Value 的对象键按 BTreeMap 排序，
    /// 与参数的构造顺序无关。参数无法表示为 JSON（非字符串键等）属于
    /// 编程错误，立即作为 KeyDerivation 错误浮出，不被吞掉
    pub fn key<P: Serialize>(&self, params: &P) -> AppResult<String> {
        let canonical = serde_json::to_value(params)
            .map_err(|e| AppError::key_derivation(format!("Unhashable key params: {}", e)))?
            .to_string();

        let digest = Sha256::digest(canonical.as_bytes());
        Ok(format!("{}:{}", self.prefix, hex::encode(digest)))
    }
}
