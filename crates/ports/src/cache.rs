//! Cache trait 定义

use async_trait::async_trait;
use causeway_errors::AppResult;
use serde::{Deserialize, Serialize};

/// "永不过期" 的绝对时间戳哨兵
pub const NO_EXPIRY: i64 = i64::MAX;

/// 缓存条目
///
/// value 是调用方序列化好的不透明负载（通常是 JSON），
/// expiry 是绝对 Unix 秒时间戳
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: String,
    pub expiry: i64,
}

impl CacheEntry {
    pub fn new(value: impl Into<String>, expiry: i64) -> Self {
        Self {
            value: value.into(),
            expiry,
        }
    }

    /// 距离过期剩余的秒数（负数表示已过期）
    pub fn remaining(&self, now: i64) -> i64 {
        self.expiry.saturating_sub(now)
    }

    /// 条目在给定时刻是否仍然有效
    pub fn is_fresh(&self, now: i64) -> bool {
        self.expiry >= now
    }
}

/// 缓存 trait
///
/// 所有后端共同满足的能力契约。get 对未知或已过期的键返回 Ok(None)，
/// Err 只用于后端本身的故障——未命中和后端宕机是不同的情况，
/// 调用方可能选择不同的回退策略。
#[async_trait]
pub trait CachePort: Send + Sync {
    /// 写入缓存值。ttl 为 None 表示不过期；覆盖已有键不报错
    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> AppResult<()>;

    /// 读取缓存值
    async fn get(&self, key: &str) -> AppResult<Option<CacheEntry>>;
}
