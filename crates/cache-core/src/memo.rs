//! 异步计算的记忆化封装
//!
//! 没有 single-flight 去重：同一键上并发的未命中会各自调用 fetch
//! 并各自写回，最后写入者胜出。这是有意保留的行为，不要在这里加锁

use causeway_common::unix_now;
use causeway_errors::{AppError, AppResult};
use causeway_ports::CachePort;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::warn;

/// 先查缓存，未命中（或已过期）时调用 fetch 并把 JSON 序列化的结果
/// 以给定 TTL 写回
///
/// 后端故障（get/set 返回 Err）原样传播，不会被当成未命中——
/// 宕机和未命中对调用方是不同的情况。缓存里反序列化失败的负载
/// 等价于未命中：缓存数据是可再生的一次性产物，重算并覆盖即可
pub async fn memoized<T, F, Fut>(
    cache: &dyn CachePort,
    key: &str,
    ttl: Option<u64>,
    fetch: F,
) -> AppResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    if let Some(entry) = cache.get(key).await? {
        if entry.is_fresh(unix_now()) {
            match serde_json::from_str::<T>(&entry.value) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(key, error = %e, "Cached payload failed to deserialize, recomputing");
                }
            }
        }
    }

    let fresh = fetch().await?;
    let payload = serde_json::to_string(&fresh)
        .map_err(|e| AppError::serialization(format!("Failed to serialize {}: {}", key, e)))?;
    cache.set(key, &payload, ttl).await?;

    Ok(fresh)
}
