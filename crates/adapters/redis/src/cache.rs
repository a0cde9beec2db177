//! Redis Cache 实现

use async_trait::async_trait;
use causeway_common::unix_now;
use causeway_errors::{AppError, AppResult};
use causeway_ports::{CacheEntry, CachePort, NO_EXPIRY};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;
use tracing::warn;

/// 进程级共享实例，首次使用时惰性建立连接。
/// 并发的首批调用者等待同一个在途初始化，不会竞态创建多个连接
static SHARED: OnceCell<RedisCache> = OnceCell::const_new();

/// Redis Cache
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// 获取进程级共享实例（惰性单例，生命周期内不拆除）
    pub async fn shared(url: &str) -> AppResult<&'static RedisCache> {
        SHARED
            .get_or_try_init(|| async {
                let conn = crate::create_connection_manager(url).await?;
                Ok(RedisCache::new(conn))
            })
            .await
    }

    /// 就绪检查：对连接发一次 PING
    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();
        crate::check_connection(&mut conn).await
    }
}

/// 把 GET + TTL 的结果转换为缓存条目
///
/// TTL 的哨兵语义：-2 表示键不存在，-1 表示键存在但没有过期时间。
/// "没有过期时间" 绝不能被误读为 "已过期"，映射为 NO_EXPIRY
fn entry_from_parts(value: Option<String>, ttl: i64, now: i64) -> Option<CacheEntry> {
    let value = value?;
    match ttl {
        -2 => None,
        -1 => Some(CacheEntry::new(value, NO_EXPIRY)),
        t if t > 0 => Some(CacheEntry::new(value, now.saturating_add(t))),
        _ => None,
    }
}

#[async_trait]
impl CachePort for RedisCache {
    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let result: Result<(), redis::RedisError> = match ttl {
            Some(secs) => conn.set_ex(key, value, secs).await,
            None => conn.set(key, value).await,
        };
        result.map_err(|e| {
            warn!(key, error = %e, "Redis SET failed");
            AppError::cache_unavailable(format!("Redis SET failed: {}", e))
        })
    }

    async fn get(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        let mut conn = self.conn.clone();
        // 读值和剩余 TTL 一次往返取回，换算成绝对过期时间
        let (value, ttl): (Option<String>, i64) = redis::pipe()
            .get(key)
            .ttl(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(key, error = %e, "Redis GET failed");
                AppError::cache_unavailable(format!("Redis GET failed: {}", e))
            })?;

        Ok(entry_from_parts(value, ttl, unix_now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_absent() {
        assert_eq!(entry_from_parts(None, -2, 1_000), None);
        // GET 和 TTL 之间键被删除的窗口
        assert_eq!(entry_from_parts(Some("v".into()), -2, 1_000), None);
    }

    #[test]
    fn test_no_expiry_sentinel_is_not_expired() {
        let entry = entry_from_parts(Some("v".into()), -1, 1_000).expect("present");
        assert_eq!(entry.expiry, NO_EXPIRY);
        assert!(entry.is_fresh(1_000));
    }

    #[test]
    fn test_remaining_ttl_becomes_absolute_expiry() {
        let entry = entry_from_parts(Some("v".into()), 150, 1_000).expect("present");
        assert_eq!(entry.expiry, 1_150);
    }

    #[test]
    fn test_nonpositive_ttl_is_absent() {
        assert_eq!(entry_from_parts(Some("v".into()), 0, 1_000), None);
    }
}
