//! 进程内有界缓存
//!
//! 尺寸触发的淘汰按插入顺序进行（最老的先走），与条目剩余 TTL 和
//! 访问频率无关——这不是 LRU。读取路径上另有惰性过期。

use async_trait::async_trait;
use causeway_common::unix_now;
use causeway_errors::AppResult;
use causeway_ports::{CacheEntry, CachePort, NO_EXPIRY};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// 触发淘汰的条目数上限
const KEY_THRESHOLD: usize = 10_000;

/// 淘汰后的目标条目数
const KEY_TARGET: usize = 1_000;

struct Inner {
    entries: HashMap<String, CacheEntry>,
    /// 插入顺序，队首最老。覆盖写保留键原来的位置。
    /// 不变量：队列与 entries 一一对应——删除条目（惰性过期）时
    /// 同步移除队列槽位，过期后重新写入的键排到队尾
    order: VecDeque<String>,
}

impl Inner {
    /// 删除条目并同步移除它的顺序槽位
    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}

/// 进程内缓存
///
/// axum 运行时是多线程的，map 由互斥锁串行化访问；
/// 每次操作都是一个短临界区，set 对读者而言是原子替换
pub struct LocalCache {
    inner: Mutex<Inner>,
    threshold: usize,
    target: usize,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::with_thresholds(KEY_THRESHOLD, KEY_TARGET)
    }

    /// 自定义淘汰阈值（测试用小容量）
    pub fn with_thresholds(threshold: usize, target: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            threshold,
            target,
        }
    }

    /// 当前条目数
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 淘汰到目标大小：从队首弹出最老的键并删除对应条目
    fn prune(inner: &mut Inner, target: usize) {
        let before = inner.entries.len();
        while inner.entries.len() > target {
            let Some(key) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&key);
        }
        debug_assert_eq!(inner.order.len(), inner.entries.len());
        debug!(
            evicted = before - inner.entries.len(),
            remaining = inner.entries.len(),
            "Local cache pruned"
        );
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CachePort for LocalCache {
    async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> AppResult<()> {
        let expiry = match ttl {
            Some(secs) => unix_now().saturating_add(secs as i64),
            None => NO_EXPIRY,
        };

        let mut inner = self.inner.lock();
        if !inner.entries.contains_key(key) {
            inner.order.push_back(key.to_string());
        }
        inner
            .entries
            .insert(key.to_string(), CacheEntry::new(value, expiry));

        if inner.entries.len() >= self.threshold {
            Self::prune(&mut inner, self.target);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<CacheEntry>> {
        let now = unix_now();
        let mut inner = self.inner.lock();
        match inner.entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Ok(Some(entry.clone())),
            Some(_) => {
                // 惰性过期：读到已过期条目时顺手删除（连同顺序槽位）
                inner.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}
