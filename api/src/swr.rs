//! 请求级 stale-while-revalidate 缓存中间件
//!
//! 成对使用：check_cache 在 handler 之前查缓存，store_cache 在 handler
//! 之后把响应写回。挂载顺序（外到内）：check_cache → store_cache → handler。
//!
//! 每个请求的状态机由剩余秒数 remaining 驱动：
//! - 未命中 / remaining < 0：正常走 handler，store_cache 负责写回
//! - 0 <= remaining < stale_while_revalidate：立即用缓存负载答复客户端，
//!   同时把内层栈（handler + store_cache）丢到后台任务里重算刷新，
//!   handler 自己的响应被丢弃（客户端已经收到过时值）
//! - remaining >= stale_while_revalidate：直接用缓存负载答复，不碰 handler

use crate::error::ApiError;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, Uri, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use causeway_cache::KeyBuilder;
use causeway_common::unix_now;
use causeway_errors::AppResult;
use causeway_ports::CachePort;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 缓存响应体的大小上限
const MAX_CACHED_BODY: usize = 2 * 1024 * 1024;

/// 请求缓存键的命名空间
const REQUEST_CACHE_PREFIX: &str = "requestCache";

/// 一条路由的请求缓存配置，克隆给中间件对的两端
#[derive(Clone)]
pub struct RequestCache {
    cache: Arc<dyn CachePort>,
    max_age: u64,
    stale_while_revalidate: u64,
}

impl RequestCache {
    pub fn new(cache: Arc<dyn CachePort>, max_age: u64, stale_while_revalidate: u64) -> Self {
        Self {
            cache,
            max_age,
            stale_while_revalidate,
        }
    }

    /// 由路径和查询参数派生请求的缓存键
    pub fn request_key(uri: &Uri) -> AppResult<String> {
        let mut params = BTreeMap::new();
        params.insert("path".to_string(), uri.path().to_string());
        if let Some(query) = uri.query() {
            for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
                params.insert(k.into_owned(), v.into_owned());
            }
        }
        KeyBuilder::new(REQUEST_CACHE_PREFIX).key(&params)
    }
}

fn cached_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

/// 前置中间件：查缓存，按新鲜度决定短路、答复并后台刷新、或放行
pub async fn check_cache(
    State(rc): State<RequestCache>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let key = match RequestCache::request_key(request.uri()) {
        Ok(key) => key,
        Err(e) => return ApiError::from(e).into_response(),
    };

    // 后端故障按错误返回，不伪装成未命中
    let cached = match rc.cache.get(&key).await {
        Ok(cached) => cached,
        Err(e) => {
            warn!(key = %key, error = %e, "Request cache lookup failed");
            return ApiError::from(e).into_response();
        }
    };

    let Some(entry) = cached else {
        return next.run(request).await;
    };

    let remaining = entry.remaining(unix_now());
    if remaining < 0 {
        return next.run(request).await;
    }

    if (remaining as u64) < rc.stale_while_revalidate {
        // 过时窗口内：客户端立即拿到缓存值，刷新在后台完成
        debug!(key = %key, remaining, "Serving stale response, revalidating in background");
        tokio::spawn(async move {
            let _ = next.run(request).await;
        });
        return cached_response(entry.value);
    }

    debug!(key = %key, remaining, "Serving fresh cached response");
    cached_response(entry.value)
}

/// 已声明长度且不超过缓存上限的响应才值得缓冲
fn buffered_length(response: &Response) -> Option<usize> {
    let len: usize = response
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()?;
    (len <= MAX_CACHED_BODY).then_some(len)
}

/// 后置中间件：handler 真正执行过后，把 200 响应体写回缓存
///
/// TTL 固定为 max_age + stale_while_revalidate。写入失败只记日志，
/// 响应照常返回——绝不因为缓存写失败产生第二个响应或失败响应。
/// 超过缓冲上限或长度未知的响应原样透传，不进缓存
pub async fn store_cache(
    State(rc): State<RequestCache>,
    request: Request,
    next: Next,
) -> Response {
    let cacheable = request.method() == Method::GET;
    let key = RequestCache::request_key(request.uri());

    let response = next.run(request).await;
    if !cacheable || response.status() != StatusCode::OK {
        return response;
    }
    let key = match key {
        Ok(key) => key,
        Err(_) => return response,
    };
    if buffered_length(&response).is_none() {
        debug!(key = %key, "Response too large or of unknown length, passing through uncached");
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to buffer response body for caching");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Ok(text) = std::str::from_utf8(&bytes) {
        let ttl = rc.max_age + rc.stale_while_revalidate;
        if let Err(e) = rc.cache.set(&key, text, Some(ttl)).await {
            warn!(key = %key, error = %e, "Request cache write failed");
        }
    }

    Response::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::Router;
    use axum::middleware;
    use axum::routing::{get, post};
    use causeway_ports::CacheEntry;
    use http_body_util::BodyExt;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    /// 可注入任意 expiry 的测试后端，并记录每次写入
    struct FixedBackend {
        entry: Mutex<Option<CacheEntry>>,
        sets: Mutex<Vec<(String, String, Option<u64>)>>,
    }

    impl FixedBackend {
        fn new(entry: Option<CacheEntry>) -> Self {
            Self {
                entry: Mutex::new(entry),
                sets: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CachePort for FixedBackend {
        async fn set(&self, key: &str, value: &str, ttl: Option<u64>) -> AppResult<()> {
            self.sets
                .lock()
                .push((key.to_string(), value.to_string(), ttl));
            let expiry = ttl.map_or(causeway_ports::NO_EXPIRY, |t| unix_now() + t as i64);
            *self.entry.lock() = Some(CacheEntry::new(value, expiry));
            Ok(())
        }

        async fn get(&self, _key: &str) -> AppResult<Option<CacheEntry>> {
            Ok(self.entry.lock().clone())
        }
    }

    fn swr_router(cache: Arc<dyn CachePort>, counter: Arc<AtomicUsize>) -> Router {
        let rc = RequestCache::new(cache, 150, 150);
        Router::new()
            .route(
                "/api/quote",
                get(move || {
                    let counter = counter.clone();
                    async move {
                        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        (
                            StatusCode::OK,
                            [(header::CONTENT_TYPE, "application/json")],
                            format!(r#"{{"quote":{n}}}"#),
                        )
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(rc.clone(), store_cache))
            .layer(middleware::from_fn_with_state(rc, check_cache))
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn quote_request() -> Request {
        Request::builder()
            .uri("/api/quote?token=0xabc")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_miss_runs_handler_and_stores_with_combined_ttl() {
        let backend = Arc::new(FixedBackend::new(None));
        let counter = Arc::new(AtomicUsize::new(0));
        let app = swr_router(backend.clone(), counter.clone());

        let response = app.oneshot(quote_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"quote":1}"#);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let sets = backend.sets.lock().clone();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].1, r#"{"quote":1}"#);
        // ttl = max_age + stale_while_revalidate
        assert_eq!(sets[0].2, Some(300));
    }

    #[tokio::test]
    async fn test_fresh_hit_skips_handler() {
        let entry = CacheEntry::new(r#"{"quote":"cached"}"#, unix_now() + 200);
        let backend = Arc::new(FixedBackend::new(Some(entry)));
        let counter = Arc::new(AtomicUsize::new(0));
        let app = swr_router(backend.clone(), counter.clone());

        // remaining ≈ 200 >= 窗口 150，FRESH
        let response = app.oneshot(quote_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"quote":"cached"}"#);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(backend.sets.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stale_hit_serves_cached_and_revalidates_once() {
        let entry = CacheEntry::new(r#"{"quote":"stale"}"#, unix_now() + 100);
        let backend = Arc::new(FixedBackend::new(Some(entry)));
        let counter = Arc::new(AtomicUsize::new(0));
        let app = swr_router(backend.clone(), counter.clone());

        // remaining ≈ 100，0 <= 100 < 150，STALE
        let response = app.oneshot(quote_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"quote":"stale"}"#);

        // 后台重算恰好一次，并用 handler 的新输出刷新缓存
        let mut refreshed = false;
        for _ in 0..100 {
            if counter.load(Ordering::SeqCst) == 1 && !backend.sets.lock().is_empty() {
                refreshed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refreshed, "background revalidation never happened");
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let sets = backend.sets.lock().clone();
        assert_eq!(sets[0].1, r#"{"quote":1}"#);
        assert_eq!(sets[0].2, Some(300));
    }

    #[tokio::test]
    async fn test_expired_entry_treated_as_miss() {
        let entry = CacheEntry::new(r#"{"quote":"ancient"}"#, unix_now() - 100);
        let backend = Arc::new(FixedBackend::new(Some(entry)));
        let counter = Arc::new(AtomicUsize::new(0));
        let app = swr_router(backend.clone(), counter.clone());

        // remaining < 0：客户端拿到的是 handler 的新结果，不是过时负载
        let response = app.oneshot(quote_request()).await.unwrap();
        assert_eq!(body_string(response).await, r#"{"quote":1}"#);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_get_bypasses_cache() {
        let backend = Arc::new(FixedBackend::new(None));
        let rc = RequestCache::new(backend.clone() as Arc<dyn CachePort>, 150, 150);
        let app = Router::new()
            .route("/api/quote", post(|| async { StatusCode::OK }))
            .layer(middleware::from_fn_with_state(rc.clone(), store_cache))
            .layer(middleware::from_fn_with_state(rc, check_cache));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/quote")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(backend.sets.lock().is_empty());
    }

    #[tokio::test]
    async fn test_non_200_response_not_cached() {
        let backend = Arc::new(FixedBackend::new(None));
        let rc = RequestCache::new(backend.clone() as Arc<dyn CachePort>, 150, 150);
        let app = Router::new()
            .route("/api/quote", get(|| async { StatusCode::BAD_GATEWAY }))
            .layer(middleware::from_fn_with_state(rc.clone(), store_cache))
            .layer(middleware::from_fn_with_state(rc, check_cache));

        let response = app.oneshot(quote_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(backend.sets.lock().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_response_passes_through_uncached() {
        let backend = Arc::new(FixedBackend::new(None));
        let rc = RequestCache::new(backend.clone() as Arc<dyn CachePort>, 150, 150);
        // 超过缓冲上限的合法 200 响应
        let payload = format!(r#"{{"blob":"{}"}}"#, "x".repeat(MAX_CACHED_BODY));
        let body = payload.clone();
        let app = Router::new()
            .route(
                "/api/quote",
                get(move || {
                    let body = body.clone();
                    async move {
                        (
                            StatusCode::OK,
                            [(header::CONTENT_TYPE, "application/json")],
                            body,
                        )
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(rc.clone(), store_cache))
            .layer(middleware::from_fn_with_state(rc, check_cache));

        // 客户端原样收到完整响应，缓存不写入
        let response = app.oneshot(quote_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, payload);
        assert!(backend.sets.lock().is_empty());
    }

    #[tokio::test]
    async fn test_request_key_is_query_order_independent() {
        let a: Uri = "/api/quote?token=0xabc&base=eth".parse().unwrap();
        let b: Uri = "/api/quote?base=eth&token=0xabc".parse().unwrap();
        let c: Uri = "/api/quote?base=usd&token=0xabc".parse().unwrap();
        assert_eq!(
            RequestCache::request_key(&a).unwrap(),
            RequestCache::request_key(&b).unwrap()
        );
        assert_ne!(
            RequestCache::request_key(&a).unwrap(),
            RequestCache::request_key(&c).unwrap()
        );
    }

    /// maxAge=150, window=150 的完整场景：
    /// t=0 未命中 → handler 执行，expiry = now+300；
    /// t=200（剩 100 < 150）→ 过时命中：立即返回旧负载，后台刷新到 now+300；
    /// t=600（剩 -100）→ 未命中：handler 直接执行，没有过时负载
    #[tokio::test]
    async fn test_swr_timeline_scenario() {
        let now = unix_now();
        let counter = Arc::new(AtomicUsize::new(0));

        // t=0：缓存为空
        let backend = Arc::new(FixedBackend::new(None));
        let app = swr_router(backend.clone(), counter.clone());
        let response = app.oneshot(quote_request()).await.unwrap();
        assert_eq!(body_string(response).await, r#"{"quote":1}"#);
        {
            let entry = backend.entry.lock().clone().unwrap();
            assert!(entry.expiry >= now + 299 && entry.expiry <= now + 301);
        }

        // t=200：把条目的剩余时间调成 100 秒来模拟时间流逝
        *backend.entry.lock() = Some(CacheEntry::new(r#"{"quote":1}"#, now + 100));
        let app = swr_router(backend.clone(), counter.clone());
        let response = app.oneshot(quote_request()).await.unwrap();
        // B 立刻拿到 t=0 的负载
        assert_eq!(body_string(response).await, r#"{"quote":1}"#);
        for _ in 0..100 {
            if counter.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        // t=600：条目已经过期 100 秒
        *backend.entry.lock() = Some(CacheEntry::new(r#"{"quote":2}"#, now - 100));
        let app = swr_router(backend.clone(), counter.clone());
        let response = app.oneshot(quote_request()).await.unwrap();
        // C 是未命中：拿到的是新 handler 输出
        assert_eq!(body_string(response).await, r#"{"quote":3}"#);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
