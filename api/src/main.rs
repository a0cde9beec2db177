//! Causeway API
//!
//! 读多写少的桥接查询（价格、余额、限额、费用报价），上游缓慢或有
//! 速率限制，核心是请求缓存 + 记忆化的缓存子系统

mod error;
mod routes;
mod state;
mod swr;
mod upstream;

use axum::Router;
use causeway_adapter_memory::LocalCache;
use causeway_adapter_redis::RedisCache;
use causeway_config::AppConfig;
use causeway_ports::CachePort;
use causeway_telemetry::{init_tracing, init_tracing_json};
use secrecy::ExposeSecret;
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use upstream::{oracle::PriceOracle, rpc::RpcClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // 加载配置
    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "api/config".to_string());
    let config = AppConfig::load(&config_dir)?;

    // 初始化 tracing
    if config.is_production() {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_tracing(&config.telemetry.log_level);
    }

    // 选择缓存后端：配置了 Redis 用共享连接，否则回退到进程内有界缓存
    let cache: Arc<dyn CachePort> = match &config.redis {
        Some(redis) => {
            info!("Connecting to Redis request cache");
            let shared = RedisCache::shared(redis.url.expose_secret()).await?;
            shared.ping().await?;
            Arc::new(shared.clone())
        }
        None => {
            info!("Redis not configured, using in-process bounded cache");
            Arc::new(LocalCache::new())
        }
    };

    let state = Arc::new(AppState {
        cache,
        oracle: PriceOracle::new(&config.oracle)?,
        rpc: RpcClient::new(&config.rpc)?,
    });

    // 构建路由
    let app: Router = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // 启动服务器
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, app = %config.app_name, "Starting api server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
