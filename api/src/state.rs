//! 应用状态

use crate::upstream::oracle::PriceOracle;
use crate::upstream::rpc::RpcClient;
use causeway_ports::CachePort;
use std::sync::Arc;

/// handler 共享的状态：缓存后端 + 上游客户端
///
/// cache 同时服务于两条路径：handler 内部的 memoized 查询，
/// 以及路由层挂载的请求缓存中间件
pub struct AppState {
    pub cache: Arc<dyn CachePort>,
    pub oracle: PriceOracle,
    pub rpc: RpcClient,
}
