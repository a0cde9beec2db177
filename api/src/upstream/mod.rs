//! 上游服务客户端（价格预言机、JSON-RPC 节点）

pub mod oracle;
pub mod rpc;
