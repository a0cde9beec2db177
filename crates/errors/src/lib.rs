//! causeway-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用错误类型
///
/// 缓存层的失败永远不会伪装成命中：反序列化失败降级为未命中（重新计算），
/// 后端不可达则作为独立的错误向上传播，由调用方决定回退策略。
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cache key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cache backend unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn key_derivation(msg: impl Into<String>) -> Self {
        Self::KeyDerivation(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn cache_unavailable(msg: impl Into<String>) -> Self {
        Self::CacheUnavailable(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::KeyDerivation(_) => 500,
            Self::Serialization(_) => 500,
            Self::CacheUnavailable(_) => 503,
            Self::Upstream(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// 转换为 Problem Details
    pub fn to_problem_details(&self) -> ProblemDetails {
        ProblemDetails {
            r#type: self.problem_type(),
            title: self.problem_title(),
            status: self.status_code(),
            detail: self.to_string(),
            instance: None,
        }
    }

    fn problem_type(&self) -> String {
        match self {
            Self::NotFound(_) => "https://api.causeway.fi/problems/not-found".to_string(),
            Self::Validation(_) => "https://api.causeway.fi/problems/validation".to_string(),
            Self::KeyDerivation(_) => {
                "https://api.causeway.fi/problems/key-derivation".to_string()
            }
            Self::Serialization(_) => "https://api.causeway.fi/problems/serialization".to_string(),
            Self::CacheUnavailable(_) => {
                "https://api.causeway.fi/problems/cache-unavailable".to_string()
            }
            Self::Upstream(_) => "https://api.causeway.fi/problems/upstream".to_string(),
            Self::Internal(_) => "https://api.causeway.fi/problems/internal".to_string(),
        }
    }

    fn problem_title(&self) -> String {
        match self {
            Self::NotFound(_) => "Resource Not Found".to_string(),
            Self::Validation(_) => "Validation Error".to_string(),
            Self::KeyDerivation(_) => "Cache Key Derivation Error".to_string(),
            Self::Serialization(_) => "Serialization Error".to_string(),
            Self::CacheUnavailable(_) => "Cache Backend Unavailable".to_string(),
            Self::Upstream(_) => "Upstream Service Error".to_string(),
            Self::Internal(_) => "Internal Server Error".to_string(),
        }
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;
