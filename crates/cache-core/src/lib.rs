//! causeway-cache - 缓存核心
//!
//! 后端无关的缓存键派生与异步计算的记忆化封装

mod keys;
mod memo;

pub use keys::*;
pub use memo::*;
