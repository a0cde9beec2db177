//! 通用工具函数

use chrono::Utc;

/// 当前 Unix 时间戳（秒）
///
/// 缓存条目的 expiry 一律以绝对秒数解释
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// 校验 EVM 地址格式（0x + 40 位十六进制）
pub fn is_address(s: &str) -> bool {
    s.len() == 42
        && s.starts_with("0x")
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// 解析 JSON-RPC 返回的十六进制数量（如 "0x1b4"）
pub fn parse_hex_quantity(s: &str) -> Option<u128> {
    let hex = s.strip_prefix("0x")?;
    if hex.is_empty() {
        return None;
    }
    u128::from_str_radix(hex, 16).ok()
}
