//! 运行时配置 - 环境变量驱动，缺省值带日志
//!
//! 所有部署相关的常量都在这里集中：REST/WS 地址、OTP 长度、
//! 事件过滤开关、Toast 展示时长、重连延迟、存储上限。

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

/// 默认 REST API 地址
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// 默认 OTP 位数（部署常量，不同环境观察到 6 和 24）
pub const DEFAULT_OTP_LENGTH: usize = 6;

/// Toast 自动消失时长（秒）
pub const DEFAULT_TOAST_TTL_SECS: u64 = 10;

/// 断线后的固定重连延迟（秒）
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

/// 通知存储上限（超出后淘汰最旧记录）
pub const DEFAULT_STORE_CAP: usize = 500;

/// 运行时配置
#[derive(Debug, Clone)]
pub struct Config {
    /// REST API 基础地址
    pub api_base_url: String,
    /// WebSocket 基础地址（缺省由 api_base_url 推导：http → ws）
    pub ws_base_url: String,
    /// OTP 位数
    pub otp_length: usize,
    /// 限定登录邮箱域名（None 表示不限制）
    pub allowed_email_domain: Option<String>,
    /// 推送通道只接受该 event_type 的帧（None 表示全部接受）
    pub accept_event_type: Option<String>,
    /// Toast 展示时长
    pub toast_ttl: Duration,
    /// 重连延迟
    pub reconnect_delay: Duration,
    /// 通知存储上限
    pub store_cap: usize,
}

impl Config {
    /// 从环境变量加载配置，缺省值写入日志
    pub fn load() -> Self {
        let api_base_url: String = try_load("SDM_API_URL", DEFAULT_API_URL);
        let ws_base_url = env::var("SDM_WS_URL")
            .unwrap_or_else(|_| derive_ws_url(&api_base_url));

        Self {
            api_base_url,
            ws_base_url,
            otp_length: try_load("SDM_OTP_LENGTH", &DEFAULT_OTP_LENGTH.to_string()),
            allowed_email_domain: env::var("SDM_EMAIL_DOMAIN").ok().filter(|d| !d.is_empty()),
            accept_event_type: load_event_filter(),
            toast_ttl: Duration::from_secs(try_load(
                "SDM_TOAST_TTL_SECS",
                &DEFAULT_TOAST_TTL_SECS.to_string(),
            )),
            reconnect_delay: Duration::from_secs(try_load(
                "SDM_RECONNECT_DELAY_SECS",
                &DEFAULT_RECONNECT_DELAY_SECS.to_string(),
            )),
            store_cap: try_load("SDM_STORE_CAP", &DEFAULT_STORE_CAP.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            ws_base_url: derive_ws_url(DEFAULT_API_URL),
            otp_length: DEFAULT_OTP_LENGTH,
            allowed_email_domain: None,
            accept_event_type: Some("poi_detection".to_string()),
            toast_ttl: Duration::from_secs(DEFAULT_TOAST_TTL_SECS),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            store_cap: DEFAULT_STORE_CAP,
        }
    }
}

/// http(s) 地址推导 ws(s) 地址
fn derive_ws_url(api_url: &str) -> String {
    if let Some(rest) = api_url.strip_prefix("https") {
        format!("wss{}", rest)
    } else if let Some(rest) = api_url.strip_prefix("http") {
        format!("ws{}", rest)
    } else {
        api_url.to_string()
    }
}

/// 事件过滤开关：SDM_EVENT_FILTER=off 接受全部帧，否则按类型过滤
fn load_event_filter() -> Option<String> {
    match env::var("SDM_EVENT_FILTER") {
        Ok(v) if v.eq_ignore_ascii_case("off") => {
            info!("SDM_EVENT_FILTER=off, forwarding all event types to the store");
            None
        }
        Ok(v) if !v.is_empty() => Some(v),
        _ => Some("poi_detection".to_string()),
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .unwrap_or_else(|e| {
            warn!("Invalid {key} value: {e}, using default: {default}");
            default.parse().ok().expect("default must parse")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_ws_url() {
        assert_eq!(derive_ws_url("http://localhost:8000"), "ws://localhost:8000");
        assert_eq!(derive_ws_url("https://api.example.com"), "wss://api.example.com");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.otp_length, 6);
        assert_eq!(config.toast_ttl, Duration::from_secs(10));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.accept_event_type.as_deref(), Some("poi_detection"));
        assert!(config.allowed_email_domain.is_none());
    }
}
