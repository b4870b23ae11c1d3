//! Secure Data Monitor - 监控大屏的终端客户端
//!
//! 消费外部服务的 REST（OTP 登录）与 WebSocket 推送通道，
//! 本地维护通知存储与告警呈现，不实现任何服务端组件。

pub mod auth;
pub mod config;
pub mod error;
pub mod notification;
pub mod tui;

pub use auth::{interactive_login, ApiClient, AuthSession, SharedSession, UserModel};
pub use config::Config;
pub use error::{AppError, Result};
pub use notification::{
    classify, shared_store, AlertPresenter, ChannelOptions, ChannelState, DetectionEvent,
    NotificationRecord, NotificationStore, PresenterOptions, PushChannel, PushChannelHandle,
    Severity, SharedStore,
};
