//! 错误分类 - 区分本地校验、认证失败与传输故障
//!
//! 通知管线中的错误永远不会抛进渲染路径：
//! - Validation：本地校验失败（邮箱格式、OTP 长度），不发起网络请求
//! - Authentication：远端认证失败（OTP 申请/校验被拒），提示后可重试
//! - Transport：推送通道故障（连接失败、异常断开、坏帧），记日志不致命

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// 本地校验错误 - 未发起任何网络调用
    #[error("{0}")]
    Validation(String),

    /// 远端认证错误 - 用户可见，重试可恢复
    #[error("{0}")]
    Authentication(String),

    /// 推送通道传输错误 - 非致命，记日志后重连或丢弃
    #[error("transport error: {0}")]
    Transport(String),

    /// 外部服务返回了无法理解的响应
    #[error("unexpected response from service: {0}")]
    ExternalService(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// 是否应作为内联提示展示给用户（而非仅写日志）
    pub fn is_user_facing(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::Authentication(_))
    }
}
