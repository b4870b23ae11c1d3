//! 认证会话 - access token 与操作员信息的唯一持有者
//!
//! 推送通道在每次连接前从这里读取当前 token；token 被清除后
//! 通道不再重连。会话只存在于进程内，不做任何持久化。

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// 操作员信息（登录成功后由服务端返回，或从邮箱合成）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserModel {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// 服务端附带的其它字段，原样保留
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl UserModel {
    /// 从邮箱合成最小用户对象（服务端未返回 user 时使用）
    pub fn from_identifier(email: impl Into<String>) -> Self {
        let email = email.into();
        let name = email.split('@').next().map(|s| s.to_string());
        Self {
            email,
            name,
            agency_id: None,
            role: None,
            extra: HashMap::new(),
        }
    }

    /// 头部展示名：优先 name，否则邮箱 local part
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or(&self.email))
    }
}

/// 认证会话状态
#[derive(Debug, Default)]
pub struct AuthSession {
    access_token: Option<String>,
    user: Option<UserModel>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登录成功：写入 token 与用户信息
    pub fn set_authenticated(&mut self, access_token: impl Into<String>, user: UserModel) {
        self.access_token = Some(access_token.into());
        self.user = Some(user);
    }

    /// 登出：清空 token 与用户信息
    pub fn clear(&mut self) {
        self.access_token = None;
        self.user = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn user(&self) -> Option<&UserModel> {
        self.user.as_ref()
    }
}

/// 会话的共享句柄（TUI 与推送通道共用）
pub type SharedSession = Arc<RwLock<AuthSession>>;

pub fn shared_session() -> SharedSession {
    Arc::new(RwLock::new(AuthSession::new()))
}
