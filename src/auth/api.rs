//! REST 客户端 - OTP 申请与校验
//!
//! 只消费外部服务的两个端点：`POST /request-otp` 与 `POST /login-otp`。
//! 登录后的请求自动附带 `Authorization: Bearer <token>`；401 只记日志，
//! 不做刷新重试（上层自行决定如何反应）。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::auth::session::UserModel;
use crate::error::{AppError, Result};

/// 请求超时（与原服务观察到的 30s 一致）
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct RequestOtpBody<'a> {
    identifier: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginOtpBody<'a> {
    identifier: &'a str,
    otp: &'a str,
}

/// `POST /request-otp` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct RequestOtpResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// `POST /login-otp` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct LoginOtpResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserModel>,
}

/// REST 客户端
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    /// 登录成功后注入 token，之后的请求自动带 Bearer 头
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    pub fn clear_access_token(&mut self) {
        self.access_token = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 申请一次性令牌
    pub async fn request_otp(&self, identifier: &str) -> Result<RequestOtpResponse> {
        debug!(identifier = %identifier, "Requesting OTP");
        let response = self
            .post_json(&self.url("/request-otp"), &RequestOtpBody { identifier })
            .await?;

        let body: RequestOtpResponse = response.json().await?;
        if !body.success {
            return Err(AppError::Authentication(non_empty_message(
                &body.message,
                "Unable to send a security token to this address.",
            )));
        }
        Ok(body)
    }

    /// 校验一次性令牌；成功时返回 token 与用户信息
    pub async fn verify_otp(&self, identifier: &str, otp: &str) -> Result<LoginOtpResponse> {
        debug!(identifier = %identifier, "Verifying OTP");
        let response = self
            .post_json(&self.url("/login-otp"), &LoginOtpBody { identifier, otp })
            .await?;

        let body: LoginOtpResponse = response.json().await?;
        if !body.success {
            return Err(AppError::Authentication(non_empty_message(
                &body.message,
                "Invalid security token. Please try again.",
            )));
        }
        if body.access_token.as_deref().unwrap_or("").is_empty() {
            return Err(AppError::ExternalService(
                "login succeeded but no access_token was returned".to_string(),
            ));
        }
        Ok(body)
    }

    async fn post_json<B: Serialize>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        let mut request = self.http.post(url).json(body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!(url = %url, error = %e, "API request failed");
            AppError::Request(e)
        })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            warn!(url = %url, "Unauthorized - token may be invalid or expired");
        }
        Ok(response)
    }
}

fn non_empty_message(message: &str, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.url("/request-otp"), "http://localhost:8000/request-otp");
    }

    #[test]
    fn test_login_response_optional_fields() {
        // user 缺失时也能反序列化（调用方从邮箱合成最小用户）
        let json = r#"{"success":true,"message":"ok","access_token":"tok-abc"}"#;
        let body: LoginOtpResponse = serde_json::from_str(json).unwrap();
        assert!(body.success);
        assert_eq!(body.access_token.as_deref(), Some("tok-abc"));
        assert!(body.user.is_none());
    }

    #[test]
    fn test_login_response_with_user() {
        let json = r#"{"success":true,"message":"","access_token":"t","user":{"email":"a@b.c","role":"officer"}}"#;
        let body: LoginOtpResponse = serde_json::from_str(json).unwrap();
        let user = body.user.unwrap();
        assert_eq!(user.email, "a@b.c");
        assert_eq!(user.role.as_deref(), Some("officer"));
    }

    #[test]
    fn test_non_empty_message_fallback() {
        assert_eq!(non_empty_message("  ", "fallback"), "fallback");
        assert_eq!(non_empty_message("denied", "fallback"), "denied");
    }
}
