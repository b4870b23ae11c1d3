//! 登录流程 - 邮箱 → 一次性令牌 → 已认证会话
//!
//! 两步交互：先本地校验再发网络请求，认证失败提示后允许重试。

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Input};
use tracing::info;

use crate::auth::api::ApiClient;
use crate::auth::session::{SharedSession, UserModel};
use crate::config::Config;
use crate::error::AppError;

/// OTP 重试次数上限（超过后回到邮箱步骤）
const MAX_OTP_ATTEMPTS: usize = 3;

/// 本地校验邮箱格式与域名限制，不发起网络请求
pub fn validate_email(email: &str, allowed_domain: Option<&str>) -> Result<(), AppError> {
    let email = email.trim();
    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => {
            return Err(AppError::Validation(
                "Please enter a valid email address.".to_string(),
            ))
        }
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(AppError::Validation(
            "Please enter a valid email address.".to_string(),
        ));
    }
    if let Some(required) = allowed_domain {
        if !domain.eq_ignore_ascii_case(required) {
            return Err(AppError::Validation(format!(
                "Access restricted to authorized @{} email addresses.",
                required
            )));
        }
    }
    Ok(())
}

/// 本地校验 OTP 长度与字符，不发起网络请求
pub fn validate_otp(otp: &str, expected_length: usize) -> Result<(), AppError> {
    let otp = otp.trim();
    if otp.len() != expected_length || !otp.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::Validation(format!(
            "Please enter a valid {}-digit security token.",
            expected_length
        )));
    }
    Ok(())
}

/// 交互式登录：成功后将 token 与用户写入会话并返回用户
pub async fn interactive_login(
    config: &Config,
    api: &mut ApiClient,
    session: &SharedSession,
) -> Result<UserModel> {
    let theme = ColorfulTheme::default();

    loop {
        let domain = config.allowed_email_domain.clone();
        let email: String = Input::with_theme(&theme)
            .with_prompt("Personnel email")
            .validate_with(move |input: &String| {
                validate_email(input, domain.as_deref()).map_err(|e| e.to_string())
            })
            .interact_text()?;
        let email = email.trim().to_string();

        if let Err(e) = api.request_otp(&email).await {
            if e.is_user_facing() {
                eprintln!("✗ {}", e);
                continue;
            }
            return Err(e.into());
        }
        println!("A security token has been sent to {}.", email);

        for attempt in 1..=MAX_OTP_ATTEMPTS {
            let otp_length = config.otp_length;
            let otp: String = Input::with_theme(&theme)
                .with_prompt(format!("{}-digit security token", otp_length))
                .validate_with(move |input: &String| {
                    validate_otp(input, otp_length).map_err(|e| e.to_string())
                })
                .interact_text()?;

            match api.verify_otp(&email, otp.trim()).await {
                Ok(body) => {
                    let token = body
                        .access_token
                        .expect("verify_otp guarantees a non-empty token");
                    let user = body
                        .user
                        .unwrap_or_else(|| UserModel::from_identifier(&email));

                    api.set_access_token(&token);
                    session
                        .write()
                        .expect("session lock poisoned")
                        .set_authenticated(&token, user.clone());

                    info!(email = %email, "Authenticated");
                    return Ok(user);
                }
                Err(e) if e.is_user_facing() && attempt < MAX_OTP_ATTEMPTS => {
                    eprintln!("✗ {}", e);
                }
                Err(e) if e.is_user_facing() => {
                    eprintln!("✗ {} Returning to email step.", e);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email_accepts_normal_address() {
        assert!(validate_email("officer@dss.gov.ng", None).is_ok());
        assert!(validate_email("  padded@example.com  ", None).is_ok());
    }

    #[test]
    fn test_validate_email_rejects_malformed() {
        assert!(validate_email("not-an-email", None).is_err());
        assert!(validate_email("@dss.gov.ng", None).is_err());
        assert!(validate_email("officer@", None).is_err());
        assert!(validate_email("officer@nodot", None).is_err());
    }

    #[test]
    fn test_validate_email_domain_restriction() {
        assert!(validate_email("a@dss.gov.ng", Some("dss.gov.ng")).is_ok());
        // 域名比较忽略大小写
        assert!(validate_email("a@DSS.GOV.NG", Some("dss.gov.ng")).is_ok());

        let err = validate_email("a@gmail.com", Some("dss.gov.ng")).unwrap_err();
        assert!(err.to_string().contains("@dss.gov.ng"));
    }

    #[test]
    fn test_validate_otp_length() {
        assert!(validate_otp("123456", 6).is_ok());
        assert!(validate_otp("12345", 6).is_err());
        assert!(validate_otp("1234567", 6).is_err());
        // 部署常量可配置为其它长度
        assert!(validate_otp("a1b2c3a1b2c3a1b2c3a1b2c3", 24).is_ok());
    }

    #[test]
    fn test_validate_otp_rejects_non_alphanumeric() {
        assert!(validate_otp("12 456", 6).is_err());
        assert!(validate_otp("12-456", 6).is_err());
    }
}
