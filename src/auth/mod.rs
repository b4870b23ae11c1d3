//! 认证层 - REST 协作方的消费端与会话状态

pub mod api;
pub mod login;
pub mod session;

pub use api::{ApiClient, LoginOtpResponse, RequestOtpResponse};
pub use login::{interactive_login, validate_email, validate_otp};
pub use session::{shared_session, AuthSession, SharedSession, UserModel};
