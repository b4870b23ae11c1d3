//! 通知管线 - 推送通道 → 存储 → 分级 → 呈现
//!
//! # 数据流
//! 外部服务 → `PushChannel`（解析/过滤帧）→ `NotificationStore`（唯一
//! 事实来源）→ `AlertPresenter`（活动集合、全屏打断与 Toast）→ 界面。
//!
//! 存储是唯一的共享可变资源，只通过它定义的操作修改；
//! 分级器是纯函数；通道与呈现各自独占自己的状态。

pub mod channel;
pub mod presenter;
pub mod record;
pub mod severity;
pub mod store;

pub use channel::{ChannelOptions, ChannelState, PushChannel, PushChannelHandle};
pub use presenter::{
    dossier_fields, revealed_count, ActiveAlert, AlertPresenter, PresenterOptions, SyncOutcome,
};
pub use record::{DetectionEvent, FrameMetadata, NotificationRecord};
pub use severity::{classify, Severity};
pub use store::{shared_store, NotificationStore, SharedStore};
