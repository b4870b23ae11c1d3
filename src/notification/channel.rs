//! 推送通道管理器 - 唯一一条到事件源的持久连接
//!
//! 连接严格以认证状态为前提：连接 URL 在每次连接时刻从会话读取当前
//! token 推导，token 轮换后旧连接断开即自然换用新 token。帧解析失败
//! 只记日志丢弃，不断开连接；断开时若仍持有 token，则安排且只安排一次
//! 固定延迟重连。拆除（退出/登出）通过关闭信号完成，保证不留悬挂套接字。
//!
//! 状态机与传输分离：状态迁移都在本结构体的同步方法里，`run` 只是把
//! tokio-tungstenite 的连接事件映射到这些迁移上，便于脱离网络测试。

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::auth::session::SharedSession;

use super::record::DetectionEvent;
use super::store::SharedStore;

/// 断开后的固定重连延迟
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// 默认只接受的事件类型
pub const DEFAULT_EVENT_TYPE: &str = "poi_detection";

/// 连接状态。由通道管理器独占持有。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// 通道选项
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// WebSocket 基础地址（连接目标为 `<base>/ws/notifications?token=...`）
    pub ws_base_url: String,
    /// 只接受该 event_type 的帧；None 表示全部转发进存储
    pub accept_event_type: Option<String>,
    /// 重连延迟
    pub reconnect_delay: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            ws_base_url: "ws://localhost:8000".to_string(),
            accept_event_type: Some(DEFAULT_EVENT_TYPE.to_string()),
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// 推送通道管理器
pub struct PushChannel {
    session: SharedSession,
    store: SharedStore,
    options: ChannelOptions,
    state: ChannelState,
    /// 是否已有一次待执行的重连（最多一个）
    reconnect_pending: bool,
}

impl PushChannel {
    pub fn new(session: SharedSession, store: SharedStore, options: ChannelOptions) -> Self {
        Self {
            session,
            store,
            options,
            state: ChannelState::Disconnected,
            reconnect_pending: false,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// 连接目标。无 token 时返回 None —— 不会打开任何套接字。
    /// token 在调用时刻读取，轮换后的新连接自动携带新 token。
    pub fn connect_url(&self) -> Option<String> {
        let session = self.session.read().ok()?;
        let token = session.access_token()?;
        Some(format!(
            "{}/ws/notifications?token={}",
            self.options.ws_base_url, token
        ))
    }

    /// 尝试进入 Connecting。已在连接或已连接时为空操作并返回 false，
    /// 保证任一时刻至多一条在开/已开的连接。
    pub fn begin_connect(&mut self) -> bool {
        if self.state != ChannelState::Disconnected {
            debug!(state = ?self.state, "Push channel already active, skipping connect");
            return false;
        }
        self.reconnect_pending = false;
        self.state = ChannelState::Connecting;
        true
    }

    /// 连接建立成功
    pub fn on_open(&mut self) {
        self.state = ChannelState::Connected;
    }

    /// 主动拆除开始
    pub fn begin_close(&mut self) {
        self.state = ChannelState::Closing;
    }

    /// 连接结束（服务端关闭、网络故障或拆除完成）。
    /// 仍持有 token 且尚无待执行重连时安排一次重连并返回 true。
    pub fn on_closed(&mut self) -> bool {
        let was_closing = self.state == ChannelState::Closing;
        self.state = ChannelState::Disconnected;

        if was_closing {
            // 主动拆除不重连
            return false;
        }
        let authenticated = self
            .session
            .read()
            .map(|s| s.is_authenticated())
            .unwrap_or(false);
        if authenticated && !self.reconnect_pending {
            self.reconnect_pending = true;
            return true;
        }
        false
    }

    /// 解析并过滤一帧；接受则交给存储 add，返回新记录 id。
    /// 坏帧与未接受的事件类型都只记日志丢弃，绝不让错误进入渲染路径。
    pub fn ingest_frame(&self, text: &str) -> Option<u64> {
        let event: DetectionEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                return None;
            }
        };

        if let Some(required) = &self.options.accept_event_type {
            if event.event_type != *required {
                debug!(event_type = %event.event_type, "Dropping frame with unaccepted event type");
                return None;
            }
        }

        info!(
            person = %event.display_name(),
            location = %event.display_location(),
            classification = %event.classification.as_deref().unwrap_or("Simple"),
            "Detection alert received"
        );
        let id = self.store.lock().expect("store lock poisoned").add(event);
        Some(id)
    }

    /// 把自己作为后台任务运行，返回可用于确定性拆除的句柄
    pub fn spawn(self) -> PushChannelHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        PushChannelHandle { shutdown_tx, task }
    }

    /// 主循环：连接 → 收帧 → 断开 → 固定延迟重连。
    /// 收到关闭信号或失去认证即退出，不再重连。
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        'lifecycle: loop {
            if *shutdown.borrow() {
                break;
            }
            let url = match self.connect_url() {
                Some(url) => url,
                None => {
                    info!("No access token; push channel stays closed");
                    break;
                }
            };
            if !self.begin_connect() {
                break;
            }

            match connect_async(url.as_str()).await {
                Ok((ws, _response)) => {
                    self.on_open();
                    info!("Push channel connected");
                    let (mut write, mut read) = ws.split();

                    loop {
                        tokio::select! {
                            changed = shutdown.changed() => {
                                // 发送端消失等同于关闭信号
                                if changed.is_err() || *shutdown.borrow() {
                                    self.begin_close();
                                    let _ = write.send(Message::Close(None)).await;
                                    let _ = self.on_closed();
                                    break 'lifecycle;
                                }
                            }
                            frame = read.next() => match frame {
                                Some(Ok(Message::Text(text))) => {
                                    let _ = self.ingest_frame(&text);
                                }
                                Some(Ok(Message::Ping(payload))) => {
                                    let _ = write.send(Message::Pong(payload)).await;
                                }
                                Some(Ok(Message::Close(frame))) => {
                                    info!(frame = ?frame, "Push channel closed by server");
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    warn!(error = %e, "Push channel transport error");
                                    break;
                                }
                                None => {
                                    info!("Push channel stream ended");
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Push channel connect failed");
                    // 打开失败按一次关闭处理，走同一条重连路径
                }
            }

            if !self.on_closed() {
                info!("Push channel closed without credentials to retry");
                break;
            }
            info!(
                delay_secs = self.options.reconnect_delay.as_secs(),
                "Reconnecting push channel"
            );
            tokio::select! {
                _ = tokio::time::sleep(self.options.reconnect_delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("Push channel task finished");
    }
}

/// 通道的拆除句柄：发出关闭信号并等待任务结束。
/// 句柄被消费后任务必然终止，连接必然释放。
pub struct PushChannelHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PushChannelHandle {
    /// 确定性拆除：通知任务关闭并等待其退出
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}
