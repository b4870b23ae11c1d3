//! 通知管线端到端测试：本地 WebSocket 服务端 → 推送通道 → 存储 → 呈现

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::SinkExt;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use secure_data_monitor::auth::{shared_session, SharedSession, UserModel};
use secure_data_monitor::{
    shared_store, AlertPresenter, ChannelOptions, PresenterOptions, PushChannel,
};

/// 起一个本地服务端：接受一条连接，推送给定帧后关闭
async fn spawn_frame_server(frames: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            let mut ws = accept_async(stream).await.unwrap();
            for frame in frames {
                let _ = ws.send(Message::Text(frame)).await;
            }
            // 给客户端一点时间消费完再关闭
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = ws.close(None).await;
        }
    });
    format!("ws://{}", addr)
}

fn authenticated_session(token: &str) -> SharedSession {
    let session = shared_session();
    session
        .write()
        .unwrap()
        .set_authenticated(token, UserModel::from_identifier("officer@dss.gov.ng"));
    session
}

fn options(ws_base_url: String) -> ChannelOptions {
    ChannelOptions {
        ws_base_url,
        accept_event_type: Some("poi_detection".to_string()),
        reconnect_delay: Duration::from_millis(100),
    }
}

/// 等待条件成立，超时则失败
async fn wait_for(mut condition: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_end_to_end_detection_flow() {
    // 1. 服务端推送一条 severe 检测帧
    let frame = r#"{
        "event_type": "poi_detection",
        "camera_id": "CAM_RE_104",
        "camera_type": "fixed",
        "camera_location": "Gate 1",
        "person_id": "poi-1",
        "person_name": "John",
        "confidence": 0.97,
        "tracking_id": "trk-1",
        "classification": "severe"
    }"#;
    let url = spawn_frame_server(vec![frame.to_string()]).await;

    let session = authenticated_session("tok-e2e");
    let store = shared_store(100);
    let channel = PushChannel::new(session.clone(), store.clone(), options(url));
    let handle = channel.spawn();

    // 2. 存储收到一条未读记录
    {
        let store = store.clone();
        wait_for(move || store.lock().unwrap().len() == 1, "frame to arrive").await;
    }
    // 登出后拆除，避免后台重连干扰断言
    session.write().unwrap().clear();
    handle.close().await;

    {
        let store = store.lock().unwrap();
        assert_eq!(store.unread_count(), 1);
        let record = &store.records()[0];
        assert_eq!(record.event.person_name, "John");
        assert!(!record.is_read);
    }

    // 3. 呈现控制器把它作为唯一的全屏告警
    let mut presenter = AlertPresenter::new(PresenterOptions::default());
    let now = Instant::now();
    {
        let store = store.lock().unwrap();
        presenter.sync(&store, now);
    }
    let modal = presenter.modal().expect("severe alert should interrupt");
    assert_eq!(modal.record.event.person_name, "John");
    assert!(presenter.toasts().is_empty());

    // 4. 消除后标记已读，未读数 -1
    {
        let mut store = store.lock().unwrap();
        presenter.dismiss_modal(&mut store);
        assert_eq!(store.unread_count(), 0);
        assert!(store.records()[0].is_read);
    }
    assert!(presenter.modal().is_none());
}

#[tokio::test]
async fn test_channel_never_connects_without_token() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    {
        let accepted = accepted.clone();
        tokio::spawn(async move {
            while let Ok((_stream, _)) = listener.accept().await {
                accepted.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    // 未认证的会话
    let session = shared_session();
    let store = shared_store(100);
    let channel = PushChannel::new(session, store, options(format!("ws://{}", addr)));
    let handle = channel.spawn();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 0, "socket opened without token");
    handle.close().await;
}

#[tokio::test]
async fn test_malformed_and_filtered_frames_are_dropped() {
    let frames = vec![
        "not json {{{".to_string(),
        r#"{"event_type":"heartbeat"}"#.to_string(),
        r#"{"event_type":"poi_detection","person_name":"Jane","camera_location":"Gate 2","classification":"minor"}"#
            .to_string(),
    ];
    let url = spawn_frame_server(frames).await;

    let session = authenticated_session("tok-drop");
    let store = shared_store(100);
    let channel = PushChannel::new(session.clone(), store.clone(), options(url));
    let handle = channel.spawn();

    {
        let store = store.clone();
        wait_for(move || store.lock().unwrap().len() == 1, "accepted frame").await;
    }
    // 坏帧与未接受类型都被丢弃且不断开连接，只有合法帧入库
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.lock().unwrap().len(), 1);
    assert_eq!(store.lock().unwrap().records()[0].event.person_name, "Jane");

    session.write().unwrap().clear();
    handle.close().await;
}

#[tokio::test]
async fn test_channel_reconnects_while_token_present() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    {
        let accepted = accepted.clone();
        tokio::spawn(async move {
            // 每条连接握手后立刻关闭，迫使客户端重连
            while let Ok((stream, _)) = listener.accept().await {
                accepted.fetch_add(1, Ordering::SeqCst);
                if let Ok(mut ws) = accept_async(stream).await {
                    let _ = ws.close(None).await;
                }
            }
        });
    }

    let session = authenticated_session("tok-retry");
    let store = shared_store(100);
    let channel = PushChannel::new(session.clone(), store.clone(), options(format!("ws://{}", addr)));
    let handle = channel.spawn();

    // token 仍在：断开后按固定延迟重连（至少发生一次重连）
    {
        let accepted = accepted.clone();
        wait_for(move || accepted.load(Ordering::SeqCst) >= 2, "reconnect").await;
    }

    // 清除 token 后不再重连
    session.write().unwrap().clear();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let count_after_logout = accepted.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        accepted.load(Ordering::SeqCst),
        count_after_logout,
        "channel kept reconnecting after logout"
    );

    handle.close().await;
}
