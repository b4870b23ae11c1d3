//! TUI 应用状态和主循环

use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

use crate::auth::session::SharedSession;
use crate::config::Config;
use crate::notification::{AlertPresenter, PresenterOptions, SharedStore};
use crate::tui::state::{demo_cameras, CameraGrid};

pub type AppResult<T> = Result<T>;
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// 事件轮询间隔（同时是呈现控制器的 tick 周期）
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// TUI 应用状态
pub struct App {
    pub store: SharedStore,
    pub session: SharedSession,
    pub presenter: AlertPresenter,
    pub grid: CameraGrid,
    /// 事件侧栏是否展开
    pub sidebar_open: bool,
    /// 全屏告警的档案视图展开时刻（None 表示未展开）
    pub modal_expanded_at: Option<Instant>,
    /// 渲染帧计数（驱动图标动画）
    pub tick: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: &Config, store: SharedStore, session: SharedSession) -> Self {
        Self {
            store,
            session,
            presenter: AlertPresenter::new(PresenterOptions {
                toast_ttl: config.toast_ttl,
                ..Default::default()
            }),
            grid: CameraGrid::new(demo_cameras()),
            sidebar_open: true,
            modal_expanded_at: None,
            tick: 0,
            should_quit: false,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// 每个 tick：对齐呈现控制器、过期 Toast、高强度告警响铃
    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        let now = Instant::now();

        let mut store = self.store.lock().expect("store lock poisoned");
        let outcome = self.presenter.sync(&store, now);
        let _ = self.presenter.tick(&mut store, now);

        if outcome.high_intensity > 0 {
            // 新的打断重置档案视图并响铃
            self.modal_expanded_at = None;
            let _ = write!(io::stdout(), "\x07");
        }
    }

    /// 展开当前全屏告警的档案视图，逐字段揭示从此刻开始
    pub fn expand_modal(&mut self) {
        if self.presenter.modal().is_some() && self.modal_expanded_at.is_none() {
            self.modal_expanded_at = Some(Instant::now());
        }
    }

    /// 消除当前全屏告警
    pub fn dismiss_modal(&mut self) {
        let mut store = self.store.lock().expect("store lock poisoned");
        let _ = self.presenter.dismiss_modal(&mut store);
        self.modal_expanded_at = None;
    }

    /// 消除最旧的一条 Toast
    pub fn dismiss_oldest_toast(&mut self) {
        let id = self.presenter.toasts().first().map(|a| a.id());
        if let Some(id) = id {
            let mut store = self.store.lock().expect("store lock poisoned");
            let _ = self.presenter.dismiss(id, &mut store);
        }
    }

    pub fn mark_all_read(&mut self) {
        self.store
            .lock()
            .expect("store lock poisoned")
            .mark_all_read();
    }

    /// 清空事件账本；活动告警在下一个 tick 被安全丢弃
    pub fn clear_ledger(&mut self) {
        self.store.lock().expect("store lock poisoned").clear();
    }

    pub fn unread_count(&self) -> usize {
        self.store.lock().expect("store lock poisoned").unread_count()
    }
}

/// 初始化终端（raw mode + 备用屏）
pub fn init_terminal() -> AppResult<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// 恢复终端。退出路径都必须经过这里，包括出错返回。
pub fn restore_terminal() -> AppResult<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// 主循环：轮询按键 + 定时 tick + 渲染
pub fn run(terminal: &mut Tui, app: &mut App) -> AppResult<()> {
    while !app.should_quit {
        if let Some(event) = crate::tui::event::poll_event(TICK_INTERVAL)? {
            if let crate::tui::event::TuiEvent::Key(key) = event {
                crate::tui::event::handle_key(app, key);
            }
        }
        app.on_tick();
        terminal.draw(|frame| crate::tui::ui::render(app, frame))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::shared_session;
    use crate::notification::shared_store;
    use crate::notification::DetectionEvent;

    fn app() -> App {
        App::new(&Config::default(), shared_store(100), shared_session())
    }

    #[test]
    fn test_on_tick_surfaces_new_records() {
        let mut app = app();
        app.store.lock().unwrap().add(DetectionEvent {
            event_type: "poi_detection".to_string(),
            person_name: "John".to_string(),
            classification: Some("severe".to_string()),
            ..Default::default()
        });

        app.on_tick();
        assert!(app.presenter.modal().is_some());
    }

    #[test]
    fn test_dismiss_modal_marks_read() {
        let mut app = app();
        let id = app.store.lock().unwrap().add(DetectionEvent {
            classification: Some("grievous".to_string()),
            event_type: "poi_detection".to_string(),
            ..Default::default()
        });

        app.on_tick();
        app.dismiss_modal();
        assert!(app.presenter.modal().is_none());
        let store = app.store.lock().unwrap();
        assert!(store.get(id).unwrap().is_read);
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_clear_ledger_drops_active_alerts_next_tick() {
        let mut app = app();
        app.store.lock().unwrap().add(DetectionEvent {
            event_type: "poi_detection".to_string(),
            classification: Some("minor".to_string()),
            ..Default::default()
        });
        app.on_tick();
        assert_eq!(app.presenter.toasts().len(), 1);

        app.clear_ledger();
        app.on_tick();
        assert!(app.presenter.toasts().is_empty());
        assert_eq!(app.unread_count(), 0);
    }

    #[test]
    fn test_mark_all_read_resets_unread() {
        let mut app = app();
        {
            let mut store = app.store.lock().unwrap();
            store.add(DetectionEvent::default());
            store.add(DetectionEvent::default());
        }
        assert_eq!(app.unread_count(), 2);
        app.mark_all_read();
        assert_eq!(app.unread_count(), 0);
    }
}
