//! 事件处理模块

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

use crate::tui::App;

/// TUI 事件
#[derive(Debug)]
pub enum TuiEvent {
    Key(KeyEvent),
    Tick,
}

/// 轮询事件
pub fn poll_event(timeout: Duration) -> Result<Option<TuiEvent>> {
    if event::poll(timeout)? {
        if let Event::Key(key) = event::read()? {
            return Ok(Some(TuiEvent::Key(key)));
        }
    }
    Ok(None)
}

/// 处理按键事件。全屏告警可见时独占键盘（打断语义）。
pub fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }
    if app.presenter.modal().is_some() {
        handle_modal_key(app, key);
        return;
    }
    handle_dashboard_key(app, key);
}

/// 全屏告警下的按键：Enter 展开档案，d/Esc 消除
fn handle_modal_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.expand_modal(),
        KeyCode::Char('d') | KeyCode::Esc => app.dismiss_modal(),
        KeyCode::Char('q') => app.quit(),
        _ => {}
    }
}

fn handle_dashboard_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('n') => app.sidebar_open = !app.sidebar_open,
        KeyCode::Left | KeyCode::Char('h') => app.grid.prev_page(),
        KeyCode::Right | KeyCode::Char('l') => app.grid.next_page(),
        KeyCode::Char('j') | KeyCode::Down => app.grid.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.grid.select_prev(),
        KeyCode::Char('p') => app.grid.toggle_pin_selected(),
        KeyCode::Char('t') => app.dismiss_oldest_toast(),
        KeyCode::Char('m') => app.mark_all_read(),
        KeyCode::Char('c') => app.clear_ledger(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::shared_session;
    use crate::config::Config;
    use crate::notification::{shared_store, DetectionEvent};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> App {
        App::new(&Config::default(), shared_store(100), shared_session())
    }

    #[test]
    fn test_q_quits() {
        let mut app = app();
        handle_key(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_even_with_modal() {
        let mut app = app();
        app.store.lock().unwrap().add(DetectionEvent {
            event_type: "poi_detection".to_string(),
            classification: Some("severe".to_string()),
            ..Default::default()
        });
        app.on_tick();

        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit);
        // 不是普通 'c'：账本不应被清空
        assert_eq!(app.store.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_modal_captures_keys() {
        let mut app = app();
        app.store.lock().unwrap().add(DetectionEvent {
            event_type: "poi_detection".to_string(),
            classification: Some("grievous".to_string()),
            ..Default::default()
        });
        app.on_tick();
        assert!(app.presenter.modal().is_some());

        // 全屏告警可见时翻页键被忽略
        handle_key(&mut app, key(KeyCode::Right));
        assert_eq!(app.grid.page(), 0);

        // Enter 展开档案
        handle_key(&mut app, key(KeyCode::Enter));
        assert!(app.modal_expanded_at.is_some());

        // d 消除
        handle_key(&mut app, key(KeyCode::Char('d')));
        assert!(app.presenter.modal().is_none());
    }

    #[test]
    fn test_sidebar_toggle() {
        let mut app = app();
        assert!(app.sidebar_open);
        handle_key(&mut app, key(KeyCode::Char('n')));
        assert!(!app.sidebar_open);
    }

    #[test]
    fn test_grid_keys() {
        let mut app = app();
        handle_key(&mut app, key(KeyCode::Right));
        assert_eq!(app.grid.page(), 1);
        handle_key(&mut app, key(KeyCode::Left));
        assert_eq!(app.grid.page(), 0);
        handle_key(&mut app, key(KeyCode::Char('j')));
        assert_eq!(app.grid.selected(), 1);
    }
}
