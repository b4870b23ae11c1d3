//! TUI 渲染模块

use std::time::Instant;

use chrono::Local;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::notification::{dossier_fields, ActiveAlert, NotificationRecord, Severity};
use crate::tui::state::GRID_PAGE_SIZE;
use crate::tui::App;

/// 侧栏宽度
const SIDEBAR_WIDTH: u16 = 42;
/// Toast 宽度
const TOAST_WIDTH: u16 = 38;
/// Toast 高度（含边框）
const TOAST_HEIGHT: u16 = 4;
/// 同时显示的 Toast 上限（其余排队等前面的过期）
const MAX_VISIBLE_TOASTS: usize = 4;

/// 渲染主界面
pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // 头部
            Constraint::Min(10),    // 主区域
            Constraint::Length(1),  // 快捷键
        ])
        .split(area);

    render_header(app, frame, vertical[0]);

    // 主区域: 网格 | 侧栏
    let constraints = if app.sidebar_open {
        vec![Constraint::Min(40), Constraint::Length(SIDEBAR_WIDTH)]
    } else {
        vec![Constraint::Min(40)]
    };
    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(vertical[1]);

    render_grid(app, frame, main[0]);
    if app.sidebar_open {
        render_sidebar(app, frame, main[1]);
    }

    render_footer(app, frame, vertical[2]);

    // 浮层：Toast 叠放在网格右上角，全屏告警居中打断
    render_toasts(app, frame, main[0]);
    render_modal(app, frame, area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (operator, role) = {
        let session = app.session.read().expect("session lock poisoned");
        match session.user() {
            Some(user) => (
                format!("Officer {}", user.display_name()),
                user.role.clone().unwrap_or_else(|| "Authorized Personnel".to_string()),
            ),
            None => ("Unauthenticated".to_string(), String::new()),
        }
    };
    let unread = app.unread_count();
    let badge = if unread > 9 {
        "9+".to_string()
    } else {
        unread.to_string()
    };

    let line = Line::from(vec![
        Span::styled(
            " SECURE DATA MONITOR ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ Surveillance Control Panel "),
        Span::styled(
            format!("│ 🔔 {} ", badge),
            if unread > 0 {
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            },
        ),
        Span::styled(
            format!("│ {} ", operator),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("{} ", role), Style::default().fg(Color::Blue)),
    ]);

    let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_grid(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " Surveillance Feed Matrix │ page {}/{} ",
            app.grid.page() + 1,
            app.grid.total_pages()
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible = app.grid.visible();
    if visible.is_empty() {
        let empty = Paragraph::new("No nodes configured.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    // 2 行 × 3 列
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);
    let mut cells = Vec::with_capacity(GRID_PAGE_SIZE);
    for row in rows.iter() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(33),
                Constraint::Percentage(34),
                Constraint::Percentage(33),
            ])
            .split(*row);
        cells.extend(cols.iter().copied());
    }

    for (i, camera) in visible.iter().enumerate() {
        let selected = i == app.grid.selected();
        let pinned = app.grid.is_pinned(&camera.id);

        let border_style = if selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if pinned {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let title = if pinned {
            format!(" {} ◆ ", camera.id)
        } else {
            format!(" {} ", camera.id)
        };

        let status = if camera.online {
            Line::from(vec![
                Span::styled(camera.icon(app.tick), Style::default().fg(Color::Green)),
                Span::styled(" LIVE", Style::default().fg(Color::Green)),
            ])
        } else {
            Line::from(vec![
                Span::styled(camera.icon(app.tick), Style::default().fg(Color::DarkGray)),
                Span::styled(" OFFLINE", Style::default().fg(Color::DarkGray)),
            ])
        };

        let tile = Paragraph::new(vec![
            Line::from(Span::styled(
                camera.location.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            status,
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        );
        frame.render_widget(tile, cells[i]);
    }
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let store = app.store.lock().expect("store lock poisoned");

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Incident Ledger │ {} unread ", store.unread_count()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if store.is_empty() {
        let empty = Paragraph::new("No notifications yet.\nWhen threats are detected,\nthey will appear here.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(empty, inner);
        return;
    }

    let items: Vec<ListItem> = store
        .records()
        .iter()
        .map(|record| ledger_item(record))
        .collect();
    frame.render_widget(List::new(items), inner);
}

fn ledger_item(record: &NotificationRecord) -> ListItem<'static> {
    let severity = crate::notification::classify(record.event.classification.as_deref());
    let marker = if record.is_read { " " } else { "●" };
    let time = record
        .event
        .timestamp
        .map(|ts| ts.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());

    let head = Line::from(vec![
        Span::styled(
            format!("{} ", marker),
            Style::default().fg(Color::LightBlue),
        ),
        Span::styled(
            format!("{} {} ", severity.icon(), severity),
            Style::default().fg(severity.accent()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(time, Style::default().fg(Color::DarkGray)),
    ]);
    let body = Line::from(Span::raw(format!(
        "  {} · {}",
        record.summary(),
        record.event.confidence_percent()
    )));
    ListItem::new(vec![head, body])
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints = if app.presenter.modal().is_some() {
        " Enter view details │ d dismiss │ q quit "
    } else {
        " q quit │ n ledger │ ←/→ page │ j/k select │ p pin │ t dismiss toast │ m mark read │ c clear "
    };
    let footer = Paragraph::new(hints).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, area);
}

fn render_toasts(app: &App, frame: &mut Frame, grid_area: Rect) {
    let now = Instant::now();
    // 全屏打断与 Toast 互不干扰：打断可见时 Toast 仍保留，只是被压在下面
    for (i, toast) in app
        .presenter
        .toasts()
        .iter()
        .take(MAX_VISIBLE_TOASTS)
        .enumerate()
    {
        let x = grid_area.right().saturating_sub(TOAST_WIDTH + 1);
        let y = grid_area.top() + 1 + (i as u16) * TOAST_HEIGHT;
        if y + TOAST_HEIGHT > grid_area.bottom() {
            break;
        }
        let area = Rect::new(x, y, TOAST_WIDTH.min(grid_area.width), TOAST_HEIGHT);
        frame.render_widget(Clear, area);
        frame.render_widget(toast_widget(toast, now), area);
    }
}

fn toast_widget(toast: &ActiveAlert, now: Instant) -> Paragraph<'static> {
    let remaining = toast
        .deadline
        .map(|d| d.saturating_duration_since(now).as_secs())
        .unwrap_or(0);

    let head = Line::from(vec![
        Span::styled(
            format!("{} {} ALERT", toast.severity.icon(), toast.severity),
            Style::default()
                .fg(toast.severity.accent())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}s", remaining),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let body = Line::from(Span::raw(toast.record.summary()));

    Paragraph::new(vec![head, body]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(toast.severity.accent())),
    )
}

fn render_modal(app: &App, frame: &mut Frame, area: Rect) {
    let Some(alert) = app.presenter.modal() else {
        return;
    };
    let accent = alert.severity.accent();
    let modal_area = centered_rect(64, 60, area);
    frame.render_widget(Clear, modal_area);

    let title = match alert.severity {
        Severity::Grievous => " GRIEVOUS_THREAT ",
        _ => " SECURITY_BREACH ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent).add_modifier(Modifier::BOLD))
        .title(title)
        .title_bottom(" LIVE_SCAN ");
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let mut lines = vec![
        Line::from(Span::styled(
            format!("{} {}", alert.severity.icon(), alert.record.event.display_name()),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::raw(alert.record.summary())),
        Line::default(),
    ];

    if let Some(expanded_at) = app.modal_expanded_at {
        // 档案逐字段揭示，节奏固定，总时长过后为完整档案
        let fields = dossier_fields(&alert.record);
        let revealed = app
            .presenter
            .dossier_reveal(expanded_at, fields.len(), Instant::now());
        lines.push(Line::from(Span::styled(
            "── Investigation Dossier ──",
            Style::default().fg(Color::DarkGray),
        )));
        for (label, value) in fields.iter().take(revealed) {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{:<16}", label),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(value.clone(), Style::default().add_modifier(Modifier::BOLD)),
            ]));
        }
        if revealed < fields.len() {
            lines.push(Line::from(Span::styled(
                "▌",
                Style::default().fg(accent).add_modifier(Modifier::SLOW_BLINK),
            )));
        }
    } else {
        lines.push(Line::from(Span::styled(
            "[ Enter ] view details    [ d ] dismiss",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let body = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(body, inner);
}

/// 居中矩形（按百分比）
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}
