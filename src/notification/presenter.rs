//! 告警呈现控制器 - 决定操作员此刻看到什么
//!
//! 从存储的实时内容推导 ActiveAlertSet：每条新的未读记录本会话只浮现
//! 一次（重复 sync 幂等）；按分级器的高强度标记分成至多一个全屏打断
//! （最近浮现的那条）加一叠被动 Toast。Toast 各自带到期时刻，由 tick
//! 统一过期；任何路径的消除（用户、超时、存储清空）都会移除到期时刻，
//! 不存在针对已移除记录的残留定时器。
//!
//! ## 消除规则
//! 消除一条告警时：(a) 在存储里标记已读；(b) 同名同地点的其它活动
//! 告警一并标记并移除（同人同地的重复检测一次处理完）；(c) 从活动
//! 集合移除。消除当前全屏告警默认不自动顶上下一条（与观察到的行为
//! 一致），可通过 auto_promote 改变。

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::debug;

use super::record::NotificationRecord;
use super::severity::{classify, Severity};
use super::store::NotificationStore;

/// Toast 展示时长
pub const TOAST_TTL: Duration = Duration::from_secs(10);

/// 档案视图逐字段揭示间隔
pub const DOSSIER_FIELD_DELAY: Duration = Duration::from_millis(150);

/// 呈现选项
#[derive(Debug, Clone)]
pub struct PresenterOptions {
    /// 被动 Toast 的自动消失时长
    pub toast_ttl: Duration,
    /// 消除全屏告警后是否自动顶上下一条排队的高强度告警
    pub auto_promote: bool,
    /// 档案字段揭示间隔
    pub dossier_field_delay: Duration,
}

impl Default for PresenterOptions {
    fn default() -> Self {
        Self {
            toast_ttl: TOAST_TTL,
            auto_promote: false,
            dossier_field_delay: DOSSIER_FIELD_DELAY,
        }
    }
}

/// 一条处于活动状态（已浮现、未确认）的告警
#[derive(Debug, Clone)]
pub struct ActiveAlert {
    /// 浮现时刻的记录快照（存储被清空后快照自然失效并被丢弃）
    pub record: NotificationRecord,
    pub severity: Severity,
    /// 浮现时刻
    pub surfaced_at: Instant,
    /// 被动 Toast 的到期时刻；高强度告警没有到期时刻
    pub deadline: Option<Instant>,
}

impl ActiveAlert {
    pub fn id(&self) -> u64 {
        self.record.id
    }
}

/// 一次 sync 的结果
#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// 本次新浮现的告警条数
    pub surfaced: usize,
    /// 其中高强度的条数（用于终端响铃等提示）
    pub high_intensity: usize,
}

/// 告警呈现控制器
pub struct AlertPresenter {
    options: PresenterOptions,
    /// 浮现顺序排列的活动集合
    active: Vec<ActiveAlert>,
    /// 本会话已浮现过的记录 id（保证每条只浮现一次）
    surfaced: HashSet<u64>,
    /// 当前可见的全屏告警
    visible_modal: Option<u64>,
}

impl AlertPresenter {
    pub fn new(options: PresenterOptions) -> Self {
        Self {
            options,
            active: Vec::new(),
            surfaced: HashSet::new(),
            visible_modal: None,
        }
    }

    /// 与存储对齐：丢弃已不存在的记录（存储被清空），再把尚未浮现过的
    /// 未读记录按到达顺序浮现。重复调用幂等。
    pub fn sync(&mut self, store: &NotificationStore, now: Instant) -> SyncOutcome {
        // 存储清空后，活动告警不得再引用已删除的记录
        if let Some(dropped) = self.drop_missing(store) {
            debug!(dropped, "Dropped active alerts no longer backed by the store");
        }

        let mut outcome = SyncOutcome::default();
        // records() 最新在前；倒序遍历即按到达顺序浮现，
        // 最后到达的高强度告警成为可见的那条
        for record in store.records().iter().rev() {
            if record.is_read || self.surfaced.contains(&record.id) {
                continue;
            }
            let severity = classify(record.event.classification.as_deref());
            let deadline = if severity.is_high_intensity() {
                None
            } else {
                Some(now + self.options.toast_ttl)
            };

            self.surfaced.insert(record.id);
            self.active.push(ActiveAlert {
                record: record.clone(),
                severity,
                surfaced_at: now,
                deadline,
            });
            outcome.surfaced += 1;
            if severity.is_high_intensity() {
                self.visible_modal = Some(record.id);
                outcome.high_intensity += 1;
            }
        }
        outcome
    }

    fn drop_missing(&mut self, store: &NotificationStore) -> Option<usize> {
        let before = self.active.len();
        self.active.retain(|alert| store.get(alert.id()).is_some());
        if let Some(id) = self.visible_modal {
            if !self.active.iter().any(|a| a.id() == id) {
                self.visible_modal = None;
            }
        }
        (self.active.len() < before).then(|| before - self.active.len())
    }

    /// 当前可见的全屏高强度告警（至多一条）
    pub fn modal(&self) -> Option<&ActiveAlert> {
        let id = self.visible_modal?;
        self.active.iter().find(|a| a.id() == id)
    }

    /// 被动 Toast 栈，按浮现顺序
    pub fn toasts(&self) -> Vec<&ActiveAlert> {
        self.active
            .iter()
            .filter(|a| !a.severity.is_high_intensity())
            .collect()
    }

    /// 全部活动告警（含排队中的高强度告警）
    pub fn active(&self) -> &[ActiveAlert] {
        &self.active
    }

    /// 过期检查：消除所有到期的被动 Toast（经由与用户消除相同的路径，
    /// 包括同人同地联动）。返回本次被消除的记录 id。
    pub fn tick(&mut self, store: &mut NotificationStore, now: Instant) -> Vec<u64> {
        let due: Vec<u64> = self
            .active
            .iter()
            .filter(|a| a.deadline.is_some_and(|d| d <= now))
            .map(|a| a.id())
            .collect();

        let mut dismissed = Vec::new();
        for id in due {
            // 同组联动可能已把后面的 id 一并移除
            if self.active.iter().any(|a| a.id() == id) {
                dismissed.extend(self.dismiss(id, store));
            }
        }
        dismissed
    }

    /// 消除一条告警（用户触发或超时）。在存储里标记已读，同名同地点的
    /// 其它活动告警一并标记并移除。返回实际被消除的记录 id。
    pub fn dismiss(&mut self, id: u64, store: &mut NotificationStore) -> Vec<u64> {
        let Some(target) = self.active.iter().find(|a| a.id() == id) else {
            return Vec::new();
        };
        let person = target.record.event.person_name.clone();
        let location = target.record.event.camera_location.clone();

        // 同组：同一主体名 + 同一地点（含自身）
        let group: Vec<u64> = self
            .active
            .iter()
            .filter(|a| {
                a.id() == id
                    || (a.record.event.person_name == person
                        && a.record.event.camera_location == location)
            })
            .map(|a| a.id())
            .collect();

        for gid in &group {
            store.mark_read(*gid);
        }
        self.active.retain(|a| !group.contains(&a.id()));

        if self.visible_modal.is_some_and(|m| group.contains(&m)) {
            self.visible_modal = if self.options.auto_promote {
                self.active
                    .iter()
                    .rev()
                    .find(|a| a.severity.is_high_intensity())
                    .map(|a| a.id())
            } else {
                None
            };
        }

        debug!(id, group = group.len(), "Alert dismissed");
        group
    }

    /// 消除当前全屏告警的快捷方式
    pub fn dismiss_modal(&mut self, store: &mut NotificationStore) -> Vec<u64> {
        match self.visible_modal {
            Some(id) => self.dismiss(id, store),
            None => Vec::new(),
        }
    }

    /// 档案视图：从展开时刻到 `now` 为止已揭示的字段数
    pub fn dossier_reveal(&self, expanded_at: Instant, total: usize, now: Instant) -> usize {
        let elapsed = now.saturating_duration_since(expanded_at);
        revealed_count(elapsed, self.options.dossier_field_delay, total)
    }
}

impl Default for AlertPresenter {
    fn default() -> Self {
        Self::new(PresenterOptions::default())
    }
}

/// 固定间隔下到 `elapsed` 为止揭示的字段数。
/// `elapsed >= total * delay` 时全部揭示，顺序即字段顺序。
pub fn revealed_count(elapsed: Duration, field_delay: Duration, total: usize) -> usize {
    if field_delay.is_zero() {
        return total;
    }
    let steps = (elapsed.as_millis() / field_delay.as_millis()) as usize;
    steps.min(total)
}

/// 档案字段，固定顺序（揭示顺序可断言）
pub fn dossier_fields(record: &NotificationRecord) -> Vec<(&'static str, String)> {
    let event = &record.event;
    vec![
        ("Person Name", event.display_name().to_string()),
        (
            "Location",
            format!("{} ({})", event.display_location(), event.camera_id),
        ),
        ("Tracking ID", event.tracking_id.clone()),
        (
            "Classification",
            classify(event.classification.as_deref()).to_string(),
        ),
        ("Confidence", event.confidence_percent()),
        ("Camera Type", event.camera_type.clone()),
    ]
}
