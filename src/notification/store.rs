//! 通知存储 - 会话内所有已接收告警的唯一事实来源
//!
//! 记录按到达顺序保存（最新在前），未读计数与记录同步维护。
//! 所有修改只经过四个操作：add / mark_read / mark_all_read / clear，
//! 每个操作都是单步完成，不存在可被观察到的中间状态。
//!
//! 存储有上限：超出后淘汰最旧记录，计数在同一次修改内修正。
//! 不做任何持久化，进程退出即消失。

use std::sync::{Arc, Mutex};

use tracing::debug;

use super::record::{DetectionEvent, NotificationRecord};

/// 默认存储上限
pub const DEFAULT_CAPACITY: usize = 500;

/// 通知存储
#[derive(Debug)]
pub struct NotificationStore {
    /// 最新在前
    records: Vec<NotificationRecord>,
    unread_count: usize,
    capacity: usize,
    next_id: u64,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            unread_count: 0,
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    /// 入库：分配本地 id、置未读、插到最前，未读数 +1。
    /// 不校验载荷内容（通道层负责过滤），返回新记录的 id。
    pub fn add(&mut self, event: DetectionEvent) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        self.records.insert(
            0,
            NotificationRecord {
                id,
                is_read: false,
                event,
            },
        );
        self.unread_count += 1;

        // 超限淘汰最旧记录，未读计数同步修正
        while self.records.len() > self.capacity {
            if let Some(evicted) = self.records.pop() {
                if !evicted.is_read {
                    self.unread_count -= 1;
                }
                debug!(id = evicted.id, "Evicted oldest notification at capacity");
            }
        }

        id
    }

    /// 标记单条已读。id 不存在或已读时为空操作（幂等）。
    pub fn mark_read(&mut self, id: u64) {
        if let Some(record) = self.records.iter_mut().find(|r| r.id == id) {
            if !record.is_read {
                record.is_read = true;
                self.unread_count -= 1;
            }
        }
    }

    /// 全部标记已读，未读数归零
    pub fn mark_all_read(&mut self) {
        for record in &mut self.records {
            record.is_read = true;
        }
        self.unread_count = 0;
    }

    /// 清空存储，未读数归零
    pub fn clear(&mut self) {
        self.records.clear();
        self.unread_count = 0;
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    /// 全部记录，最新在前
    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn get(&self, id: u64) -> Option<&NotificationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// 存储的共享句柄（推送通道与界面共用，操作在锁内单步完成）
pub type SharedStore = Arc<Mutex<NotificationStore>>;

pub fn shared_store(capacity: usize) -> SharedStore {
    Arc::new(Mutex::new(NotificationStore::with_capacity(capacity)))
}
