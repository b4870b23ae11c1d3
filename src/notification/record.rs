//! 通知记录 - 检测事件的线格式与本地存储形态
//!
//! `DetectionEvent` 按外部服务的帧格式定义；字段缺失按占位符降级，
//! 未知字段原样保留。`NotificationRecord` 在入库时由存储补上本地 id
//! 与已读标记，id 永远不来自外部服务。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 字段缺失时的占位展示（降级而非报错）
pub const UNKNOWN_FIELD: &str = "UNKNOWN";

/// 帧元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FrameMetadata {
    #[serde(default)]
    pub frame_number: u64,
    #[serde(default)]
    pub timestamp: f64,
}

/// 外部服务推送的一条检测事件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionEvent {
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub camera_id: String,
    #[serde(default)]
    pub camera_type: String,
    #[serde(default)]
    pub camera_location: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub person_id: String,
    #[serde(default)]
    pub person_name: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_quality: Option<f64>,
    #[serde(default)]
    pub tracking_id: String,
    #[serde(default)]
    pub frame_metadata: FrameMetadata,
    /// 外部服务给出的严重度标签（可能缺失、大小写混乱或拼错）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    /// 未识别的附加字段，原样保留
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl DetectionEvent {
    /// 人名展示，缺失时降级为占位符
    pub fn display_name(&self) -> &str {
        if self.person_name.is_empty() {
            UNKNOWN_FIELD
        } else {
            &self.person_name
        }
    }

    /// 位置展示，缺失时降级为占位符
    pub fn display_location(&self) -> &str {
        if self.camera_location.is_empty() {
            UNKNOWN_FIELD
        } else {
            &self.camera_location
        }
    }

    /// 置信度百分比文本（例如 "97.0%"）
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }
}

/// 入库后的通知记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// 进程内分配的唯一 id（单调递增，不复用）
    pub id: u64,
    /// 已读标记：只允许 false → true，清空存储除外
    pub is_read: bool,
    #[serde(flatten)]
    pub event: DetectionEvent,
}

impl NotificationRecord {
    /// 侧栏/Toast 的一行摘要
    pub fn summary(&self) -> String {
        format!(
            "{} detected at {}",
            self.event.display_name(),
            self.event.display_location()
        )
    }
}
