//! TUI 状态数据结构 - 摄像头网格与置顶/分页

/// 每页显示的摄像头数（2 行 × 3 列）
pub const GRID_PAGE_SIZE: usize = 6;

/// 摄像头画面（占位，无真实媒体管线）
#[derive(Debug, Clone)]
pub struct CameraFeed {
    pub id: String,
    pub location: String,
    pub online: bool,
}

impl CameraFeed {
    /// 实时状态图标，tick 驱动动画（在线时闪烁）
    pub fn icon(&self, tick: usize) -> &'static str {
        if self.online {
            const FRAMES: &[&str] = &["●", "◉"];
            FRAMES[(tick / 5) % FRAMES.len()]
        } else {
            "○"
        }
    }
}

/// 摄像头网格：置顶的摄像头排最前，其余按登记顺序，分页浏览
#[derive(Debug)]
pub struct CameraGrid {
    cameras: Vec<CameraFeed>,
    /// 置顶的摄像头 id，按置顶先后
    pinned: Vec<String>,
    page: usize,
    page_size: usize,
    /// 当前页内选中的格子
    selected: usize,
}

impl CameraGrid {
    pub fn new(cameras: Vec<CameraFeed>) -> Self {
        Self {
            cameras,
            pinned: Vec::new(),
            page: 0,
            page_size: GRID_PAGE_SIZE,
            selected: 0,
        }
    }

    /// 置顶优先的完整顺序
    pub fn ordered(&self) -> Vec<&CameraFeed> {
        let mut ordered: Vec<&CameraFeed> = self
            .pinned
            .iter()
            .filter_map(|id| self.cameras.iter().find(|c| &c.id == id))
            .collect();
        ordered.extend(self.cameras.iter().filter(|c| !self.pinned.contains(&c.id)));
        ordered
    }

    pub fn total_pages(&self) -> usize {
        self.cameras.len().div_ceil(self.page_size).max(1)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// 当前页可见的摄像头
    pub fn visible(&self) -> Vec<&CameraFeed> {
        let ordered = self.ordered();
        let start = self.page * self.page_size;
        let end = (start + self.page_size).min(ordered.len());
        if start >= end {
            Vec::new()
        } else {
            ordered[start..end].to_vec()
        }
    }

    pub fn next_page(&mut self) {
        self.page = (self.page + 1) % self.total_pages();
        self.clamp_selected();
    }

    pub fn prev_page(&mut self) {
        self.page = (self.page + self.total_pages() - 1) % self.total_pages();
        self.clamp_selected();
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        let count = self.visible().len();
        if count > 0 {
            self.selected = (self.selected + 1) % count;
        }
    }

    pub fn select_prev(&mut self) {
        let count = self.visible().len();
        if count > 0 {
            self.selected = (self.selected + count - 1) % count;
        }
    }

    /// 置顶/取消置顶当前选中的摄像头
    pub fn toggle_pin_selected(&mut self) {
        let Some(id) = self.visible().get(self.selected).map(|c| c.id.clone()) else {
            return;
        };
        if let Some(pos) = self.pinned.iter().position(|p| p == &id) {
            self.pinned.remove(pos);
        } else {
            self.pinned.push(id);
        }
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.pinned.iter().any(|p| p == id)
    }

    fn clamp_selected(&mut self) {
        let count = self.visible().len();
        if count == 0 {
            self.selected = 0;
        } else if self.selected >= count {
            self.selected = count - 1;
        }
    }
}

/// 演示用的摄像头清单（无后端摄像头目录时的占位数据）
pub fn demo_cameras() -> Vec<CameraFeed> {
    const LOCATIONS: &[&str] = &[
        "Gate 1",
        "Gate 2",
        "Perimeter NW",
        "Perimeter SE",
        "Command Center",
        "Elevator 3",
    ];
    (0..12)
        .map(|i| CameraFeed {
            id: format!("CAM_RE_{}", 100 + i),
            location: LOCATIONS[i % LOCATIONS.len()].to_string(),
            // 每第 7 个节点离线，让网格有点真实感
            online: i % 7 != 6,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> CameraGrid {
        CameraGrid::new(
            (0..n)
                .map(|i| CameraFeed {
                    id: format!("CAM_RE_{}", 100 + i),
                    location: format!("Zone {}", i),
                    online: true,
                })
                .collect(),
        )
    }

    #[test]
    fn test_pagination_arithmetic() {
        assert_eq!(grid(0).total_pages(), 1);
        assert_eq!(grid(6).total_pages(), 1);
        assert_eq!(grid(7).total_pages(), 2);
        assert_eq!(grid(12).total_pages(), 2);
        assert_eq!(grid(13).total_pages(), 3);
    }

    #[test]
    fn test_page_navigation_wraps() {
        let mut g = grid(13);
        assert_eq!(g.page(), 0);
        g.next_page();
        g.next_page();
        assert_eq!(g.page(), 2);
        // 最后一页再翻回第一页
        g.next_page();
        assert_eq!(g.page(), 0);
        g.prev_page();
        assert_eq!(g.page(), 2);
    }

    #[test]
    fn test_last_page_is_partial() {
        let mut g = grid(13);
        g.next_page();
        g.next_page();
        assert_eq!(g.visible().len(), 1);
    }

    #[test]
    fn test_pin_moves_camera_to_front() {
        let mut g = grid(13);
        g.next_page(); // 第二页的第一个是 CAM_RE_106
        assert_eq!(g.visible()[0].id, "CAM_RE_106");
        g.toggle_pin_selected();

        // 置顶后排到第一页最前
        assert!(g.is_pinned("CAM_RE_106"));
        g.prev_page();
        assert_eq!(g.visible()[0].id, "CAM_RE_106");
        // 其余顺序不变
        assert_eq!(g.visible()[1].id, "CAM_RE_100");
    }

    #[test]
    fn test_unpin_restores_order() {
        let mut g = grid(8);
        g.select_next();
        g.select_next(); // CAM_RE_102
        g.toggle_pin_selected();
        assert_eq!(g.visible()[0].id, "CAM_RE_102");

        // 再次切换取消置顶
        // 置顶后它在第 0 格，选中移回 0 再切换
        while g.selected() != 0 {
            g.select_prev();
        }
        g.toggle_pin_selected();
        assert!(!g.is_pinned("CAM_RE_102"));
        assert_eq!(g.visible()[0].id, "CAM_RE_100");
    }

    #[test]
    fn test_selection_wraps_within_page() {
        let mut g = grid(6);
        g.select_prev();
        assert_eq!(g.selected(), 5);
        g.select_next();
        assert_eq!(g.selected(), 0);
    }

    #[test]
    fn test_demo_cameras_are_labeled() {
        let cameras = demo_cameras();
        assert_eq!(cameras.len(), 12);
        assert_eq!(cameras[0].id, "CAM_RE_100");
        assert!(cameras.iter().any(|c| !c.online));
    }
}
