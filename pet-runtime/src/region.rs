//! # Region 模块
//!
//! 交互区域定义与命中分类。
//!
//! 区域以骨骼坐标描述，按固定优先级依次测试：摸头 > 语音 > 视线跟随（兜底）。
//! 边界采用开区间：恰好落在边上的点不属于该区域，共享边不会重复命中。

use serde::{Deserialize, Serialize};

use crate::geometry::{DisplayTransform, ScreenRect, Vec2};

/// 区域标识
///
/// 枚举顺序即优先级顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionId {
    /// 摸头
    Headpat,
    /// 语音
    Voiceline,
    /// 视线跟随
    Gaze,
}

/// 交互区域（骨骼坐标，轴对齐矩形）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractiveRegion {
    pub id: RegionId,
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

impl InteractiveRegion {
    pub fn new(id: RegionId, x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> Self {
        Self {
            id,
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// 开区间包含测试
    pub fn contains(&self, p: Vec2) -> bool {
        self.x_min < p.x && p.x < self.x_max && self.y_min < p.y && p.y < self.y_max
    }
}

/// 各手势的启用开关
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionFlags {
    pub headpat: bool,
    pub voiceline: bool,
    pub gaze: bool,
}

impl RegionFlags {
    /// 全部启用
    pub fn all() -> Self {
        Self {
            headpat: true,
            voiceline: true,
            gaze: true,
        }
    }

    fn enabled(&self, id: RegionId) -> bool {
        match id {
            RegionId::Headpat => self.headpat,
            RegionId::Voiceline => self.voiceline,
            RegionId::Gaze => self.gaze,
        }
    }
}

/// 区域表
///
/// 构建时按优先级稳定排序，会话期间不变。
#[derive(Debug, Clone, PartialEq)]
pub struct RegionTable {
    regions: Vec<InteractiveRegion>,
}

impl RegionTable {
    pub fn new(mut regions: Vec<InteractiveRegion>) -> Self {
        regions.sort_by_key(|r| r.id);
        Self { regions }
    }

    /// 分类骨骼坐标点
    ///
    /// 没有显式区域命中时，若视线跟随启用则回退到 `Gaze`。
    pub fn classify(&self, p: Vec2, flags: RegionFlags) -> Option<RegionId> {
        self.regions
            .iter()
            .find(|r| flags.enabled(r.id) && r.contains(p))
            .map(|r| r.id)
            .or(flags.gaze.then_some(RegionId::Gaze))
    }

    /// 区域在屏幕上的矩形，仅供调试叠加层绘制
    pub fn screen_rects(&self, transform: &DisplayTransform) -> Vec<ScreenRect> {
        self.regions
            .iter()
            .map(|r| {
                let a = transform.to_screen_space(Vec2::new(r.x_min, r.y_min));
                let b = transform.to_screen_space(Vec2::new(r.x_max, r.y_max));
                ScreenRect {
                    x: a.x.min(b.x),
                    y: a.y.min(b.y),
                    width: (b.x - a.x).abs(),
                    height: (b.y - a.y).abs(),
                }
            })
            .collect()
    }
}

/// 默认区域布局
pub fn default_regions() -> Vec<InteractiveRegion> {
    vec![
        InteractiveRegion::new(RegionId::Headpat, 160.0, 840.0, 250.0, 1250.0),
        InteractiveRegion::new(RegionId::Voiceline, 1190.0, 2100.0, 100.0, 820.0),
    ]
}
