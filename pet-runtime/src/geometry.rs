//! # Geometry 模块
//!
//! 屏幕坐标与骨骼坐标（rig-space）之间的映射。
//!
//! ## 坐标系
//!
//! - **屏幕坐标**：显示表面的像素坐标，原点在左上角，尺寸随窗口变化
//! - **骨骼坐标**：角色与交互区域的设计坐标，固定为 2560×1600
//!
//! ## 映射规则
//!
//! ```text
//! x' = mirrored ? W - x : x                 // 1. 镜像修正
//! rig = N / 2 + transpose * (x' - W / 2) / scale
//! ```
//!
//! - `transpose` 是沿主导轴的"每像素骨骼单位"，两轴共用同一个值，角色永不拉伸
//! - 主导轴由宽高比决定：`W/2560 < H/1600` 时取纵轴（`1600 / H`），反之取横轴（`2560 / W`）
//! - `to_screen_space` 是 `to_rig_space` 的精确逆运算，仅用于调试叠加层

use serde::{Deserialize, Serialize};

/// 骨骼坐标系的标称宽度
pub const NOMINAL_WIDTH: f32 = 2560.0;
/// 骨骼坐标系的标称高度
pub const NOMINAL_HEIGHT: f32 = 1600.0;

/// 二维向量
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    /// 创建新的向量
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// 零向量
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// 显示表面尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

impl SurfaceSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// 保证尺寸至少为 1 像素，避免除零
    fn sanitized(self) -> Self {
        let fix = |v: f32| if v.is_finite() && v >= 1.0 { v } else { 1.0 };
        Self {
            width: fix(self.width),
            height: fix(self.height),
        }
    }
}

/// 决定 transpose 的主导轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterboxAxis {
    /// 横轴主导：`transpose = nominal_w / W`
    Horizontal,
    /// 纵轴主导：`transpose = nominal_h / H`
    Vertical,
    /// 宽高比与标称一致，两轴结果相同
    None,
}

/// 屏幕矩形（调试叠加层使用）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// 显示变换
///
/// 每次表面尺寸、缩放或镜像设置变化时重新构建。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTransform {
    /// 用户缩放（已钳制为正数）
    pub scale: f32,
    /// 是否水平镜像
    pub mirrored: bool,
    /// 主导轴
    pub letterbox_axis: LetterboxAxis,
    /// 表面宽度（像素）
    pub surface_width: f32,
    /// 表面高度（像素）
    pub surface_height: f32,
    /// 骨骼坐标系标称尺寸
    pub nominal: Vec2,
    transpose: f32,
}

impl DisplayTransform {
    /// 构建显示变换
    ///
    /// `scale` 为零、负数或非有限值时钳制到 `min_scale`。
    pub fn new(
        surface: SurfaceSize,
        nominal: Vec2,
        scale: f32,
        mirrored: bool,
        min_scale: f32,
    ) -> Self {
        let surface = surface.sanitized();
        let min_scale = if min_scale.is_finite() && min_scale > 0.0 {
            min_scale
        } else {
            f32::EPSILON
        };
        let scale = if scale.is_finite() {
            scale.max(min_scale)
        } else {
            min_scale
        };

        let wr = surface.width / nominal.x;
        let hr = surface.height / nominal.y;
        let (letterbox_axis, transpose) = if wr < hr {
            (LetterboxAxis::Vertical, nominal.y / surface.height)
        } else if wr > hr {
            (LetterboxAxis::Horizontal, nominal.x / surface.width)
        } else {
            (LetterboxAxis::None, nominal.y / surface.height)
        };

        Self {
            scale,
            mirrored,
            letterbox_axis,
            surface_width: surface.width,
            surface_height: surface.height,
            nominal,
            transpose,
        }
    }

    /// 使用标称尺寸 2560×1600 构建
    pub fn with_default_nominal(surface: SurfaceSize, scale: f32, mirrored: bool) -> Self {
        Self::new(
            surface,
            Vec2::new(NOMINAL_WIDTH, NOMINAL_HEIGHT),
            scale,
            mirrored,
            f32::EPSILON,
        )
    }

    /// 每像素对应的骨骼单位
    pub fn transpose(&self) -> f32 {
        self.transpose
    }

    /// 表面尺寸
    pub fn surface(&self) -> SurfaceSize {
        SurfaceSize::new(self.surface_width, self.surface_height)
    }

    /// 镜像修正后的屏幕点
    pub fn unmirror(&self, screen: Vec2) -> Vec2 {
        if self.mirrored {
            Vec2::new(self.surface_width - screen.x, screen.y)
        } else {
            screen
        }
    }

    /// 镜像修正后的指针位移
    pub fn unmirror_delta(&self, delta: Vec2) -> Vec2 {
        if self.mirrored {
            Vec2::new(-delta.x, delta.y)
        } else {
            delta
        }
    }

    /// 屏幕坐标 -> 骨骼坐标
    pub fn to_rig_space(&self, screen: Vec2) -> Vec2 {
        let p = self.unmirror(screen);
        Vec2::new(
            self.axis_to_rig(p.x, self.surface_width, self.nominal.x),
            self.axis_to_rig(p.y, self.surface_height, self.nominal.y),
        )
    }

    /// 骨骼坐标 -> 屏幕坐标
    pub fn to_screen_space(&self, rig: Vec2) -> Vec2 {
        let p = Vec2::new(
            self.axis_to_screen(rig.x, self.surface_width, self.nominal.x),
            self.axis_to_screen(rig.y, self.surface_height, self.nominal.y),
        );
        self.unmirror(p)
    }

    /// 指针在表面上的归一化偏移，中心为 0，范围约 [-0.5, 0.5]
    pub fn centered_ratio(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            screen.x / self.surface_width - 0.5,
            screen.y / self.surface_height - 0.5,
        )
    }

    fn axis_to_rig(&self, value: f32, surface_len: f32, nominal_len: f32) -> f32 {
        let centered = value - surface_len / 2.0;
        nominal_len / 2.0 + centered * self.transpose / self.scale
    }

    fn axis_to_screen(&self, value: f32, surface_len: f32, nominal_len: f32) -> f32 {
        let centered = value - nominal_len / 2.0;
        surface_len / 2.0 + centered * self.scale / self.transpose
    }
}
