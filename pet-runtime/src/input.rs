//! # Input 模块
//!
//! 定义 Host 向 Runtime 传递的输入事件。
//!
//! ## 设计说明
//!
//! - 指针坐标是原始表面坐标，镜像修正由 Runtime 完成
//! - 时间流逝不作为输入，Host 通过 `tick(now, input)` 的时间戳推进
//! - 配置变更以宿主属性包（JSON）的形式传入，由 Runtime 解析

use serde::{Deserialize, Serialize};

use crate::command::VoiceId;
use crate::geometry::Vec2;

/// 指针采样（原始表面坐标）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub dx: f32,
    #[serde(default)]
    pub dy: f32,
}

impl PointerSample {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            dx: 0.0,
            dy: 0.0,
        }
    }

    pub fn moved(x: f32, y: f32, dx: f32, dy: f32) -> Self {
        Self { x, y, dx, dy }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn delta(&self) -> Vec2 {
        Vec2::new(self.dx, self.dy)
    }
}

/// Host 向 Runtime 传递的输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuntimeInput {
    /// 指针按下
    PointerDown(PointerSample),

    /// 指针移动
    PointerMove(PointerSample),

    /// 指针松开
    PointerUp,

    /// 语音播放结束
    VoiceEnded { voice: VoiceId },

    /// 显示表面尺寸变化
    Resize { width: f32, height: f32 },

    /// 宿主属性包（`{ key: { "value": v } }`）
    ApplyProperties(serde_json::Value),
}

impl RuntimeInput {
    pub fn down(x: f32, y: f32) -> Self {
        Self::PointerDown(PointerSample::at(x, y))
    }

    pub fn moved(x: f32, y: f32, dx: f32, dy: f32) -> Self {
        Self::PointerMove(PointerSample::moved(x, y, dx, dy))
    }

    pub fn up() -> Self {
        Self::PointerUp
    }
}
