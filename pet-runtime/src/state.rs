//! # State 模块
//!
//! 交互状态、骨骼目标点与接收闸门（accept-guard）。
//!
//! ## 设计原则
//!
//! - 所有状态必须**显式建模**，由 `PetRuntime` 统一持有
//! - 闸门记录持有者，只有当前持有者能重新打开它
//! - 不允许隐式全局状态

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;

/// 当前交互模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractionMode {
    /// 空闲
    #[default]
    Idle,
    /// 正在摸头（拖动）
    Headpatting,
    /// 已按下语音区域，等待松开触发
    VoicelineArmed,
    /// 视线跟随指针
    GazeTracking,
}

/// 交互目标种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    /// 摸头控制点
    Pet,
    /// 视线控制点
    Gaze,
}

/// 骨骼目标点
///
/// `rest` 在加载时从骨骼读取，之后不再变化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigTargetPoint {
    /// 骨骼中的名称
    pub name: String,
    /// 静止位置
    pub rest: Vec2,
    /// 当前位置
    pub position: Vec2,
}

impl RigTargetPoint {
    pub fn new(name: impl Into<String>, rest: Vec2) -> Self {
        Self {
            name: name.into(),
            rest,
            position: rest,
        }
    }

    /// 是否位于静止位置
    pub fn is_at_rest(&self) -> bool {
        self.position == self.rest
    }
}

/// 闸门持有者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuardOwner {
    /// 开场动画
    Intro,
    /// 正在进行的手势
    Gesture,
    /// 回到静止位置的平滑循环
    Smoothing(TargetKind),
    /// 语音播放
    Dialog,
}

/// 接收闸门
///
/// 打开时允许开始新的手势。关闭时记录持有者，
/// 持有权可以转交，但只有当前持有者可以重新打开。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AcceptGuard {
    holder: Option<GuardOwner>,
}

impl AcceptGuard {
    /// 打开状态
    pub fn open() -> Self {
        Self { holder: None }
    }

    /// 由指定持有者关闭
    pub fn held_by(owner: GuardOwner) -> Self {
        Self {
            holder: Some(owner),
        }
    }

    pub fn is_open(&self) -> bool {
        self.holder.is_none()
    }

    pub fn holder(&self) -> Option<GuardOwner> {
        self.holder
    }

    /// 尝试关闭闸门；已关闭时失败
    pub(crate) fn try_close(&mut self, owner: GuardOwner) -> bool {
        if self.holder.is_some() {
            return false;
        }
        self.holder = Some(owner);
        true
    }

    /// 转交持有权
    pub(crate) fn hand_over(&mut self, from: GuardOwner, to: GuardOwner) -> bool {
        if self.holder != Some(from) {
            return false;
        }
        self.holder = Some(to);
        true
    }

    /// 由持有者重新打开
    pub(crate) fn release(&mut self, owner: GuardOwner) -> bool {
        if self.holder != Some(owner) {
            return false;
        }
        self.holder = None;
        true
    }
}
