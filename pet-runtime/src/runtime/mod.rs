//! # Runtime 模块
//!
//! 指针交互引擎核心，负责手势状态机、定时任务与语音序列的编排。
//!
//! ## 模块结构
//!
//! - [`engine`]：核心引擎 `PetRuntime` 与定时事件分发
//! - [`gesture`]：指针事件处理与手势步进函数

pub mod engine;
pub mod gesture;

pub use engine::PetRuntime;

use serde::{Deserialize, Serialize};

use crate::dialog::DialogEvent;
use crate::state::{GuardOwner, TargetKind};

/// 引擎内部的定时事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerEvent {
    /// 视线跟随周期
    GazeTrack,
    /// 平滑循环周期
    Smoothing(TargetKind),
    /// 收敛后的等待结束，由持有者打开闸门
    Settle(GuardOwner),
    /// 开场语音
    IntroVoice,
    /// 开场结束
    IntroUnlock,
    /// 语音序列事件
    Dialog(DialogEvent),
}

impl From<DialogEvent> for TimerEvent {
    fn from(event: DialogEvent) -> Self {
        Self::Dialog(event)
    }
}
