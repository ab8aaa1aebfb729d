//! # Command 模块
//!
//! 定义 Runtime 向 Host 发出的所有指令。
//! Command 是 Runtime 与 Host 之间的**唯一通信方式**。
//!
//! ## 设计原则
//!
//! - **声明式**：Command 描述"做什么"，不描述"怎么做"
//! - **无副作用**：Command 本身不执行任何操作
//! - **引擎无关**：动画只以名称引用，Runtime 不关心骨骼动画内部

use serde::{Deserialize, Serialize};

use crate::state::TargetKind;

/// 语音播放实例标识
///
/// 每次播放片段分配一个新的 ID，Host 播放结束时用它回报 `VoiceEnded`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoiceId(pub u64);

/// Runtime 向 Host 发出的指令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// 立即切换轨道动画
    SetAnimation {
        track: usize,
        animation: String,
        looping: bool,
        /// 混合时长（秒），`None` 使用骨骼默认值
        mix_duration: Option<f32>,
    },

    /// 在轨道末尾排队动画
    AddAnimation {
        track: usize,
        animation: String,
        looping: bool,
        /// 延迟（秒）
        delay: f32,
        mix_duration: Option<f32>,
    },

    /// 立即把轨道混合到空动画
    SetEmptyAnimation { track: usize, mix_duration: f32 },

    /// 在轨道末尾排队空动画
    AddEmptyAnimation {
        track: usize,
        mix_duration: f32,
        delay: f32,
    },

    /// 更新骨骼目标点位置（骨骼局部坐标）
    MoveTarget { target: TargetKind, x: f32, y: f32 },

    /// 播放语音
    PlayVoice {
        voice: VoiceId,
        audio: String,
        /// 音量 (0.0 - 1.0)
        volume: f32,
    },

    /// 显示（或替换）字幕
    ShowCaption { voice: VoiceId, text: String },

    /// 隐藏字幕
    HideCaption { voice: VoiceId },

    /// 字幕框位置（屏幕百分比）
    SetCaptionPosition { x_percent: f32, y_percent: f32 },

    /// 播放 BGM
    PlayBgm {
        path: String,
        looping: bool,
        volume: f32,
    },

    /// 调整 BGM 音量
    SetBgmVolume { volume: f32 },
}

impl Command {
    /// `SetAnimation` 简写
    pub fn set_animation(track: usize, animation: impl Into<String>, looping: bool) -> Self {
        Self::SetAnimation {
            track,
            animation: animation.into(),
            looping,
            mix_duration: None,
        }
    }

    /// `AddAnimation` 简写
    pub fn add_animation(
        track: usize,
        animation: impl Into<String>,
        looping: bool,
        delay: f32,
    ) -> Self {
        Self::AddAnimation {
            track,
            animation: animation.into(),
            looping,
            delay,
            mix_duration: None,
        }
    }

    /// 指定混合时长（仅对 `SetAnimation`/`AddAnimation` 生效）
    pub fn with_mix(mut self, mix: f32) -> Self {
        match &mut self {
            Self::SetAnimation { mix_duration, .. } | Self::AddAnimation { mix_duration, .. } => {
                *mix_duration = Some(mix);
            }
            _ => {}
        }
        self
    }
}
