//! # Stage 模块
//!
//! Command 执行器与舞台状态。
//!
//! ## 设计说明
//!
//! - `StageExecutor` 接收 `Command`，只更新 `StageState`，不播放任何声音
//! - 语音没有真实时长，按固定长度模拟结束，由 `finished_voices` 取出后回报 Runtime
//! - 动画轨道只记录名称队列，不做混合

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use pet_runtime::{Command, TargetKind, Timestamp, Vec2, VoiceId};

/// 轨道队列中的空动画
pub const EMPTY_ANIMATION: &str = "<empty>";

/// 单个动画轨道
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackState {
    /// 当前动画，`None` 表示空
    pub current: Option<String>,
    /// 排队中的动画
    pub queued: Vec<String>,
    /// 当前动画是否循环
    pub looping: bool,
}

/// 正在播放的语音
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceState {
    pub audio: String,
    pub volume: f32,
    /// 模拟结束时间
    pub ends_at: Timestamp,
}

/// 背景音乐
#[derive(Debug, Clone, PartialEq)]
pub struct BgmState {
    pub path: String,
    pub looping: bool,
    pub volume: f32,
}

/// 舞台状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageState {
    pub tracks: BTreeMap<usize, TrackState>,
    pub targets: HashMap<TargetKind, Vec2>,
    pub voices: BTreeMap<VoiceId, VoiceState>,
    pub captions: BTreeMap<VoiceId, String>,
    /// 字幕框位置（屏幕百分比）
    pub caption_position: Option<(f32, f32)>,
    pub bgm: Option<BgmState>,
}

impl StageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, track: usize) -> Option<&TrackState> {
        self.tracks.get(&track)
    }
}

/// Command 执行器
#[derive(Debug, Clone)]
pub struct StageExecutor {
    /// 模拟的语音长度（毫秒）
    voice_length_ms: u64,
    /// 已执行的指令数
    executed: usize,
}

impl StageExecutor {
    pub fn new(voice_length_ms: u64) -> Self {
        Self {
            voice_length_ms,
            executed: 0,
        }
    }

    pub fn executed(&self) -> usize {
        self.executed
    }

    /// 执行单个 Command
    pub fn execute(&mut self, command: &Command, state: &mut StageState, now: Timestamp) {
        self.executed += 1;

        match command {
            Command::SetAnimation {
                track,
                animation,
                looping,
                ..
            } => {
                let t = state.tracks.entry(*track).or_default();
                t.current = Some(animation.clone());
                t.looping = *looping;
                t.queued.clear();
            }
            Command::AddAnimation {
                track, animation, ..
            } => {
                state
                    .tracks
                    .entry(*track)
                    .or_default()
                    .queued
                    .push(animation.clone());
            }
            Command::SetEmptyAnimation { track, .. } => {
                let t = state.tracks.entry(*track).or_default();
                t.current = None;
                t.looping = false;
                t.queued.clear();
            }
            Command::AddEmptyAnimation { track, .. } => {
                state
                    .tracks
                    .entry(*track)
                    .or_default()
                    .queued
                    .push(EMPTY_ANIMATION.to_string());
            }
            Command::MoveTarget { target, x, y } => {
                state.targets.insert(*target, Vec2::new(*x, *y));
            }
            Command::PlayVoice {
                voice,
                audio,
                volume,
            } => {
                state.voices.insert(
                    *voice,
                    VoiceState {
                        audio: audio.clone(),
                        volume: *volume,
                        ends_at: now + self.voice_length_ms,
                    },
                );
            }
            Command::ShowCaption { voice, text } => {
                state.captions.insert(*voice, text.clone());
            }
            Command::HideCaption { voice } => {
                state.captions.remove(voice);
            }
            Command::SetCaptionPosition {
                x_percent,
                y_percent,
            } => {
                state.caption_position = Some((*x_percent, *y_percent));
            }
            Command::PlayBgm {
                path,
                looping,
                volume,
            } => {
                state.bgm = Some(BgmState {
                    path: path.clone(),
                    looping: *looping,
                    volume: *volume,
                });
            }
            Command::SetBgmVolume { volume } => {
                if let Some(bgm) = &mut state.bgm {
                    bgm.volume = *volume;
                } else {
                    debug!(volume, "没有 BGM，忽略音量变更");
                }
            }
        }
    }

    /// 批量执行
    pub fn execute_batch(&mut self, commands: &[Command], state: &mut StageState, now: Timestamp) {
        for command in commands {
            self.execute(command, state, now);
        }
    }

    /// 取出 `now` 之前已结束的语音
    pub fn finished_voices(&self, state: &mut StageState, now: Timestamp) -> Vec<VoiceId> {
        let ended: Vec<VoiceId> = state
            .voices
            .iter()
            .filter(|(_, v)| v.ends_at <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &ended {
            state.voices.remove(id);
        }
        ended
    }
}
