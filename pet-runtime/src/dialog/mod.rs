//! # Dialog 模块
//!
//! 语音序列器：按序号播放语音，调度片段的音频与字幕，结束后推进序号。
//!
//! ## 时序
//!
//! ```text
//! trigger ── startOffset[0] ──> SegmentStart(0) ── duration ──> SegmentEnd
//!         ── startOffset[1] ──> SegmentStart(1) ...
//!         ── totalDuration ───> Complete（序号 +1，闸门由持有者打开）
//! ```
//!
//! 片段之间可以重叠，每个片段是独立的播放实例（`VoiceId`）。

mod script;

pub use script::{VoiceSegment, VoicelineLibrary, VoicelineScript};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::{Command, VoiceId};
use crate::config::{AnimationNames, RuntimeOptions};
use crate::scheduler::Scheduler;

/// 语音定时事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogEvent {
    /// 第 `line` 条语音的第 `segment` 个片段开始（`segment` 从 0 开始）
    SegmentStart { line: usize, segment: usize },
    /// 片段按声明时长结束
    SegmentEnd { voice: VoiceId },
    /// 整条语音结束
    Complete,
}

/// 正在播放的片段
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlayingSegment {
    voice: VoiceId,
    line: usize,
    segment: usize,
    /// 字幕当前是否可见
    caption_shown: bool,
}

/// 语音序列器
#[derive(Debug)]
pub struct DialogSequencer {
    /// 下一次触发的序号（从 1 开始）
    current: usize,
    playing: Vec<PlayingSegment>,
    running: bool,
    next_voice: u64,
}

impl Default for DialogSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogSequencer {
    pub fn new() -> Self {
        Self {
            current: 1,
            playing: Vec::new(),
            running: false,
            next_voice: 1,
        }
    }

    /// 下一次触发的序号
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// 是否有语音序列在进行
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// 正在播放的语音实例
    pub fn playing_voices(&self) -> Vec<VoiceId> {
        self.playing.iter().map(|p| p.voice).collect()
    }

    /// 分配一个新的语音实例 ID
    pub fn allocate_voice(&mut self) -> VoiceId {
        let voice = VoiceId(self.next_voice);
        self.next_voice += 1;
        voice
    }

    /// 触发当前序号的语音
    ///
    /// 返回动画指令，并为每个片段和整条语音的结束排队定时事件。
    /// 语音库为空时不做任何事，返回 `None`。
    pub fn trigger<E>(
        &mut self,
        library: &VoicelineLibrary,
        animations: &AnimationNames,
        scheduler: &mut Scheduler<E>,
    ) -> Option<Vec<Command>>
    where
        E: From<DialogEvent> + Clone,
    {
        if library.is_empty() {
            return None;
        }

        let index = self.current.clamp(1, library.len());
        self.current = index;
        let script = library.get(index)?;
        let (talk, talk_overlay) = animations.talk_for(index);

        debug!(index, segments = script.segments.len(), "触发语音");

        let commands = vec![
            Command::SetEmptyAnimation {
                track: 1,
                mix_duration: 1.0,
            },
            Command::SetEmptyAnimation {
                track: 2,
                mix_duration: 1.0,
            },
            Command::add_animation(1, talk, false, 0.0),
            Command::add_animation(2, talk_overlay, false, 0.0),
            Command::AddEmptyAnimation {
                track: 1,
                mix_duration: 0.5,
                delay: 0.0,
            },
            Command::AddEmptyAnimation {
                track: 2,
                mix_duration: 0.5,
                delay: 0.0,
            },
        ];

        for (segment, seg) in script.segments.iter().enumerate() {
            scheduler.once(
                seg.start_offset_ms,
                DialogEvent::SegmentStart {
                    line: index,
                    segment,
                }
                .into(),
            );
        }
        scheduler.once(script.total_duration_ms, DialogEvent::Complete.into());
        self.running = true;

        Some(commands)
    }

    /// 片段开始：播放音频，按需显示字幕
    pub fn on_segment_start<E>(
        &mut self,
        line: usize,
        segment: usize,
        library: &VoicelineLibrary,
        options: &RuntimeOptions,
        scheduler: &mut Scheduler<E>,
    ) -> Vec<Command>
    where
        E: From<DialogEvent> + Clone,
    {
        let Some(seg) = library.get(line).and_then(|s| s.segments.get(segment)) else {
            debug!(line, segment, "片段不存在，忽略");
            return Vec::new();
        };

        let voice = self.allocate_voice();
        let mut commands = vec![Command::PlayVoice {
            voice,
            audio: seg.audio.clone(),
            volume: options.voice_volume,
        }];

        let caption = options
            .show_captions
            .then(|| seg.caption(&options.language))
            .flatten();
        if let Some(text) = caption {
            commands.push(Command::ShowCaption {
                voice,
                text: text.to_string(),
            });
        }

        self.playing.push(PlayingSegment {
            voice,
            line,
            segment,
            caption_shown: caption.is_some(),
        });

        if let Some(duration) = seg.duration_ms {
            scheduler.once(duration, DialogEvent::SegmentEnd { voice }.into());
        }

        commands
    }

    /// 片段结束（定时或 Host 回报），重复结束是空操作
    pub fn on_segment_end(&mut self, voice: VoiceId) -> Vec<Command> {
        let Some(pos) = self.playing.iter().position(|p| p.voice == voice) else {
            return Vec::new();
        };
        let ended = self.playing.remove(pos);
        if ended.caption_shown {
            vec![Command::HideCaption { voice }]
        } else {
            Vec::new()
        }
    }

    /// 整条语音结束：移除本条语音残留的片段，推进序号（钳制到语音数）
    ///
    /// 没有声明时长、宿主也没有回报结束的片段在这里移除，可见的字幕一并隐藏。
    pub fn on_complete(&mut self, count: usize) -> Vec<Command> {
        let line = self.current;
        let before = self.playing.len();
        let mut commands = Vec::new();
        self.playing.retain(|p| {
            if p.line != line {
                return true;
            }
            if p.caption_shown {
                commands.push(Command::HideCaption { voice: p.voice });
            }
            false
        });
        let stale = before - self.playing.len();
        if stale > 0 {
            debug!(line, stale, "移除未回报结束的片段");
        }

        self.running = false;
        self.current = (self.current + 1).min(count.max(1));
        commands
    }

    /// 按当前语言与可见性重新渲染所有正在播放片段的字幕
    pub fn rerender_captions(
        &mut self,
        library: &VoicelineLibrary,
        options: &RuntimeOptions,
    ) -> Vec<Command> {
        let mut commands = Vec::new();
        for playing in &mut self.playing {
            let text = options
                .show_captions
                .then(|| {
                    library
                        .get(playing.line)
                        .and_then(|s| s.segments.get(playing.segment))
                        .and_then(|seg| seg.caption(&options.language))
                })
                .flatten();

            match text {
                Some(text) => {
                    commands.push(Command::ShowCaption {
                        voice: playing.voice,
                        text: text.to_string(),
                    });
                    playing.caption_shown = true;
                }
                None if playing.caption_shown => {
                    commands.push(Command::HideCaption {
                        voice: playing.voice,
                    });
                    playing.caption_shown = false;
                }
                None => {}
            }
        }
        commands
    }
}
