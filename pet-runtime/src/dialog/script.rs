//! 语音脚本数据
//!
//! 语音库是预先编排好的静态数据：每条语音有总时长和若干片段，
//! 片段带起始偏移、音频引用和按语言索引的字幕。

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;

/// 语音片段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSegment {
    /// 相对触发时刻的起始偏移（毫秒）
    pub start_offset_ms: u64,
    /// 音频引用
    pub audio: String,
    /// 片段时长（毫秒）
    ///
    /// 有值时由 Runtime 在结束时隐藏字幕；否则等待 Host 回报 `VoiceEnded`。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// 语言 -> 字幕
    #[serde(default)]
    pub captions: BTreeMap<String, String>,
}

impl VoiceSegment {
    pub fn new(start_offset_ms: u64, audio: impl Into<String>) -> Self {
        Self {
            start_offset_ms,
            audio: audio.into(),
            duration_ms: None,
            captions: BTreeMap::new(),
        }
    }

    /// 添加一种语言的字幕
    pub fn with_caption(mut self, language: impl Into<String>, text: impl Into<String>) -> Self {
        self.captions.insert(language.into(), text.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// 指定语言的字幕
    pub fn caption(&self, language: &str) -> Option<&str> {
        self.captions.get(language).map(String::as_str)
    }
}

/// 单条语音
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicelineScript {
    /// 总时长（毫秒），到时推进序号并打开闸门
    pub total_duration_ms: u64,
    /// 按起始时间排列的片段
    pub segments: Vec<VoiceSegment>,
}

impl VoicelineScript {
    pub fn new(total_duration_ms: u64, segments: Vec<VoiceSegment>) -> Self {
        Self {
            total_duration_ms,
            segments,
        }
    }
}

/// 语音库
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicelineLibrary {
    /// 开场语音
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_voice: Option<String>,
    /// 按序号排列的语音（序号从 1 开始）
    #[serde(default)]
    pub lines: Vec<VoicelineScript>,
}

impl VoicelineLibrary {
    pub fn new(lines: Vec<VoicelineScript>) -> Self {
        Self {
            intro_voice: None,
            lines,
        }
    }

    /// 从 JSON 字符串解析
    pub fn from_json(content: &str) -> Result<Self, ScriptError> {
        serde_json::from_str(content).map_err(|e| ScriptError::Parse(e.to_string()))
    }

    /// 从文件加载并验证
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ScriptError::Io(format!("{}: {}", path.display(), e)))?;
        let library = Self::from_json(&content)?;
        library.validate()?;
        Ok(library)
    }

    /// 验证：每条语音至少一个片段，片段起始不超过总时长
    pub fn validate(&self) -> Result<(), ScriptError> {
        for (i, line) in self.lines.iter().enumerate() {
            let index = i + 1;
            if line.segments.is_empty() {
                return Err(ScriptError::EmptyScript { index });
            }
            for (j, segment) in line.segments.iter().enumerate() {
                if segment.start_offset_ms > line.total_duration_ms {
                    return Err(ScriptError::SegmentOutOfRange {
                        index,
                        segment: j + 1,
                        start_ms: segment.start_offset_ms,
                        total_ms: line.total_duration_ms,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// 按 1 起始的序号获取
    pub fn get(&self, index: usize) -> Option<&VoicelineScript> {
        index.checked_sub(1).and_then(|i| self.lines.get(i))
    }
}
