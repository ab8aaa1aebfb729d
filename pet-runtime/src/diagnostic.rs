//! # 诊断模块
//!
//! 语音库静态检查，不依赖 IO。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - `validate()` 只报告第一个错误；这里收集全部问题，供 xtask 批量检查

use std::collections::{BTreeSet, HashMap};

use crate::dialog::VoicelineLibrary;

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 语音库 ID / 文件路径
    pub library_id: String,
    /// 语音序号（从 1 开始）
    pub line: Option<usize>,
    /// 片段序号（从 1 开始）
    pub segment: Option<usize>,
    /// 诊断消息
    pub message: String,
    /// 诊断详情
    pub detail: Option<String>,
}

impl Diagnostic {
    fn with_level(
        level: DiagnosticLevel,
        library_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            library_id: library_id.into(),
            line: None,
            segment: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建错误诊断
    pub fn error(library_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, library_id, message)
    }

    /// 创建警告诊断
    pub fn warn(library_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warn, library_id, message)
    }

    /// 创建信息诊断
    pub fn info(library_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, library_id, message)
    }

    /// 设置语音序号
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// 设置片段序号
    pub fn with_segment(mut self, segment: usize) -> Self {
        self.segment = Some(segment);
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.library_id)?;
        if let Some(line) = self.line {
            write!(f, "#{}", line)?;
        }
        if let Some(segment) = self.segment {
            write!(f, ".{}", segment)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    /// 诊断条目列表
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    /// 创建空结果
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加诊断
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    /// 获取错误数量
    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    /// 获取警告数量
    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// 分析语音库，返回诊断结果
///
/// 执行以下检查：
/// - Error：没有片段的语音；起始时间超出总时长的片段
/// - Warn：声明时长越过总时长的片段；只在部分片段出现的字幕语言；重复的音频引用
/// - Info：没有开场语音
pub fn analyze_library(library_id: &str, library: &VoicelineLibrary) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();

    if library.intro_voice.is_none() {
        result.push(Diagnostic::info(library_id, "没有开场语音"));
    }

    // 所有片段中出现过的语言
    let languages: BTreeSet<&str> = library
        .lines
        .iter()
        .flat_map(|l| &l.segments)
        .flat_map(|s| s.captions.keys().map(String::as_str))
        .collect();

    let mut seen_audio: HashMap<&str, (usize, usize)> = HashMap::new();

    for (i, line) in library.lines.iter().enumerate() {
        let index = i + 1;

        if line.segments.is_empty() {
            let diag = Diagnostic::error(library_id, "语音没有任何片段");
            result.push(diag.with_line(index));
            continue;
        }

        for (j, segment) in line.segments.iter().enumerate() {
            let seg_index = j + 1;

            if segment.start_offset_ms > line.total_duration_ms {
                result.push(
                    Diagnostic::error(library_id, "片段起始时间超出总时长")
                        .with_line(index)
                        .with_segment(seg_index)
                        .with_detail(format!(
                            "起始 {}ms > 总时长 {}ms",
                            segment.start_offset_ms, line.total_duration_ms
                        )),
                );
            } else if let Some(duration) = segment.duration_ms {
                let end = segment.start_offset_ms + duration;
                if end > line.total_duration_ms {
                    result.push(
                        Diagnostic::warn(library_id, "片段在语音结束后仍在播放")
                            .with_line(index)
                            .with_segment(seg_index)
                            .with_detail(format!(
                                "结束 {}ms > 总时长 {}ms",
                                end, line.total_duration_ms
                            )),
                    );
                }
            }

            let missing: Vec<&str> = languages
                .iter()
                .copied()
                .filter(|lang| !segment.captions.contains_key(*lang))
                .collect();
            if !missing.is_empty() {
                result.push(
                    Diagnostic::warn(library_id, "片段缺少部分语言的字幕")
                        .with_line(index)
                        .with_segment(seg_index)
                        .with_detail(missing.join(", ")),
                );
            }

            if let Some((first_line, first_segment)) =
                seen_audio.insert(segment.audio.as_str(), (index, seg_index))
            {
                result.push(
                    Diagnostic::warn(library_id, format!("重复的音频引用: **{}**", segment.audio))
                        .with_line(index)
                        .with_segment(seg_index)
                        .with_detail(format!("首次出现于 #{}.{}", first_line, first_segment)),
                );
            }
        }
    }

    result
}
