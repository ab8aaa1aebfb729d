//! # Error 模块
//!
//! 定义 pet-runtime 中使用的错误类型。

use thiserror::Error;

/// 运行时错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// 骨骼中找不到必需的交互目标点
    #[error("骨骼中找不到交互目标 '{name}'")]
    MissingTarget { name: String },
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 读取失败
    #[error("配置 IO 错误: {0}")]
    Io(String),

    /// JSON 解析失败
    #[error("配置解析失败: {0}")]
    Parse(String),

    /// 配置值不合法
    #[error("配置验证失败: {0}")]
    Validation(String),
}

/// 语音脚本错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// 读取失败
    #[error("语音脚本 IO 错误: {0}")]
    Io(String),

    /// JSON 解析失败
    #[error("语音脚本解析失败: {0}")]
    Parse(String),

    /// 脚本没有任何片段
    #[error("第 {index} 条语音没有任何片段")]
    EmptyScript { index: usize },

    /// 片段起始时间超出总时长
    #[error("第 {index} 条语音的第 {segment} 个片段起始于 {start_ms}ms，超出总时长 {total_ms}ms")]
    SegmentOutOfRange {
        index: usize,
        segment: usize,
        start_ms: u64,
        total_ms: u64,
    },
}
