//! # Headless Host
//!
//! 无窗口、无音频设备的宿主层，用于回放指针轨迹、调试交互手感。
//!
//! Host 层负责：
//! - 加载角色档案、用户选项、语音库与指针轨迹
//! - 按帧间隔推进 Runtime 时钟并投递输入
//! - 将 Runtime 的 Command 应用到舞台状态（`StageState`）
//! - 模拟语音播放结束并回报 `VoiceEnded`
//!
//! Host 层不包含交互逻辑，只负责执行 Runtime 发出的 Command。

pub mod stage;
pub mod trace;

pub use stage::{BgmState, StageExecutor, StageState, TrackState, VoiceState};
pub use trace::{PointerTrace, TraceEvent};
