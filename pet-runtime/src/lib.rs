//! # Pet Runtime
//!
//! 大厅角色指针交互的核心运行时库。
//!
//! ## 架构概述
//!
//! `pet-runtime` 是纯逻辑核心，不依赖任何 IO、音频或渲染引擎。
//! 它通过 **命令驱动模式** 与宿主层（Host）通信：
//!
//! ```text
//! Host                          Runtime
//!   │                              │
//!   │──── (now, RuntimeInput) ───►│
//!   │                              │ tick()
//!   │◄─── Vec<Command> ───────────│
//!   │                              │
//! ```
//!
//! 时间由 Host 以毫秒时间戳推进，所有定时行为（视线跟随、平滑回位、
//! 语音片段）都在 Runtime 内部的虚拟时钟上调度，测试无需真实等待。
//!
//! ## 核心类型
//!
//! - [`PetRuntime`]：交互引擎
//! - [`Command`]：Runtime 向 Host 发出的指令
//! - [`RuntimeInput`]：Host 向 Runtime 传递的输入
//! - [`RigBinding`]：骨骼查询接口
//!
//! ## 模块结构
//!
//! - [`geometry`]：屏幕坐标与骨骼坐标映射
//! - [`region`]：交互区域与命中分类
//! - [`scheduler`]：虚拟时钟上的定时器队列
//! - [`smoothing`]：回到静止位置的平滑循环
//! - [`dialog`]：语音库与语音序列器
//! - [`config`]：角色档案与用户选项
//! - [`diagnostic`]：语音库静态检查
//! - [`runtime`]：交互引擎

pub mod command;
pub mod config;
pub mod diagnostic;
pub mod dialog;
pub mod error;
pub mod geometry;
pub mod input;
pub mod region;
pub mod rig;
pub mod runtime;
pub mod scheduler;
pub mod smoothing;
pub mod state;

// 重导出核心类型
pub use command::{Command, VoiceId};
pub use config::{OptionChange, RigProfile, RuntimeOptions};
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticResult, analyze_library};
pub use dialog::{DialogSequencer, VoiceSegment, VoicelineLibrary, VoicelineScript};
pub use error::{ConfigError, RuntimeError, ScriptError};
pub use geometry::{DisplayTransform, LetterboxAxis, ScreenRect, SurfaceSize, Vec2};
pub use input::{PointerSample, RuntimeInput};
pub use region::{InteractiveRegion, RegionFlags, RegionId, RegionTable};
pub use rig::{RigBinding, StaticRig};
pub use runtime::PetRuntime;
pub use scheduler::Timestamp;
pub use state::{AcceptGuard, GuardOwner, InteractionMode, RigTargetPoint, TargetKind};
