//! # Config 模块
//!
//! 运行时配置，分为两层：
//!
//! - [`RigProfile`]：角色档案。骨骼名称、动画名、交互区域和各种手感常量，
//!   随角色资源一起发布，运行期间不变
//! - [`RuntimeOptions`]：宿主桥接的用户选项，随时可改，下次使用时生效
//!
//! 所有字段都有默认值，缺省的 JSON 字段按默认值补齐。

mod options;

pub use options::{OptionChange, RuntimeOptions};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::geometry::{NOMINAL_HEIGHT, NOMINAL_WIDTH, Vec2};
use crate::region::{InteractiveRegion, default_regions};

/// 角色档案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigProfile {
    /// 角色 ID
    #[serde(default = "default_character")]
    pub character: String,

    /// 骨骼坐标系标称尺寸
    #[serde(default = "default_nominal_size")]
    pub nominal_size: Vec2,

    /// 最小缩放，用户缩放低于它时钳制
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,

    /// 交互目标点名称
    #[serde(default)]
    pub targets: TargetNames,

    /// 叠加轨道（`_A` 动画）是否存在
    #[serde(default)]
    pub overlay_tracks: OverlayTracks,

    /// 动画名称
    #[serde(default)]
    pub animations: AnimationNames,

    /// 交互区域（骨骼坐标）
    #[serde(default = "default_regions")]
    pub regions: Vec<InteractiveRegion>,

    /// 定时参数
    #[serde(default)]
    pub timing: TimingConfig,

    /// 摸头手感
    #[serde(default)]
    pub headpat: HeadpatTuning,

    /// 视线手感
    #[serde(default)]
    pub gaze: GazeTuning,

    /// 开场参数
    #[serde(default)]
    pub intro: IntroConfig,
}

/// 交互目标点名称
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetNames {
    pub pet: String,
    pub gaze: String,
}

impl Default for TargetNames {
    fn default() -> Self {
        Self {
            pet: "Touch_Point".to_string(),
            gaze: "Touch_Eye".to_string(),
        }
    }
}

/// 叠加轨道可用性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayTracks {
    /// 摸头叠加动画
    pub point: bool,
    /// 视线叠加动画
    pub eye: bool,
}

impl Default for OverlayTracks {
    fn default() -> Self {
        Self {
            point: true,
            eye: false,
        }
    }
}

/// 动画名称
///
/// `talk` / `talk_overlay` 中的 `{n}` 会替换为语音序号。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationNames {
    pub idle: String,
    pub intro: String,
    pub pat: String,
    pub pat_overlay: String,
    pub pat_end: String,
    pub pat_end_overlay: String,
    pub look: String,
    pub look_overlay: String,
    pub look_end: String,
    pub look_end_overlay: String,
    pub talk: String,
    pub talk_overlay: String,
}

impl Default for AnimationNames {
    fn default() -> Self {
        Self {
            idle: "Idle_01".to_string(),
            intro: "Start_Idle_01".to_string(),
            pat: "Pat_01_M".to_string(),
            pat_overlay: "Pat_01_A".to_string(),
            pat_end: "PatEnd_01_M".to_string(),
            pat_end_overlay: "PatEnd_01_A".to_string(),
            look: "Look_01_M".to_string(),
            look_overlay: "Look_01_A".to_string(),
            look_end: "LookEnd_01_M".to_string(),
            look_end_overlay: "LookEnd_01_A".to_string(),
            talk: "Talk_0{n}_M".to_string(),
            talk_overlay: "Talk_0{n}_A".to_string(),
        }
    }
}

impl AnimationNames {
    /// 第 `index` 条语音的 (主轨, 叠加轨) 动画名
    pub fn talk_for(&self, index: usize) -> (String, String) {
        let n = index.to_string();
        (
            self.talk.replace("{n}", &n),
            self.talk_overlay.replace("{n}", &n),
        )
    }
}

/// 定时参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// 视线跟随与平滑循环的周期（毫秒）
    pub tick_period_ms: u64,
    /// 平滑循环收敛后到闸门重新打开的等待（毫秒）
    pub settle_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 20,
            settle_delay_ms: 500,
        }
    }
}

/// 摸头手感
///
/// `split_x` / `split_y` 是屏幕像素坐标下的象限分界，
/// 用来把"画圈"近似成上下摆动。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadpatTuning {
    pub step: f32,
    pub clamp: f32,
    pub split_x: f32,
    pub split_y: f32,
}

impl Default for HeadpatTuning {
    fn default() -> Self {
        Self {
            step: 5.0,
            clamp: 30.0,
            split_x: 1440.0,
            split_y: 800.0,
        }
    }
}

/// 视线手感
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeTuning {
    pub step: f32,
    pub clamp_x: f32,
    pub clamp_y: f32,
}

impl Default for GazeTuning {
    fn default() -> Self {
        Self {
            step: 10.0,
            clamp_x: 200.0,
            clamp_y: 200.0 * (9.0 / 16.0),
        }
    }
}

/// 开场参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntroConfig {
    /// 开场语音延迟（毫秒）
    pub voice_delay_ms: u64,
    /// 开场结束、允许交互的时间（毫秒）
    pub unlock_after_ms: u64,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            voice_delay_ms: 11_500,
            unlock_after_ms: 19_500,
        }
    }
}

// 默认值函数
fn default_character() -> String {
    "CH0221".to_string()
}

fn default_nominal_size() -> Vec2 {
    Vec2::new(NOMINAL_WIDTH, NOMINAL_HEIGHT)
}

fn default_min_scale() -> f32 {
    0.1
}

impl Default for RigProfile {
    fn default() -> Self {
        Self {
            character: default_character(),
            nominal_size: default_nominal_size(),
            min_scale: default_min_scale(),
            targets: TargetNames::default(),
            overlay_tracks: OverlayTracks::default(),
            animations: AnimationNames::default(),
            regions: default_regions(),
            timing: TimingConfig::default(),
            headpat: HeadpatTuning::default(),
            gaze: GazeTuning::default(),
            intro: IntroConfig::default(),
        }
    }
}

impl RigProfile {
    /// 从 JSON 字符串解析
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 从文件加载并验证
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let profile = Self::from_json(&content)?;
        profile.validate()?;
        Ok(profile)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nominal_size.x <= 0.0 || self.nominal_size.y <= 0.0 {
            return Err(ConfigError::Validation("标称尺寸必须为正数".to_string()));
        }

        if self.min_scale <= 0.0 {
            return Err(ConfigError::Validation("min_scale 必须为正数".to_string()));
        }

        if self.timing.tick_period_ms == 0 {
            return Err(ConfigError::Validation(
                "tick_period_ms 必须大于 0".to_string(),
            ));
        }

        if self.headpat.step <= 0.0 || self.gaze.step <= 0.0 {
            return Err(ConfigError::Validation("步长必须为正数".to_string()));
        }

        if self.headpat.clamp < 0.0 || self.gaze.clamp_x < 0.0 || self.gaze.clamp_y < 0.0 {
            return Err(ConfigError::Validation("钳制范围不能为负数".to_string()));
        }

        for region in &self.regions {
            if region.x_min >= region.x_max || region.y_min >= region.y_max {
                return Err(ConfigError::Validation(format!(
                    "区域 {:?} 的边界无效",
                    region.id
                )));
            }
        }

        Ok(())
    }
}
