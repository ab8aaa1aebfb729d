//! 宿主桥接选项
//!
//! 宿主以 `{ key: { "value": v } }` 的属性包推送用户设置，每次只包含改动的键。
//! 这里把字符串键映射为强类型字段；未知键与类型不符的值直接忽略。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::region::RegionFlags;

/// 用户选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    /// 启用摸头
    pub headpatting: bool,
    /// 启用语音
    pub voicelines: bool,
    /// 启用视线跟随
    pub mouse_tracking: bool,
    /// 绘制调试碰撞框
    pub draw_hitboxes: bool,
    /// 用户缩放
    pub scale: f32,
    /// 水平镜像
    pub mirrored: bool,
    /// 目标帧率
    pub target_fps: u32,
    /// 显示字幕
    pub show_captions: bool,
    /// 字幕框横向位置（百分比）
    pub caption_x: f32,
    /// 字幕框纵向位置（百分比）
    pub caption_y: f32,
    /// 字幕语言
    pub language: String,
    /// 语音音量 (0.0 - 1.0)
    pub voice_volume: f32,
    /// 播放开场动画
    pub intro_animation: bool,
    /// BGM 文件
    pub bgm_file: Option<String>,
    /// BGM 音量 (0.0 - 1.0)
    pub bgm_volume: f32,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            headpatting: true,
            voicelines: true,
            mouse_tracking: true,
            draw_hitboxes: false,
            scale: 1.0,
            mirrored: false,
            target_fps: 60,
            show_captions: false,
            caption_x: 50.0,
            caption_y: 85.0,
            language: "Japanese".to_string(),
            voice_volume: 0.5,
            intro_animation: false,
            bgm_file: None,
            bgm_volume: 0.0,
        }
    }
}

/// 已生效的选项变更
#[derive(Debug, Clone, PartialEq)]
pub enum OptionChange {
    Headpatting(bool),
    Voicelines(bool),
    MouseTracking(bool),
    DrawHitboxes(bool),
    Scale(f32),
    Mirrored(bool),
    TargetFps(u32),
    ShowCaptions(bool),
    CaptionPosition { x: f32, y: f32 },
    Language(String),
    VoiceVolume(f32),
    IntroAnimation(bool),
    BgmFile(String),
    BgmVolume(f32),
}

impl RuntimeOptions {
    /// 手势开关
    pub fn region_flags(&self) -> RegionFlags {
        RegionFlags {
            headpat: self.headpatting,
            voiceline: self.voicelines,
            gaze: self.mouse_tracking,
        }
    }

    /// 每帧间隔（毫秒），至少 1
    pub fn frame_interval_ms(&self) -> u64 {
        (1000 / u64::from(self.target_fps.max(1))).max(1)
    }

    /// 应用宿主属性包，返回实际生效的变更
    pub fn apply_user_properties(&mut self, props: &Value) -> Vec<OptionChange> {
        let Some(map) = props.as_object() else {
            debug!(props = %props, "属性包不是对象，忽略");
            return Vec::new();
        };

        map.iter()
            .filter_map(|(key, prop)| {
                let value = prop.get("value").unwrap_or(prop);
                self.apply_property(key, value)
            })
            .collect()
    }

    /// 应用单个属性
    pub fn apply_property(&mut self, key: &str, value: &Value) -> Option<OptionChange> {
        let change = match key {
            "headpatting" => as_bool(value).map(|v| {
                self.headpatting = v;
                OptionChange::Headpatting(v)
            }),
            "voicelines" => as_bool(value).map(|v| {
                self.voicelines = v;
                OptionChange::Voicelines(v)
            }),
            "mousetracking" => as_bool(value).map(|v| {
                self.mouse_tracking = v;
                OptionChange::MouseTracking(v)
            }),
            "drawHitboxes" => as_bool(value).map(|v| {
                self.draw_hitboxes = v;
                OptionChange::DrawHitboxes(v)
            }),
            "scale" => as_f32(value).map(|v| {
                self.scale = v;
                OptionChange::Scale(v)
            }),
            "alignmentfliph" => as_bool(value).map(|v| {
                self.mirrored = v;
                OptionChange::Mirrored(v)
            }),
            "targetfps" => as_f32(value).filter(|v| *v >= 1.0).map(|v| {
                self.target_fps = v as u32;
                OptionChange::TargetFps(self.target_fps)
            }),
            "showdialog" => as_bool(value).map(|v| {
                self.show_captions = v;
                OptionChange::ShowCaptions(v)
            }),
            "dialogx" => as_f32(value).map(|v| {
                self.caption_x = v;
                self.caption_position()
            }),
            "dialogy" => as_f32(value).map(|v| {
                self.caption_y = v;
                self.caption_position()
            }),
            "dialoglanguage" => value.as_str().map(|v| {
                self.language = v.to_string();
                OptionChange::Language(self.language.clone())
            }),
            "voicevolume" => as_f32(value).map(|v| {
                self.voice_volume = percent(v);
                OptionChange::VoiceVolume(self.voice_volume)
            }),
            "introanimation" => as_bool(value).map(|v| {
                self.intro_animation = v;
                OptionChange::IntroAnimation(v)
            }),
            "bgmfile" => value.as_str().map(|v| {
                let path = v.replace("%3A", ":");
                self.bgm_file = Some(path.clone());
                OptionChange::BgmFile(path)
            }),
            "bgmvolume" => as_f32(value).map(|v| {
                self.bgm_volume = percent(v);
                OptionChange::BgmVolume(self.bgm_volume)
            }),
            _ => {
                debug!(key = %key, "忽略未知属性");
                return None;
            }
        };

        if change.is_none() {
            debug!(key = %key, value = %value, "属性值类型不符，忽略");
        }
        change
    }

    fn caption_position(&self) -> OptionChange {
        OptionChange::CaptionPosition {
            x: self.caption_x,
            y: self.caption_y,
        }
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    value.as_bool()
}

fn as_f32(value: &Value) -> Option<f32> {
    value.as_f64().filter(|v| v.is_finite()).map(|v| v as f32)
}

/// 0-100 -> 0.0-1.0
fn percent(v: f32) -> f32 {
    (v / 100.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = RuntimeOptions::default();
        assert_eq!(options.region_flags(), RegionFlags::all());
        assert_eq!(options.frame_interval_ms(), 16);
        assert_eq!(options.language, "Japanese");
    }

    #[test]
    fn test_apply_user_properties() {
        let mut options = RuntimeOptions::default();
        let changes = options.apply_user_properties(&json!({
            "headpatting": { "value": false },
            "scale": { "value": 1.5 },
            "voicevolume": { "value": 80 },
            "dialoglanguage": { "value": "English" },
            "dialogx": { "value": 10 },
        }));

        assert_eq!(changes.len(), 5);
        assert!(!options.headpatting);
        assert_eq!(options.scale, 1.5);
        assert!((options.voice_volume - 0.8).abs() < 1e-6);
        assert_eq!(options.language, "English");
        let position = OptionChange::CaptionPosition { x: 10.0, y: 85.0 };
        assert!(changes.contains(&position));
    }

    #[test]
    fn test_unknown_and_mistyped_keys_are_ignored() {
        let mut options = RuntimeOptions::default();
        let before = options.clone();
        let changes = options.apply_user_properties(&json!({
            "schemecolor": { "value": "0.3 0.3 0.3" },
            "headpatting": { "value": "yes" },
            "targetfps": { "value": 0 },
        }));
        assert!(changes.is_empty());
        assert_eq!(options, before);

        // 非对象的属性包
        assert!(options.apply_user_properties(&json!(42)).is_empty());
    }

    #[test]
    fn test_bgm_properties() {
        let mut options = RuntimeOptions::default();
        let changes = options.apply_user_properties(&json!({
            "bgmfile": { "value": "C%3A/music/loop.flac" },
            "bgmvolume": { "value": 250 },
        }));
        assert_eq!(options.bgm_file.as_deref(), Some("C:/music/loop.flac"));
        assert_eq!(options.bgm_volume, 1.0);
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_bare_values_are_accepted() {
        let mut options = RuntimeOptions::default();
        let changes = options.apply_user_properties(&json!({ "alignmentfliph": true }));
        assert_eq!(changes, vec![OptionChange::Mirrored(true)]);
    }
}
