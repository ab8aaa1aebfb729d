//! 指针轨迹文件
//!
//! ```json
//! {
//!   "surface": { "width": 1920, "height": 1080 },
//!   "targets": { "Touch_Point": { "x": 0, "y": 0 } },
//!   "events": [
//!     { "at": 0, "input": { "PointerDown": { "x": 500, "y": 600 } } },
//!     { "at": 300, "input": "PointerUp" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use pet_runtime::{RuntimeInput, SurfaceSize, Timestamp, Vec2};

/// 单个轨迹事件
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceEvent {
    /// 投递时间（毫秒）
    pub at: Timestamp,
    pub input: RuntimeInput,
}

/// 指针轨迹
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointerTrace {
    /// 显示表面尺寸
    #[serde(default = "default_surface")]
    pub surface: SurfaceSize,
    /// 目标点静止位置，覆盖默认的原点
    #[serde(default)]
    pub targets: BTreeMap<String, Vec2>,
    /// 按时间排列的事件
    #[serde(default)]
    pub events: Vec<TraceEvent>,
}

fn default_surface() -> SurfaceSize {
    SurfaceSize::new(1920.0, 1080.0)
}

impl PointerTrace {
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let mut trace: Self = serde_json::from_str(content).context("轨迹解析失败")?;
        // 同一时刻的事件保持文件中的顺序
        trace.events.sort_by_key(|e| e.at);
        Ok(trace)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取轨迹文件: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("轨迹文件无效: {}", path.display()))
    }

    /// 最后一个事件的时间
    pub fn end_time(&self) -> Timestamp {
        self.events.last().map(|e| e.at).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trace() {
        let trace = PointerTrace::from_json(
            r#"{
                "targets": { "Touch_Eye": { "x": 3.0, "y": 4.0 } },
                "events": [
                    { "at": 300, "input": "PointerUp" },
                    { "at": 0, "input": { "PointerDown": { "x": 500, "y": 600 } } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(trace.surface, SurfaceSize::new(1920.0, 1080.0));
        assert_eq!(trace.targets["Touch_Eye"], Vec2::new(3.0, 4.0));
        assert_eq!(trace.events[0].input, RuntimeInput::down(500.0, 600.0));
        assert_eq!(trace.end_time(), 300);
    }

    #[test]
    fn test_invalid_trace() {
        let result = PointerTrace::from_json(r#"{ "events": [ { "at": "soon" } ] }"#);
        assert!(result.is_err());
    }
}
