//! # Rig 模块
//!
//! 骨骼绑定：Runtime 只在初始化时通过名称查询交互目标点的静止位置，
//! 之后目标点由 Runtime 持有，位置变化以 `MoveTarget` 指令通知 Host。

use std::collections::HashMap;

use crate::geometry::Vec2;

/// 骨骼查询接口，由渲染侧实现
pub trait RigBinding {
    /// 按名称查找目标点，返回其静止位置（骨骼局部坐标）
    fn find_target(&self, name: &str) -> Option<Vec2>;
}

/// 基于表的骨骼绑定，供无渲染环境与测试使用
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticRig {
    targets: HashMap<String, Vec2>,
}

impl StaticRig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, name: impl Into<String>, rest: Vec2) -> Self {
        self.insert(name, rest);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, rest: Vec2) {
        self.targets.insert(name.into(), rest);
    }
}

impl RigBinding for StaticRig {
    fn find_target(&self, name: &str) -> Option<Vec2> {
        self.targets.get(name).copied()
    }
}
