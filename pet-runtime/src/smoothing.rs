//! # Smoothing 模块
//!
//! 可取消的"回到静止位置"循环。
//!
//! 每个周期把目标点的每个轴朝静止位置移动一个固定步长；
//! 两轴都落在一个步长之内时直接吸附到静止位置并取消自身。
//! 核心步进 `converge` 与具体目标无关，可以单独测试。

use crate::geometry::Vec2;
use crate::scheduler::{Scheduler, TaskHandle, TaskSlot};
use crate::state::RigTargetPoint;

/// 单步结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConvergeStep {
    /// 移动了一步
    Moved(Vec2),
    /// 已吸附到目标
    Arrived(Vec2),
}

/// 朝 `target` 走一步
///
/// 某个轴已在步长之内时该轴保持不动，等待另一轴收敛后一起吸附，不会越过目标。
pub fn converge(current: Vec2, target: Vec2, step: f32) -> ConvergeStep {
    let dx = target.x - current.x;
    let dy = target.y - current.y;
    if dx.abs() <= step && dy.abs() <= step {
        return ConvergeStep::Arrived(target);
    }

    let advance = |d: f32| {
        if d.abs() > step {
            step.copysign(d)
        } else {
            0.0
        }
    };
    ConvergeStep::Moved(Vec2::new(current.x + advance(dx), current.y + advance(dy)))
}

/// 循环单次 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopTick {
    /// 仍在移动
    Moved(Vec2),
    /// 已收敛，循环已取消
    Converged(Vec2),
}

/// 绑定到单个目标点的平滑循环
#[derive(Debug)]
pub struct SmoothingLoop {
    step: f32,
    slot: TaskSlot,
}

impl SmoothingLoop {
    pub fn new(step: f32) -> Self {
        Self {
            step: step.abs().max(f32::EPSILON),
            slot: TaskSlot::default(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_running()
    }

    /// 是否为本循环的任务
    pub fn owns(&self, handle: TaskHandle) -> bool {
        self.slot.owns(handle)
    }

    /// 启动循环
    ///
    /// 已有循环时先取消旧的再替换，返回被取消的句柄。
    pub fn start<E: Clone>(
        &mut self,
        scheduler: &mut Scheduler<E>,
        period_ms: u64,
        event: E,
    ) -> Option<TaskHandle> {
        let handle = scheduler.every(period_ms, event);
        self.slot.replace(scheduler, handle)
    }

    /// 推进一步；收敛时取消自身
    pub fn tick<E: Clone>(
        &mut self,
        point: &mut RigTargetPoint,
        scheduler: &mut Scheduler<E>,
    ) -> LoopTick {
        match converge(point.position, point.rest, self.step) {
            ConvergeStep::Moved(p) => {
                point.position = p;
                LoopTick::Moved(p)
            }
            ConvergeStep::Arrived(p) => {
                point.position = p;
                self.slot.stop(scheduler);
                LoopTick::Converged(p)
            }
        }
    }

    /// 手动取消
    pub fn cancel<E: Clone>(&mut self, scheduler: &mut Scheduler<E>) -> bool {
        self.slot.stop(scheduler)
    }
}
