//! # Gesture 模块
//!
//! 指针按下、移动、松开的处理，以及摸头与视线跟随的步进函数。
//!
//! 状态转换：
//!
//! ```text
//! Idle ──down(Headpat)───> Headpatting    ──up──> 平滑回位(Pet)
//! Idle ──down(Voiceline)─> VoicelineArmed ──up──> 语音序列
//!                                         ──move─> Idle（取消）
//! Idle ──down(Gaze)──────> GazeTracking   ──up──> 平滑回位(Gaze)
//! ```
//!
//! 进入任何手势前先关闭闸门；每条终止路径恰好打开一次。

use tracing::debug;

use crate::command::Command;
use crate::config::{GazeTuning, HeadpatTuning};
use crate::geometry::Vec2;
use crate::input::PointerSample;
use crate::region::RegionId;
use crate::runtime::TimerEvent;
use crate::runtime::engine::{PetRuntime, move_target};
use crate::scheduler::TaskHandle;
use crate::state::{GuardOwner, InteractionMode, TargetKind};

/// 摸头方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatDirection {
    /// 目标点上移（y 减小）
    Up,
    /// 目标点下移（y 增大）
    Down,
}

/// 根据指针位置与位移判定摸头方向
///
/// 以 `split_x` / `split_y` 为界，把顺时针画圈近似为上下摆动。
/// 坐标为镜像修正后的屏幕坐标。
pub fn headpat_direction(
    position: Vec2,
    delta: Vec2,
    tuning: &HeadpatTuning,
) -> Option<PatDirection> {
    let upper = position.y < tuning.split_y;
    let right = position.x >= tuning.split_x;

    if (upper && delta.y < 0.0) || (right && delta.x > 0.0) {
        Some(PatDirection::Up)
    } else if (!upper && delta.y > 0.0) || (!right && delta.x < 0.0) {
        Some(PatDirection::Down)
    } else {
        None
    }
}

/// 摸头一步后的 y，钳制在 `rest ± clamp`
pub fn headpat_step(
    current_y: f32,
    rest_y: f32,
    direction: PatDirection,
    tuning: &HeadpatTuning,
) -> f32 {
    let y = match direction {
        PatDirection::Up => current_y - tuning.step,
        PatDirection::Down => current_y + tuning.step,
    };
    y.clamp(rest_y - tuning.clamp, rest_y + tuning.clamp)
}

/// 视线跟随一步
///
/// `ratio` 为指针相对表面中心的归一化偏移。横轴与骨骼方向相反。
/// 偏移越大，允许的活动范围越大。
pub fn gaze_step(current: Vec2, rest: Vec2, ratio: Vec2, tuning: &GazeTuning) -> Vec2 {
    let x = current.x - sign(ratio.x) * tuning.step;
    let y = current.y + sign(ratio.y) * tuning.step;
    let reach_x = ratio.x.abs() * tuning.clamp_x;
    let reach_y = ratio.y.abs() * tuning.clamp_y;
    Vec2::new(
        x.clamp(rest.x - reach_x, rest.x + reach_x),
        y.clamp(rest.y - reach_y, rest.y + reach_y),
    )
}

/// 零的符号为零
fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl PetRuntime {
    pub(super) fn on_pointer_down(&mut self, sample: PointerSample) -> Vec<Command> {
        if !self.guard.try_close(GuardOwner::Gesture) {
            debug!(holder = ?self.guard.holder(), "闸门关闭，忽略按下");
            return Vec::new();
        }

        let rig_point = self.transform.to_rig_space(sample.position());
        let region = self
            .regions
            .classify(rig_point, self.options.region_flags());
        debug!(x = rig_point.x, y = rig_point.y, ?region, "指针按下");

        match region {
            Some(RegionId::Headpat) => {
                self.mode = InteractionMode::Headpatting;
                let animations = &self.profile.animations;
                let mut commands = vec![Command::set_animation(1, animations.pat.clone(), false)];
                if self.profile.overlay_tracks.point {
                    commands.push(Command::set_animation(
                        2,
                        animations.pat_overlay.clone(),
                        false,
                    ));
                }
                commands
            }
            Some(RegionId::Voiceline) if !self.library.is_empty() => {
                self.mode = InteractionMode::VoicelineArmed;
                Vec::new()
            }
            Some(RegionId::Voiceline) => {
                debug!("语音库为空，语音区域不响应");
                self.release_guard(GuardOwner::Gesture);
                Vec::new()
            }
            Some(RegionId::Gaze) => self.start_gaze_tracking(sample),
            None => {
                self.release_guard(GuardOwner::Gesture);
                Vec::new()
            }
        }
    }

    fn start_gaze_tracking(&mut self, sample: PointerSample) -> Vec<Command> {
        self.mode = InteractionMode::GazeTracking;
        self.pointer = self.transform.unmirror(sample.position());

        let handle = self
            .scheduler
            .every(self.profile.timing.tick_period_ms, TimerEvent::GazeTrack);
        if let Some(stale) = self.gaze_task.replace(&mut self.scheduler, handle) {
            debug!(?stale, "替换旧的视线跟随任务");
        }

        let animations = &self.profile.animations;
        let mut commands = vec![
            Command::SetEmptyAnimation {
                track: 1,
                mix_duration: 0.0,
            },
            Command::SetEmptyAnimation {
                track: 2,
                mix_duration: 0.0,
            },
            Command::add_animation(1, animations.look.clone(), false, 0.0).with_mix(0.2),
        ];
        if self.profile.overlay_tracks.eye {
            commands.push(
                Command::add_animation(2, animations.look_overlay.clone(), false, 0.0)
                    .with_mix(0.2),
            );
        }
        commands
    }

    pub(super) fn on_pointer_move(&mut self, sample: PointerSample) -> Vec<Command> {
        match self.mode {
            InteractionMode::Headpatting => {
                let position = self.transform.unmirror(sample.position());
                let delta = self.transform.unmirror_delta(sample.delta());
                let tuning = &self.profile.headpat;
                let Some(direction) = headpat_direction(position, delta, tuning) else {
                    return Vec::new();
                };
                self.pet.position.y =
                    headpat_step(self.pet.position.y, self.pet.rest.y, direction, tuning);
                vec![move_target(TargetKind::Pet, self.pet.position)]
            }
            InteractionMode::VoicelineArmed => {
                debug!("拖动取消语音");
                self.mode = InteractionMode::Idle;
                self.release_guard(GuardOwner::Gesture);
                Vec::new()
            }
            InteractionMode::GazeTracking => {
                self.pointer = self.transform.unmirror(sample.position());
                Vec::new()
            }
            InteractionMode::Idle => Vec::new(),
        }
    }

    pub(super) fn on_pointer_up(&mut self) -> Vec<Command> {
        let mode = std::mem::take(&mut self.mode);
        match mode {
            InteractionMode::Headpatting => {
                let animations = &self.profile.animations;
                let mut commands = vec![
                    Command::set_animation(1, animations.pat_end.clone(), false),
                    Command::set_animation(2, animations.pat_end_overlay.clone(), false),
                ];
                commands.extend(queue_empty_tracks());
                self.start_smoothing(TargetKind::Pet);
                commands
            }
            InteractionMode::VoicelineArmed => {
                match self.dialog.trigger(
                    &self.library,
                    &self.profile.animations,
                    &mut self.scheduler,
                ) {
                    Some(commands) => {
                        self.guard
                            .hand_over(GuardOwner::Gesture, GuardOwner::Dialog);
                        commands
                    }
                    None => {
                        self.release_guard(GuardOwner::Gesture);
                        Vec::new()
                    }
                }
            }
            InteractionMode::GazeTracking => {
                self.gaze_task.stop(&mut self.scheduler);
                let animations = &self.profile.animations;
                let mut commands = vec![
                    Command::set_animation(1, animations.look_end.clone(), false).with_mix(0.0),
                    Command::set_animation(2, animations.look_end_overlay.clone(), false)
                        .with_mix(0.0),
                ];
                commands.extend(queue_empty_tracks());
                self.start_smoothing(TargetKind::Gaze);
                commands
            }
            InteractionMode::Idle => Vec::new(),
        }
    }

    /// 启动平滑回位并把闸门交给它
    fn start_smoothing(&mut self, kind: TargetKind) {
        let period = self.profile.timing.tick_period_ms;
        let smoothing = match kind {
            TargetKind::Pet => &mut self.pet_smoothing,
            TargetKind::Gaze => &mut self.gaze_smoothing,
        };
        let stale = smoothing.start(&mut self.scheduler, period, TimerEvent::Smoothing(kind));
        if let Some(stale) = stale {
            debug!(?kind, ?stale, "替换旧的平滑任务");
        }
        self.guard
            .hand_over(GuardOwner::Gesture, GuardOwner::Smoothing(kind));
    }

    /// 视线跟随周期
    pub(super) fn on_gaze_track(&mut self, handle: TaskHandle) -> Vec<Command> {
        if !self.gaze_task.owns(handle) {
            return Vec::new();
        }
        let ratio = self.transform.centered_ratio(self.pointer);
        self.gaze.position = gaze_step(
            self.gaze.position,
            self.gaze.rest,
            ratio,
            &self.profile.gaze,
        );
        vec![move_target(TargetKind::Gaze, self.gaze.position)]
    }
}

/// 轨道 1、2 排队空动画
fn queue_empty_tracks() -> [Command; 2] {
    [1, 2].map(|track| Command::AddEmptyAnimation {
        track,
        mix_duration: 0.5,
        delay: 0.0,
    })
}
