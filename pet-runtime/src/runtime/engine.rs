//! # Engine 模块
//!
//! 指针交互引擎。
//!
//! ## 执行模型
//!
//! ```text
//! tick(now, input) -> Vec<Command>
//! ```
//!
//! 1. 按（到期时间, 插入顺序）逐个触发 `now` 之前到期的定时事件
//! 2. 时钟推进到 `now`
//! 3. 处理本次输入
//! 4. 返回过程中产生的所有 Command
//!
//! 引擎是目标点、闸门和语音序号的唯一持有者；Host 只执行指令。

use tracing::{debug, warn};

use crate::command::{Command, VoiceId};
use crate::config::{OptionChange, RigProfile, RuntimeOptions};
use crate::dialog::{DialogEvent, DialogSequencer, VoicelineLibrary};
use crate::error::RuntimeError;
use crate::geometry::{DisplayTransform, ScreenRect, SurfaceSize, Vec2};
use crate::input::RuntimeInput;
use crate::region::RegionTable;
use crate::rig::RigBinding;
use crate::runtime::TimerEvent;
use crate::scheduler::{Fired, Scheduler, TaskHandle, TaskSlot, Timestamp};
use crate::smoothing::{LoopTick, SmoothingLoop};
use crate::state::{AcceptGuard, GuardOwner, InteractionMode, RigTargetPoint, TargetKind};

/// 指针交互引擎
///
/// # 使用示例
///
/// ```ignore
/// let rig = StaticRig::new()
///     .with_target("Touch_Point", Vec2::new(0.0, 0.0))
///     .with_target("Touch_Eye", Vec2::new(0.0, 0.0));
/// let mut runtime = PetRuntime::new(&rig, profile, options, library, surface)?;
///
/// host.execute_all(runtime.start());
/// loop {
///     let commands = runtime.tick(host.now(), host.poll_input());
///     host.execute_all(commands);
/// }
/// ```
pub struct PetRuntime {
    pub(super) profile: RigProfile,
    pub(super) options: RuntimeOptions,
    pub(super) library: VoicelineLibrary,
    pub(super) regions: RegionTable,
    pub(super) surface: SurfaceSize,
    pub(super) transform: DisplayTransform,
    pub(super) scheduler: Scheduler<TimerEvent>,
    pub(super) mode: InteractionMode,
    pub(super) guard: AcceptGuard,
    pub(super) pet: RigTargetPoint,
    pub(super) gaze: RigTargetPoint,
    pub(super) pet_smoothing: SmoothingLoop,
    pub(super) gaze_smoothing: SmoothingLoop,
    /// 视线跟随周期任务
    pub(super) gaze_task: TaskSlot,
    /// 视线跟随使用的指针位置（镜像修正后的屏幕坐标）
    pub(super) pointer: Vec2,
    pub(super) dialog: DialogSequencer,
    started: bool,
}

impl PetRuntime {
    /// 创建引擎
    ///
    /// 从骨骼中读取两个交互目标点的静止位置，找不到时返回 `MissingTarget`。
    pub fn new(
        rig: &dyn RigBinding,
        profile: RigProfile,
        options: RuntimeOptions,
        library: VoicelineLibrary,
        surface: SurfaceSize,
    ) -> Result<Self, RuntimeError> {
        let find = |name: &str| {
            rig.find_target(name)
                .map(|rest| RigTargetPoint::new(name, rest))
                .ok_or_else(|| RuntimeError::MissingTarget {
                    name: name.to_string(),
                })
        };
        let pet = find(&profile.targets.pet)?;
        let gaze = find(&profile.targets.gaze)?;

        let transform = build_transform(&profile, &options, surface);
        let regions = RegionTable::new(profile.regions.clone());
        let pet_smoothing = SmoothingLoop::new(profile.headpat.step);
        let gaze_smoothing = SmoothingLoop::new(profile.gaze.step);

        Ok(Self {
            profile,
            options,
            library,
            regions,
            surface,
            transform,
            scheduler: Scheduler::new(),
            mode: InteractionMode::Idle,
            guard: AcceptGuard::open(),
            pet,
            gaze,
            pet_smoothing,
            gaze_smoothing,
            gaze_task: TaskSlot::default(),
            pointer: Vec2::zero(),
            dialog: DialogSequencer::new(),
            started: false,
        })
    }

    /// 启动：开场动画、开场语音、待机动画与 BGM
    ///
    /// 只在第一次调用时产生指令。
    pub fn start(&mut self) -> Vec<Command> {
        if self.started {
            return Vec::new();
        }
        self.started = true;

        let mut commands = Vec::new();
        let animations = &self.profile.animations;

        if self.options.intro_animation {
            commands.push(Command::add_animation(0, &animations.intro, false, 0.0));
            if self.options.voicelines && self.library.intro_voice.is_some() {
                self.scheduler
                    .once(self.profile.intro.voice_delay_ms, TimerEvent::IntroVoice);
            }
            self.guard = AcceptGuard::held_by(GuardOwner::Intro);
            self.scheduler
                .once(self.profile.intro.unlock_after_ms, TimerEvent::IntroUnlock);
            debug!(
                unlock_ms = self.profile.intro.unlock_after_ms,
                "播放开场动画"
            );
        }

        commands.push(Command::add_animation(0, &animations.idle, true, 0.0));

        if let Some(path) = &self.options.bgm_file {
            commands.push(Command::PlayBgm {
                path: path.clone(),
                looping: true,
                volume: self.options.bgm_volume,
            });
        }

        commands
    }

    /// 核心驱动函数
    ///
    /// `now` 之前（含）到期的定时事件先于 `input` 处理。时间不会倒退。
    pub fn tick(&mut self, now: Timestamp, input: Option<RuntimeInput>) -> Vec<Command> {
        let mut commands = Vec::new();

        while let Some(fired) = self.scheduler.pop_due(now) {
            commands.extend(self.on_timer(fired));
        }
        self.scheduler.advance_to(now);

        if let Some(input) = input {
            commands.extend(self.handle_input(input));
        }

        commands
    }

    fn handle_input(&mut self, input: RuntimeInput) -> Vec<Command> {
        match input {
            RuntimeInput::PointerDown(sample) => self.on_pointer_down(sample),
            RuntimeInput::PointerMove(sample) => self.on_pointer_move(sample),
            RuntimeInput::PointerUp => self.on_pointer_up(),
            RuntimeInput::VoiceEnded { voice } => self.dialog.on_segment_end(voice),
            RuntimeInput::Resize { width, height } => {
                self.surface = SurfaceSize::new(width, height);
                self.rebuild_transform();
                Vec::new()
            }
            RuntimeInput::ApplyProperties(props) => self.apply_properties(&props),
        }
    }

    fn on_timer(&mut self, fired: Fired<TimerEvent>) -> Vec<Command> {
        match fired.event {
            TimerEvent::GazeTrack => self.on_gaze_track(fired.handle),
            TimerEvent::Smoothing(kind) => self.on_smoothing_tick(kind, fired.handle),
            TimerEvent::Settle(owner) => {
                self.release_guard(owner);
                Vec::new()
            }
            TimerEvent::IntroVoice => self.play_intro_voice(),
            TimerEvent::IntroUnlock => {
                self.release_guard(GuardOwner::Intro);
                Vec::new()
            }
            TimerEvent::Dialog(event) => self.on_dialog_event(event),
        }
    }

    fn on_smoothing_tick(&mut self, kind: TargetKind, handle: TaskHandle) -> Vec<Command> {
        let (point, smoothing) = match kind {
            TargetKind::Pet => (&mut self.pet, &mut self.pet_smoothing),
            TargetKind::Gaze => (&mut self.gaze, &mut self.gaze_smoothing),
        };
        if !smoothing.owns(handle) {
            debug!(?kind, "过期的平滑任务，忽略");
            return Vec::new();
        }

        let position = match smoothing.tick(point, &mut self.scheduler) {
            LoopTick::Moved(p) => p,
            LoopTick::Converged(p) => {
                debug!(?kind, "目标点回到静止位置");
                self.scheduler.once(
                    self.profile.timing.settle_delay_ms,
                    TimerEvent::Settle(GuardOwner::Smoothing(kind)),
                );
                p
            }
        };

        vec![move_target(kind, position)]
    }

    fn play_intro_voice(&mut self) -> Vec<Command> {
        let Some(audio) = self.library.intro_voice.clone() else {
            return Vec::new();
        };
        let voice = self.dialog.allocate_voice();
        vec![Command::PlayVoice {
            voice,
            audio,
            volume: self.options.voice_volume,
        }]
    }

    fn on_dialog_event(&mut self, event: DialogEvent) -> Vec<Command> {
        match event {
            DialogEvent::SegmentStart { line, segment } => self.dialog.on_segment_start(
                line,
                segment,
                &self.library,
                &self.options,
                &mut self.scheduler,
            ),
            DialogEvent::SegmentEnd { voice } => self.dialog.on_segment_end(voice),
            DialogEvent::Complete => {
                let commands = self.dialog.on_complete(self.library.len());
                debug!(next = self.dialog.current_index(), "语音结束");
                self.release_guard(GuardOwner::Dialog);
                commands
            }
        }
    }

    /// 应用宿主属性包
    fn apply_properties(&mut self, props: &serde_json::Value) -> Vec<Command> {
        let changes = self.options.apply_user_properties(props);
        let mut commands = Vec::new();
        let mut rebuild = false;
        let mut rerender = false;

        for change in changes {
            debug!(?change, "选项变更");
            match change {
                OptionChange::Scale(_) | OptionChange::Mirrored(_) => rebuild = true,
                OptionChange::Language(_) | OptionChange::ShowCaptions(_) => rerender = true,
                OptionChange::CaptionPosition { x, y } => {
                    commands.push(Command::SetCaptionPosition {
                        x_percent: x,
                        y_percent: y,
                    });
                }
                OptionChange::BgmVolume(volume) => {
                    commands.push(Command::SetBgmVolume { volume });
                }
                OptionChange::BgmFile(path) => {
                    commands.push(Command::PlayBgm {
                        path,
                        looping: true,
                        volume: self.options.bgm_volume,
                    });
                }
                // 其余选项在下次使用时读取
                _ => {}
            }
        }

        if rebuild {
            self.rebuild_transform();
        }
        if rerender {
            commands.extend(self.dialog.rerender_captions(&self.library, &self.options));
        }
        commands
    }

    pub(super) fn rebuild_transform(&mut self) {
        self.transform = build_transform(&self.profile, &self.options, self.surface);
        debug!(
            scale = self.transform.scale,
            mirrored = self.transform.mirrored,
            transpose = self.transform.transpose(),
            "显示变换已更新"
        );
    }

    /// 由持有者打开闸门
    pub(super) fn release_guard(&mut self, owner: GuardOwner) {
        if !self.guard.release(owner) {
            warn!(?owner, holder = ?self.guard.holder(), "非持有者尝试打开闸门");
        }
    }

    // ========== 查询 ==========

    /// 当前交互模式
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// 接收闸门
    pub fn guard(&self) -> AcceptGuard {
        self.guard
    }

    /// 交互目标点
    pub fn target(&self, kind: TargetKind) -> &RigTargetPoint {
        match kind {
            TargetKind::Pet => &self.pet,
            TargetKind::Gaze => &self.gaze,
        }
    }

    /// 下一次触发的语音序号
    pub fn current_voiceline(&self) -> usize {
        self.dialog.current_index()
    }

    /// 是否有语音序列在进行
    pub fn is_speaking(&self) -> bool {
        self.dialog.is_running()
    }

    /// 正在播放的语音实例
    pub fn playing_voices(&self) -> Vec<VoiceId> {
        self.dialog.playing_voices()
    }

    pub fn library(&self) -> &VoicelineLibrary {
        &self.library
    }

    pub fn transform(&self) -> &DisplayTransform {
        &self.transform
    }

    /// 每帧间隔（毫秒）
    pub fn frame_interval_ms(&self) -> u64 {
        self.options.frame_interval_ms()
    }

    /// 调试叠加层：区域的屏幕矩形，未开启时为空
    pub fn debug_overlay(&self) -> Vec<ScreenRect> {
        if self.options.draw_hitboxes {
            self.regions.screen_rects(&self.transform)
        } else {
            Vec::new()
        }
    }

    /// 视线跟随任务是否在运行
    pub fn is_tracking(&self) -> bool {
        self.gaze_task.is_running()
    }

    /// 指定目标的平滑循环是否在运行
    pub fn is_smoothing(&self, kind: TargetKind) -> bool {
        match kind {
            TargetKind::Pet => self.pet_smoothing.is_running(),
            TargetKind::Gaze => self.gaze_smoothing.is_running(),
        }
    }

    /// 引擎时钟
    pub fn now(&self) -> Timestamp {
        self.scheduler.now()
    }

    /// 最早的待触发时间，Host 可据此决定下次唤醒
    pub fn next_due(&self) -> Option<Timestamp> {
        self.scheduler.next_due()
    }
}

fn build_transform(
    profile: &RigProfile,
    options: &RuntimeOptions,
    surface: SurfaceSize,
) -> DisplayTransform {
    DisplayTransform::new(
        surface,
        profile.nominal_size,
        options.scale,
        options.mirrored,
        profile.min_scale,
    )
}

pub(super) fn move_target(target: TargetKind, position: Vec2) -> Command {
    Command::MoveTarget {
        target,
        x: position.x,
        y: position.y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::{VoiceSegment, VoicelineScript};
    use crate::rig::StaticRig;
    use serde_json::json;

    fn rig() -> StaticRig {
        StaticRig::new()
            .with_target("Touch_Point", Vec2::new(100.0, 200.0))
            .with_target("Touch_Eye", Vec2::new(-50.0, 30.0))
    }

    fn library() -> VoicelineLibrary {
        let mut library = VoicelineLibrary::new(vec![VoicelineScript::new(
            8000,
            vec![VoiceSegment::new(700, "line_1.ogg").with_caption("Japanese", "こっちだ")],
        )]);
        library.intro_voice = Some("intro.ogg".to_string());
        library
    }

    fn runtime(options: RuntimeOptions) -> PetRuntime {
        PetRuntime::new(
            &rig(),
            RigProfile::default(),
            options,
            library(),
            SurfaceSize::new(2560.0, 1600.0),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_target() {
        let rig = StaticRig::new().with_target("Touch_Point", Vec2::zero());
        let err = PetRuntime::new(
            &rig,
            RigProfile::default(),
            RuntimeOptions::default(),
            VoicelineLibrary::default(),
            SurfaceSize::new(1920.0, 1080.0),
        )
        .err()
        .unwrap();
        assert_eq!(
            err,
            RuntimeError::MissingTarget {
                name: "Touch_Eye".to_string()
            }
        );
    }

    #[test]
    fn test_start_without_intro() {
        let mut rt = runtime(RuntimeOptions::default());
        assert_eq!(
            rt.start(),
            vec![Command::add_animation(0, "Idle_01", true, 0.0)]
        );
        assert!(rt.guard().is_open());
        assert!(rt.start().is_empty());
        assert_eq!(rt.next_due(), None);
    }

    #[test]
    fn test_intro_holds_guard() {
        let mut rt = runtime(RuntimeOptions {
            intro_animation: true,
            bgm_file: Some("bgm.ogg".to_string()),
            bgm_volume: 0.3,
            ..RuntimeOptions::default()
        });
        let commands = rt.start();
        assert_eq!(
            commands[0],
            Command::add_animation(0, "Start_Idle_01", false, 0.0)
        );
        assert_eq!(
            commands[2],
            Command::PlayBgm {
                path: "bgm.ogg".to_string(),
                looping: true,
                volume: 0.3
            }
        );
        assert_eq!(rt.guard().holder(), Some(GuardOwner::Intro));

        // 开场期间按下被忽略
        let commands = rt.tick(1000, Some(RuntimeInput::down(500.0, 700.0)));
        assert!(commands.is_empty());
        assert_eq!(rt.mode(), InteractionMode::Idle);

        let commands = rt.tick(11_500, None);
        assert!(matches!(
            &commands[..],
            [Command::PlayVoice { audio, .. }] if audio == "intro.ogg"
        ));

        rt.tick(19_499, None);
        assert!(!rt.guard().is_open());
        rt.tick(19_500, None);
        assert!(rt.guard().is_open());
    }

    #[test]
    fn test_intro_voice_skipped_when_voicelines_disabled() {
        let mut rt = runtime(RuntimeOptions {
            intro_animation: true,
            voicelines: false,
            ..RuntimeOptions::default()
        });
        rt.start();
        let commands = rt.tick(20_000, None);
        assert!(commands.is_empty());
        assert!(rt.guard().is_open());
    }

    #[test]
    fn test_live_property_changes() {
        let mut rt = runtime(RuntimeOptions::default());
        rt.start();

        let commands = rt.tick(
            0,
            Some(RuntimeInput::ApplyProperties(json!({
                "scale": { "value": 2.0 },
                "dialogy": { "value": 40 },
                "bgmvolume": { "value": 50 },
            }))),
        );
        assert_eq!(rt.transform().scale, 2.0);
        assert!(commands.contains(&Command::SetCaptionPosition {
            x_percent: 50.0,
            y_percent: 40.0
        }));
        assert!(commands.contains(&Command::SetBgmVolume { volume: 0.5 }));
    }

    #[test]
    fn test_debug_overlay_gated() {
        let mut rt = runtime(RuntimeOptions::default());
        assert!(rt.debug_overlay().is_empty());

        rt.tick(
            0,
            Some(RuntimeInput::ApplyProperties(
                json!({ "drawHitboxes": { "value": true } }),
            )),
        );
        let rects = rt.debug_overlay();
        assert_eq!(rects.len(), 2);
        // 2560×1600 表面上屏幕坐标与骨骼坐标一致
        assert!((rects[0].x - 160.0).abs() < 0.01);
        assert!((rects[0].width - 680.0).abs() < 0.01);
    }

    #[test]
    fn test_resize_rebuilds_transform() {
        let mut rt = runtime(RuntimeOptions::default());
        rt.tick(
            0,
            Some(RuntimeInput::Resize {
                width: 1920.0,
                height: 1080.0,
            }),
        );
        assert!((rt.transform().transpose() - 2560.0 / 1920.0).abs() < 1e-6);
    }
}
