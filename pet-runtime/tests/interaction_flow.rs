//! # 交互流程集成测试
//!
//! 从指针输入到指令输出的完整链路：手势、平滑回位、语音序列与闸门。
//! 时间全部由测试推进，不需要真实等待或音频设备。

use pet_runtime::{
    Command, GuardOwner, InteractionMode, PetRuntime, RigProfile, RuntimeInput, RuntimeOptions,
    StaticRig, SurfaceSize, TargetKind, Timestamp, Vec2, VoiceId, VoiceSegment, VoicelineLibrary,
    VoicelineScript,
};
use serde_json::json;

/// 记录指令轨迹的测试会话
struct Session {
    rt: PetRuntime,
    trace: Vec<String>,
}

impl Session {
    fn new(options: RuntimeOptions, library: VoicelineLibrary) -> Self {
        let rig = StaticRig::new()
            .with_target("Touch_Point", Vec2::zero())
            .with_target("Touch_Eye", Vec2::zero());
        // 2560×1600 表面上屏幕坐标与骨骼坐标一致
        let mut rt = PetRuntime::new(
            &rig,
            RigProfile::default(),
            options,
            library,
            SurfaceSize::new(2560.0, 1600.0),
        )
        .unwrap();
        rt.start();
        Self {
            rt,
            trace: Vec::new(),
        }
    }

    fn step(&mut self, now: Timestamp, input: Option<RuntimeInput>) -> Vec<Command> {
        let commands = self.rt.tick(now, input);
        for cmd in &commands {
            self.trace.push(format!("{now}: {cmd:?}"));
        }
        commands
    }

    fn send(&mut self, now: Timestamp, input: RuntimeInput) -> Vec<Command> {
        self.step(now, Some(input))
    }

    /// 逐个触发 `until` 之前到期的定时器，轨迹时间即触发时间
    fn run_until(&mut self, until: Timestamp) {
        loop {
            match self.rt.next_due() {
                Some(due) if due <= until => {
                    self.step(due, None);
                }
                _ => break,
            }
        }
        self.step(until, None);
    }

    fn trace(&self) -> String {
        self.trace.join("\n")
    }
}

fn two_segment_library() -> VoicelineLibrary {
    VoicelineLibrary::new(vec![VoicelineScript::new(
        20000,
        vec![
            VoiceSegment::new(500, "line_2_1.ogg")
                .with_caption("Japanese", "うう")
                .with_caption("English", "Ugh")
                .with_duration(9000),
            VoiceSegment::new(13500, "line_2_2.ogg").with_caption("Japanese", "いくら"),
        ],
    )])
}

fn move_gaze(x: f32, y: f32) -> Command {
    Command::MoveTarget {
        target: TargetKind::Gaze,
        x,
        y,
    }
}

/// 主轨道上排队的说话动画
fn main_track_animation(cmd: Command) -> Option<String> {
    match cmd {
        Command::AddAnimation {
            track: 1,
            animation,
            ..
        } => Some(animation),
        _ => None,
    }
}

fn three_line_library() -> VoicelineLibrary {
    VoicelineLibrary::new(
        (1..=3)
            .map(|n| {
                VoicelineScript::new(1000, vec![VoiceSegment::new(100, format!("line_{n}.ogg"))])
            })
            .collect(),
    )
}

/// 按下 -> 画圈 -> 松开 -> 平滑回位 -> 等待后闸门打开
#[test]
fn test_headpat_flow() {
    let mut s = Session::new(RuntimeOptions::default(), VoicelineLibrary::default());

    s.send(0, RuntimeInput::down(500.0, 700.0));
    assert_eq!(s.rt.mode(), InteractionMode::Headpatting);
    s.send(16, RuntimeInput::moved(500.0, 700.0, 0.0, -3.0));
    s.send(32, RuntimeInput::moved(500.0, 700.0, 0.0, -3.0));
    s.send(48, RuntimeInput::up());
    assert_eq!(s.rt.mode(), InteractionMode::Idle);
    assert!(s.rt.is_smoothing(TargetKind::Pet));

    s.run_until(400);
    assert!(!s.rt.is_smoothing(TargetKind::Pet));
    assert!(s.rt.target(TargetKind::Pet).is_at_rest());

    insta::assert_snapshot!(s.trace(), @r#"
    0: SetAnimation { track: 1, animation: "Pat_01_M", looping: false, mix_duration: None }
    0: SetAnimation { track: 2, animation: "Pat_01_A", looping: false, mix_duration: None }
    16: MoveTarget { target: Pet, x: 0.0, y: -5.0 }
    32: MoveTarget { target: Pet, x: 0.0, y: -10.0 }
    48: SetAnimation { track: 1, animation: "PatEnd_01_M", looping: false, mix_duration: None }
    48: SetAnimation { track: 2, animation: "PatEnd_01_A", looping: false, mix_duration: None }
    48: AddEmptyAnimation { track: 1, mix_duration: 0.5, delay: 0.0 }
    48: AddEmptyAnimation { track: 2, mix_duration: 0.5, delay: 0.0 }
    68: MoveTarget { target: Pet, x: 0.0, y: -5.0 }
    88: MoveTarget { target: Pet, x: 0.0, y: 0.0 }
    "#);

    // 收敛于 88ms，等待 500ms
    assert_eq!(
        s.rt.guard().holder(),
        Some(GuardOwner::Smoothing(TargetKind::Pet))
    );
    assert!(s.send(500, RuntimeInput::down(500.0, 700.0)).is_empty());
    s.run_until(587);
    assert!(!s.rt.guard().is_open());
    s.run_until(588);
    assert!(s.rt.guard().is_open());
}

#[test]
fn test_headpat_stays_within_clamp() {
    let mut s = Session::new(RuntimeOptions::default(), VoicelineLibrary::default());
    s.send(0, RuntimeInput::down(500.0, 700.0));
    for i in 1..=20 {
        s.send(i * 10, RuntimeInput::moved(500.0, 900.0, 0.0, 2.0));
    }
    assert_eq!(s.rt.target(TargetKind::Pet).position, Vec2::new(0.0, 30.0));
}

#[test]
fn test_mirrored_headpat_uses_corrected_delta() {
    let options = RuntimeOptions {
        mirrored: true,
        ..RuntimeOptions::default()
    };
    let mut s = Session::new(options, VoicelineLibrary::default());

    // 原始 x = 2060 修正为 500，落在摸头区域
    s.send(0, RuntimeInput::down(2060.0, 700.0));
    assert_eq!(s.rt.mode(), InteractionMode::Headpatting);

    // 原始向右移动，修正后向左：左半边向左 -> 下移
    let commands = s.send(10, RuntimeInput::moved(2060.0, 900.0, 3.0, 0.0));
    assert_eq!(
        commands,
        vec![Command::MoveTarget {
            target: TargetKind::Pet,
            x: 0.0,
            y: 5.0
        }]
    );
}

/// 视线跟随：跟随周期在松开后停止，平滑循环接管
#[test]
fn test_gaze_tracking_flow() {
    let mut s = Session::new(RuntimeOptions::default(), VoicelineLibrary::default());

    s.send(0, RuntimeInput::down(2400.0, 1500.0));
    assert_eq!(s.rt.mode(), InteractionMode::GazeTracking);
    assert!(s.rt.is_tracking());
    s.run_until(45);
    s.send(50, RuntimeInput::up());
    assert!(!s.rt.is_tracking());
    s.run_until(200);

    insta::assert_snapshot!(s.trace(), @r#"
    0: SetEmptyAnimation { track: 1, mix_duration: 0.0 }
    0: SetEmptyAnimation { track: 2, mix_duration: 0.0 }
    0: AddAnimation { track: 1, animation: "Look_01_M", looping: false, delay: 0.0, mix_duration: Some(0.2) }
    20: MoveTarget { target: Gaze, x: -10.0, y: 10.0 }
    40: MoveTarget { target: Gaze, x: -20.0, y: 20.0 }
    50: SetAnimation { track: 1, animation: "LookEnd_01_M", looping: false, mix_duration: Some(0.0) }
    50: SetAnimation { track: 2, animation: "LookEnd_01_A", looping: false, mix_duration: Some(0.0) }
    50: AddEmptyAnimation { track: 1, mix_duration: 0.5, delay: 0.0 }
    50: AddEmptyAnimation { track: 2, mix_duration: 0.5, delay: 0.0 }
    70: MoveTarget { target: Gaze, x: -10.0, y: 10.0 }
    90: MoveTarget { target: Gaze, x: 0.0, y: 0.0 }
    "#);

    s.run_until(589);
    assert!(!s.rt.guard().is_open());
    s.run_until(590);
    assert!(s.rt.guard().is_open());
}

/// 镜像表面：同一原始位置的横向步进方向与未镜像时相反
#[test]
fn test_mirrored_gaze_flips_horizontal_step() {
    let options = RuntimeOptions {
        mirrored: true,
        ..RuntimeOptions::default()
    };
    let mut s = Session::new(options, VoicelineLibrary::default());

    // 原始 x = 2400 修正为 160，位于左半边，目标点右移
    s.send(0, RuntimeInput::down(2400.0, 1500.0));
    assert_eq!(s.rt.mode(), InteractionMode::GazeTracking);
    assert_eq!(s.step(20, None), vec![move_gaze(10.0, 10.0)]);

    // 原始 x = 160 修正为 2400，位于右半边，目标点左移
    s.send(30, RuntimeInput::moved(160.0, 1500.0, -2240.0, 0.0));
    assert_eq!(s.step(40, None), vec![move_gaze(0.0, 20.0)]);
}

#[test]
fn test_gaze_reach_scales_with_pointer_offset() {
    let mut s = Session::new(RuntimeOptions::default(), VoicelineLibrary::default());
    s.send(0, RuntimeInput::down(2400.0, 1500.0));
    s.run_until(1000);

    // 偏移 0.4375：x 范围 87.5，y 范围 49.21875
    assert_eq!(
        s.rt.target(TargetKind::Gaze).position,
        Vec2::new(-87.5, 49.21875)
    );

    // 指针回到中心，活动范围收缩为零
    s.send(1000, RuntimeInput::moved(1280.0, 800.0, 0.0, 0.0));
    s.run_until(1020);
    assert!(s.rt.target(TargetKind::Gaze).is_at_rest());
}

/// 两段语音在 +500 与 +13500 播放，闸门在总时长后打开
#[test]
fn test_voiceline_segment_timing() {
    let mut s = Session::new(RuntimeOptions::default(), two_segment_library());

    s.send(0, RuntimeInput::down(1500.0, 500.0));
    assert_eq!(s.rt.mode(), InteractionMode::VoicelineArmed);
    s.send(1000, RuntimeInput::up());
    assert_eq!(s.rt.guard().holder(), Some(GuardOwner::Dialog));

    let mut voices = Vec::new();
    loop {
        match s.rt.next_due() {
            Some(due) if due <= 30_000 => {
                for cmd in s.step(due, None) {
                    if let Command::PlayVoice { audio, .. } = cmd {
                        voices.push((due, audio));
                    }
                }
                if s.rt.guard().is_open() {
                    assert!(due >= 21_000);
                    break;
                }
            }
            _ => break,
        }
    }

    assert_eq!(
        voices,
        vec![
            (1500, "line_2_1.ogg".to_string()),
            (14_500, "line_2_2.ogg".to_string()),
        ]
    );
    assert!(s.rt.guard().is_open());
    assert!(!s.rt.is_speaking());
    // 只有一条语音，序号保持在末尾
    assert_eq!(s.rt.current_voiceline(), 1);
}

/// 字幕随语言切换与片段结束重新渲染
#[test]
fn test_caption_rendering() {
    let options = RuntimeOptions {
        show_captions: true,
        ..RuntimeOptions::default()
    };
    let mut s = Session::new(options, two_segment_library());

    s.send(0, RuntimeInput::down(1500.0, 500.0));
    s.send(100, RuntimeInput::up());
    s.run_until(600);
    s.send(
        700,
        RuntimeInput::ApplyProperties(json!({ "dialoglanguage": { "value": "English" } })),
    );
    s.run_until(13_600);
    s.send(
        14_000,
        RuntimeInput::ApplyProperties(json!({ "dialoglanguage": { "value": "Japanese" } })),
    );
    s.send(15_000, RuntimeInput::VoiceEnded { voice: VoiceId(2) });
    s.run_until(20_100);
    assert!(s.rt.guard().is_open());

    insta::assert_snapshot!(s.trace(), @r#"
    100: SetEmptyAnimation { track: 1, mix_duration: 1.0 }
    100: SetEmptyAnimation { track: 2, mix_duration: 1.0 }
    100: AddAnimation { track: 1, animation: "Talk_01_M", looping: false, delay: 0.0, mix_duration: None }
    100: AddAnimation { track: 2, animation: "Talk_01_A", looping: false, delay: 0.0, mix_duration: None }
    100: AddEmptyAnimation { track: 1, mix_duration: 0.5, delay: 0.0 }
    100: AddEmptyAnimation { track: 2, mix_duration: 0.5, delay: 0.0 }
    600: PlayVoice { voice: VoiceId(1), audio: "line_2_1.ogg", volume: 0.5 }
    600: ShowCaption { voice: VoiceId(1), text: "うう" }
    700: ShowCaption { voice: VoiceId(1), text: "Ugh" }
    9600: HideCaption { voice: VoiceId(1) }
    13600: PlayVoice { voice: VoiceId(2), audio: "line_2_2.ogg", volume: 0.5 }
    14000: ShowCaption { voice: VoiceId(2), text: "いくら" }
    15000: HideCaption { voice: VoiceId(2) }
    "#);
}

#[test]
fn test_voiceline_index_advances_and_clamps() {
    let mut s = Session::new(RuntimeOptions::default(), three_line_library());
    let mut talks = Vec::new();

    for round in 0..5u64 {
        let t = round * 10_000;
        s.send(t, RuntimeInput::down(1500.0, 500.0));
        let commands = s.send(t + 10, RuntimeInput::up());
        talks.extend(commands.into_iter().filter_map(main_track_animation));
        s.run_until(t + 2000);
        assert!(s.rt.guard().is_open());
        assert!(s.rt.current_voiceline() <= 3);
    }

    assert_eq!(talks.len(), 5);
    assert_eq!(talks[..3], ["Talk_01_M", "Talk_02_M", "Talk_03_M"]);
    assert!(talks[3..].iter().all(|t| t == "Talk_03_M"));
}

#[test]
fn test_voiceline_drag_cancels() {
    let mut s = Session::new(RuntimeOptions::default(), three_line_library());
    s.send(0, RuntimeInput::down(1500.0, 500.0));
    let commands = s.send(10, RuntimeInput::moved(1510.0, 500.0, 10.0, 0.0));
    assert!(commands.is_empty());
    assert_eq!(s.rt.mode(), InteractionMode::Idle);
    assert!(s.rt.guard().is_open());

    // 取消后的松开不触发语音
    assert!(s.send(20, RuntimeInput::up()).is_empty());
    assert_eq!(s.rt.current_voiceline(), 1);
}

#[test]
fn test_pointer_ignored_while_dialog_plays() {
    let mut s = Session::new(RuntimeOptions::default(), two_segment_library());
    s.send(0, RuntimeInput::down(1500.0, 500.0));
    s.send(10, RuntimeInput::up());

    assert!(s.send(100, RuntimeInput::down(500.0, 700.0)).is_empty());
    let commands = s.send(110, RuntimeInput::moved(500.0, 600.0, 0.0, -5.0));
    assert!(commands.is_empty());
    assert!(s.send(120, RuntimeInput::up()).is_empty());
    assert_eq!(s.rt.mode(), InteractionMode::Idle);
    assert_eq!(s.rt.guard().holder(), Some(GuardOwner::Dialog));
}

#[test]
fn test_disabled_gestures_reopen_guard_immediately() {
    let options = RuntimeOptions {
        headpatting: false,
        voicelines: false,
        mouse_tracking: false,
        ..RuntimeOptions::default()
    };
    let mut s = Session::new(options, three_line_library());

    for (x, y) in [(500.0, 700.0), (1500.0, 500.0), (2400.0, 1500.0)] {
        assert!(s.send(0, RuntimeInput::down(x, y)).is_empty());
        assert_eq!(s.rt.mode(), InteractionMode::Idle);
        assert!(s.rt.guard().is_open());
    }
}

#[test]
fn test_empty_library_falls_through() {
    let mut s = Session::new(RuntimeOptions::default(), VoicelineLibrary::default());
    s.send(0, RuntimeInput::down(1500.0, 500.0));
    assert_eq!(s.rt.mode(), InteractionMode::Idle);
    assert!(s.rt.guard().is_open());
}

#[test]
fn test_gesture_flags_apply_on_next_use() {
    let mut s = Session::new(RuntimeOptions::default(), VoicelineLibrary::default());
    s.send(0, RuntimeInput::down(500.0, 700.0));
    s.send(
        10,
        RuntimeInput::ApplyProperties(json!({ "headpatting": { "value": false } })),
    );
    // 当前手势不受影响
    assert_eq!(s.rt.mode(), InteractionMode::Headpatting);
    s.send(20, RuntimeInput::up());
    s.run_until(1000);

    // 下次按下同一位置回退到视线跟随
    s.send(1000, RuntimeInput::down(500.0, 700.0));
    assert_eq!(s.rt.mode(), InteractionMode::GazeTracking);
}
