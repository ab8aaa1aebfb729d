//! # Headless Host
//!
//! 按帧回放指针轨迹，打印 Runtime 发出的 Command。
//!
//! ```bash
//! cargo run -p host-headless -- --voicelines assets/voicelines/ch0221.json \
//!     --trace assets/traces/demo.json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{Level, debug, info};

use host_headless::{PointerTrace, StageExecutor, StageState};
use pet_runtime::{
    Command, PetRuntime, RigProfile, RuntimeInput, RuntimeOptions, StaticRig, Timestamp, Vec2,
    VoicelineLibrary,
};

/// 轨迹结束后继续运行的时长，让平滑与语音跑完
const TAIL_MS: Timestamp = 30_000;

#[derive(Parser)]
#[command(name = "pet-headless")]
#[command(about = "无窗口回放指针轨迹，输出交互指令")]
#[command(version)]
struct Cli {
    /// 角色档案（JSON），缺省使用内置档案
    #[arg(long)]
    profile: Option<PathBuf>,

    /// 用户选项属性包（JSON）
    #[arg(long)]
    options: Option<PathBuf>,

    /// 语音库（JSON）
    #[arg(long)]
    voicelines: Option<PathBuf>,

    /// 指针轨迹（JSON）
    #[arg(long)]
    trace: Option<PathBuf>,

    /// 结束时间（毫秒），缺省为轨迹末尾之后 30 秒
    #[arg(long)]
    until: Option<Timestamp>,

    /// 以 JSON Lines 输出指令
    #[arg(long)]
    json: bool,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// 模拟的语音长度（毫秒）
    #[arg(long, default_value_t = 3000)]
    voice_ms: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let profile = match &cli.profile {
        Some(path) => {
            let context = || format!("角色档案无效: {}", path.display());
            RigProfile::load(path).with_context(context)?
        }
        None => RigProfile::default(),
    };

    let mut options = RuntimeOptions::default();
    if let Some(path) = &cli.options {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取选项文件: {}", path.display()))?;
        let props: serde_json::Value =
            serde_json::from_str(&content).context("选项文件解析失败")?;
        let changes = options.apply_user_properties(&props);
        debug!(count = changes.len(), "已应用用户选项");
    }

    let library = match &cli.voicelines {
        Some(path) => {
            let context = || format!("语音库无效: {}", path.display());
            VoicelineLibrary::load(path).with_context(context)?
        }
        None => VoicelineLibrary::default(),
    };

    let trace = match &cli.trace {
        Some(path) => PointerTrace::load(path)?,
        None => PointerTrace::from_json("{}")?,
    };

    // 目标点默认位于骨骼原点，轨迹文件可以覆盖
    let mut rig = StaticRig::new()
        .with_target(profile.targets.pet.clone(), Vec2::zero())
        .with_target(profile.targets.gaze.clone(), Vec2::zero());
    for (name, rest) in &trace.targets {
        rig.insert(name.clone(), *rest);
    }

    let mut runtime = PetRuntime::new(&rig, profile, options, library, trace.surface)?;
    info!(
        lines = runtime.library().len(),
        events = trace.events.len(),
        "开始回放"
    );

    let mut player = Player {
        executor: StageExecutor::new(cli.voice_ms),
        stage: StageState::new(),
        json: cli.json,
        mode: runtime.mode(),
    };

    let until = cli.until.unwrap_or(trace.end_time() + TAIL_MS);
    let commands = runtime.start();
    player.apply(&runtime, 0, &commands)?;

    let mut events = trace.events.iter().peekable();
    let mut now: Timestamp = 0;
    while now <= until {
        // 轨迹事件按自身时间投递，不对齐到帧
        while let Some(event) = events.next_if(|e| e.at <= now) {
            let commands = runtime.tick(event.at.max(runtime.now()), Some(event.input.clone()));
            player.apply(&runtime, runtime.now(), &commands)?;
        }

        let commands = runtime.tick(now, None);
        player.apply(&runtime, now, &commands)?;

        for voice in player.executor.finished_voices(&mut player.stage, now) {
            let commands = runtime.tick(now, Some(RuntimeInput::VoiceEnded { voice }));
            player.apply(&runtime, now, &commands)?;
        }

        now += runtime.frame_interval_ms();
    }

    player.summary(&runtime);
    Ok(())
}

/// 执行并打印 Command
struct Player {
    executor: StageExecutor,
    stage: StageState,
    json: bool,
    mode: pet_runtime::InteractionMode,
}

impl Player {
    fn apply(
        &mut self,
        runtime: &PetRuntime,
        now: Timestamp,
        commands: &[Command],
    ) -> anyhow::Result<()> {
        for command in commands {
            if self.json {
                let line = serde_json::json!({ "at": now, "command": command });
                println!("{}", serde_json::to_string(&line)?);
            } else {
                println!("{now:>8} {command:?}");
            }
        }
        self.executor.execute_batch(commands, &mut self.stage, now);

        let mode = runtime.mode();
        if mode != self.mode {
            info!(at = now, from = ?self.mode, to = ?mode, "交互模式切换");
            self.mode = mode;
        }
        Ok(())
    }

    fn summary(&self, runtime: &PetRuntime) {
        info!(
            executed = self.executor.executed(),
            voiceline = runtime.current_voiceline(),
            guard = ?runtime.guard().holder(),
            "回放结束"
        );
        for (track, state) in &self.stage.tracks {
            info!(
                track,
                current = ?state.current,
                queued = state.queued.len(),
                "轨道"
            );
        }
        if let Some(bgm) = &self.stage.bgm {
            info!(path = %bgm.path, volume = bgm.volume, "BGM");
        }
    }
}
