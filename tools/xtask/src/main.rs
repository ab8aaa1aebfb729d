//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-runtime`: 运行 pet-runtime 覆盖率
//! - `voiceline-check`: 检查语音库（时间轴、字幕语言、音频引用）

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pet_runtime::{DiagnosticResult, VoicelineLibrary, analyze_library};
use walkdir::WalkDir;
use xshell::{Shell, cmd};

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => {
            let sh = Shell::new()?;
            eprintln!("\n==> cargo fmt --all -- --check");
            cmd!(sh, "cargo fmt --all -- --check").run()?;
            eprintln!("\n==> cargo clippy --workspace --all-targets");
            cmd!(sh, "cargo clippy --workspace --all-targets").run()?;
            eprintln!("\n==> cargo test --workspace");
            cmd!(sh, "cargo test --workspace").run()?;
        }
        "cov-runtime" => {
            let sh = Shell::new()?;
            if cmd!(sh, "cargo llvm-cov --version").quiet().run().is_err() {
                anyhow::bail!(
                    "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
                );
            }
            eprintln!("\n==> cargo llvm-cov -p pet-runtime --html");
            cmd!(sh, "cargo llvm-cov -p pet-runtime --html").run()?;
            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "voiceline-check" => {
            let path = args.next();
            voiceline_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all         运行 fmt、clippy、test 门禁检查
  cov-runtime       运行 pet-runtime 覆盖率报告
  voiceline-check   检查语音库

VOICELINE-CHECK:
  cargo xtask voiceline-check [path]

  不带参数：检查 assets/voicelines/ 下所有 .json 文件
  带路径参数：检查指定文件或目录

  检查内容：
    - JSON 格式错误
    - 空语音、越界片段、越界时长
    - 字幕语言缺失、重复音频
    - 音频文件是否存在（相对于 assets/）

ALIASES (in .cargo/config.toml):
  cargo check-all        -> cargo xtask check-all
  cargo cov-runtime      -> cargo xtask cov-runtime
  cargo voiceline-check  -> cargo xtask voiceline-check
"#
    );
}

//=============================================================================
// voiceline-check 命令实现
//=============================================================================

/// 检查配置
struct VoicelineCheckConfig {
    /// 语音库目录（相对于 workspace root）
    voicelines_dir: PathBuf,
    /// 资源根目录（相对于 workspace root）
    assets_root: PathBuf,
}

impl Default for VoicelineCheckConfig {
    fn default() -> Self {
        Self {
            voicelines_dir: PathBuf::from("assets/voicelines"),
            assets_root: PathBuf::from("assets"),
        }
    }
}

/// 检查结果
struct VoicelineCheckResult {
    libraries_checked: usize,
    parse_errors: usize,
    diagnostics: DiagnosticResult,
    /// (语音库, 音频路径)
    missing_audio: Vec<(String, String)>,
}

fn voiceline_check(path: Option<&str>) -> anyhow::Result<()> {
    let config = VoicelineCheckConfig::default();

    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_library_files(&path)
            } else {
                anyhow::bail!("路径不存在: {}", p);
            }
        }
        None => {
            if !config.voicelines_dir.exists() {
                anyhow::bail!(
                    "默认语音库目录不存在: {}\n请在 workspace 根目录运行，或指定语音库路径",
                    config.voicelines_dir.display()
                );
            }
            collect_library_files(&config.voicelines_dir)
        }
    };

    if files.is_empty() {
        eprintln!("未找到语音库文件（.json）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个语音库...\n", files.len());

    let mut result = VoicelineCheckResult {
        libraries_checked: 0,
        parse_errors: 0,
        diagnostics: DiagnosticResult::new(),
        missing_audio: Vec::new(),
    };

    for file in &files {
        check_library_file(file, &config, &mut result);
    }

    print_check_result(&result);

    if result.parse_errors > 0 || result.diagnostics.has_errors() {
        anyhow::bail!("语音库检查发现错误");
    }

    Ok(())
}

/// 收集目录下的所有语音库文件
fn collect_library_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

fn check_library_file(
    file: &Path,
    config: &VoicelineCheckConfig,
    result: &mut VoicelineCheckResult,
) {
    let library_id = file.display().to_string();
    result.libraries_checked += 1;

    let content = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ERROR] {}: 无法读取文件 - {}", library_id, e);
            result.parse_errors += 1;
            return;
        }
    };

    let library = match VoicelineLibrary::from_json(&content) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("[ERROR] {}: {}", library_id, e);
            result.parse_errors += 1;
            return;
        }
    };

    result
        .diagnostics
        .merge(analyze_library(&library_id, &library));

    let mut audio_refs: Vec<&String> = library.intro_voice.iter().collect();
    for line in &library.lines {
        audio_refs.extend(line.segments.iter().map(|s| &s.audio));
    }
    for audio in audio_refs {
        if !config.assets_root.join(audio).exists() {
            let missing = (library_id.clone(), audio.clone());
            result.missing_audio.push(missing);
        }
    }
}

fn print_check_result(result: &VoicelineCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个语音库", result.libraries_checked);
    eprintln!();

    for diag in &result.diagnostics.diagnostics {
        eprintln!("{}", diag);
    }

    for (library_id, audio) in &result.missing_audio {
        eprintln!("[WARN] {}: 音频不存在 {}", library_id, audio);
    }

    let error_count = result.parse_errors + result.diagnostics.error_count();
    let warn_count = result.diagnostics.warn_count() + result.missing_audio.len();

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
