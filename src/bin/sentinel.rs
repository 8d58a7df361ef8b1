// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 数字卫兵回放工具 (Sentinel replay)
///
/// 读取一个目录中的图像帧与一份基础检测器输出脚本,
/// 逐帧运行精炼流水线, 每帧输出一行JSON结果。
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sentinel_refine::{find_target, Detection, Frame, RefineConfig, RefiningDetector, ReplayDetector};

#[derive(Parser, Debug)]
#[command(author, version, about = "数字卫兵 - 检测结果精炼回放", long_about = None)]
struct Args {
    /// 图像帧目录 (按文件名排序)
    #[arg(long)]
    frames: PathBuf,

    /// 基础检测器输出脚本 (JSON, 每帧一个检测数组)
    #[arg(long)]
    detections: PathBuf,

    /// 流水线配置文件, 不存在时写入默认值
    #[arg(long)]
    config: Option<PathBuf>,

    /// 回放帧率, 决定每帧的时间戳
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// 目标类别, 出现时输出告警
    #[arg(long)]
    target: Option<String>,

    /// JSON格式日志
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

#[derive(Serialize)]
struct FrameLine<'a> {
    frame: usize,
    file: String,
    timestamp_millis: i64,
    detections: &'a [Detection],
    total_ms: f64,
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg" | "bmp"))
            .unwrap_or(false);
        if is_image {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    if args.fps == 0 {
        anyhow::bail!("--fps must be positive");
    }

    let config = match &args.config {
        Some(path) => RefineConfig::load(path),
        None => RefineConfig::default(),
    };
    config.summary();

    let replay = ReplayDetector::from_json_file(&args.detections)?;
    let mut detector = RefiningDetector::create(replay, config)?;

    let frames = list_frames(&args.frames)?;
    info!(frames = frames.len(), dir = %args.frames.display(), "replay started");

    let mut emitted = 0usize;
    for (i, path) in frames.iter().enumerate() {
        let img = image::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let frame = Frame::from_dynamic(&img);
        let timestamp_millis = i as i64 * 1000 / args.fps as i64;

        let report = match detector.detect_report(&frame, timestamp_millis) {
            Ok(report) => report,
            Err(e) => {
                warn!(frame = i, error = %e, "frame skipped");
                continue;
            }
        };
        emitted += report.detections.len();

        if let Some(label) = args.target.as_deref() {
            if let Some(hit) = find_target(&report.detections, label) {
                info!(
                    frame = i,
                    class = %hit.class_label,
                    confidence = hit.confidence_percent(),
                    "🎯 target detected ({}%)",
                    hit.confidence_percent()
                );
            }
        }

        let line = FrameLine {
            frame: i,
            file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            timestamp_millis,
            detections: &report.detections,
            total_ms: report.total_ms,
        };
        println!("{}", serde_json::to_string(&line)?);
    }

    detector.dispose();
    info!(frames = frames.len(), emitted, "replay finished");
    Ok(())
}
