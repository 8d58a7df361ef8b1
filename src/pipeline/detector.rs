// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 精炼检测器 (Refining detector)
//! 职责: 预处理 → 基础检测 → 区域重评分 → NMS → 时间一致性
//!
//! 唯一的公开入口。每次 `detect` 调用独占全部中间缓冲, 返回时释放;
//! 历史记录只由本对象持有, 调用方必须串行调用。

use std::time::Instant;

use tracing::{debug, debug_span, info, warn};

use super::preprocess::preprocess;
use super::rescore::{RegionMetric, RegionRescorer};
use super::suppress::{sort_by_confidence, suppress};
use super::temporal::TemporalTracker;
use crate::config::RefineConfig;
use crate::detection::Detection;
use crate::error::{RefineError, Result, Stage, StageError};
use crate::frame::Frame;
use crate::models::BaseDetector;

/// 生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    /// 终态
    Disposed,
}

/// 各阶段候选数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageCounts {
    pub raw: usize,
    pub rescored: usize,
    pub suppressed: usize,
    pub emitted: usize,
}

/// 单帧处理结果 (检测结果 + 统计)
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub detections: Vec<Detection>,
    pub counts: StageCounts,
    pub timings_ms: Vec<(Stage, f64)>, // 各阶段耗时
    pub total_ms: f64,
}

impl FrameReport {
    pub fn stage_ms(&self, stage: Stage) -> Option<f64> {
        self.timings_ms
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, ms)| *ms)
    }
}

pub struct RefiningDetector<D: BaseDetector> {
    detector: D,
    config: RefineConfig,
    rescorer: RegionRescorer,
    tracker: TemporalTracker,
    state: LifecycleState,
    frames: u64,
}

impl<D: BaseDetector> RefiningDetector<D> {
    pub fn new(detector: D, config: RefineConfig) -> Result<Self> {
        config.validate()?;
        let rescorer = RegionRescorer::new(
            config.base_confidence_threshold,
            config.analysis_resolution,
        );
        let tracker = TemporalTracker::new(
            config.retention_window_millis,
            config.min_consistent_frames,
            config.temporal_confidence_threshold,
        );
        Ok(Self {
            detector,
            config,
            rescorer,
            tracker,
            state: LifecycleState::Uninitialized,
            frames: 0,
        })
    }

    /// 创建并初始化
    pub fn create(detector: D, config: RefineConfig) -> Result<Self> {
        let mut this = Self::new(detector, config)?;
        this.initialize()?;
        Ok(this)
    }

    /// 替换区域置信度指标
    pub fn with_region_metric(mut self, metric: Box<dyn RegionMetric>) -> Self {
        self.rescorer = self.rescorer.with_metric(metric);
        self
    }

    /// 加载基础检测器并清空历史; 重复调用会重新加载模型
    pub fn initialize(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Disposed => return Err(RefineError::Disposed),
            LifecycleState::Ready => {
                warn!(detector = self.detector.name(), "initialize called twice, reloading base detector")
            }
            LifecycleState::Uninitialized => {}
        }

        let start = Instant::now();
        self.detector.load().map_err(RefineError::Load)?;
        self.tracker.clear();
        self.frames = 0;
        self.state = LifecycleState::Ready;
        info!(
            detector = self.detector.name(),
            metric = self.rescorer.metric_name(),
            load_ms = start.elapsed().as_secs_f64() * 1000.0,
            "refining detector ready"
        );
        Ok(())
    }

    /// 使用当前墙钟时间处理一帧
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        self.detect_at(frame, crate::now_millis())
    }

    pub fn detect_at(&mut self, frame: &Frame, now_millis: i64) -> Result<Vec<Detection>> {
        Ok(self.detect_report(frame, now_millis)?.detections)
    }

    /// 处理一帧并返回各阶段统计; 任一阶段失败时整帧失败, 不返回部分结果
    pub fn detect_report(&mut self, frame: &Frame, now_millis: i64) -> Result<FrameReport> {
        match self.state {
            LifecycleState::Uninitialized => return Err(RefineError::NotInitialized),
            LifecycleState::Disposed => return Err(RefineError::Disposed),
            LifecycleState::Ready => {}
        }

        self.frames += 1;
        let span = debug_span!("frame", seq = self.frames, now_millis);
        let _enter = span.enter();

        let total = Instant::now();
        let mut timings_ms = Vec::with_capacity(Stage::ALL.len());
        let mut counts = StageCounts::default();

        // 1. 预处理
        let t = Instant::now();
        let prepared = preprocess(frame).map_err(|e| self.stage_failed(Stage::Preprocess, e))?;
        timings_ms.push((Stage::Preprocess, elapsed_ms(t)));

        // 2. 基础检测
        let t = Instant::now();
        let raw = self
            .detector
            .detect_raw(&prepared, &self.config.detector)
            .map_err(|e| self.stage_failed(Stage::BaseDetector, StageError::Detector(e)))?;
        counts.raw = raw.len();
        timings_ms.push((Stage::BaseDetector, elapsed_ms(t)));

        // 3. 区域重评分
        let t = Instant::now();
        let mut rescored = self.rescorer.rescore(&raw, &prepared);
        counts.rescored = rescored.len();
        timings_ms.push((Stage::Rescore, elapsed_ms(t)));
        drop(prepared);

        // 4. NMS (默认保持检测器输出顺序作为优先级)
        let t = Instant::now();
        if self.config.sort_before_suppress {
            sort_by_confidence(&mut rescored);
        }
        let kept = suppress(rescored, self.config.iou_threshold);
        counts.suppressed = kept.len();
        timings_ms.push((Stage::Suppress, elapsed_ms(t)));

        // 5. 时间一致性
        let t = Instant::now();
        let detections = self.tracker.track(&kept, now_millis);
        counts.emitted = detections.len();
        timings_ms.push((Stage::Temporal, elapsed_ms(t)));

        let total_ms = elapsed_ms(total);
        debug!(
            raw = counts.raw,
            rescored = counts.rescored,
            suppressed = counts.suppressed,
            emitted = counts.emitted,
            total_ms,
            "frame refined"
        );

        Ok(FrameReport {
            detections,
            counts,
            timings_ms,
            total_ms,
        })
    }

    /// 释放检测器与历史记录; 之后不可再使用
    pub fn dispose(&mut self) {
        if self.state == LifecycleState::Disposed {
            return;
        }
        self.detector.unload();
        self.tracker.clear();
        self.state = LifecycleState::Disposed;
        info!(detector = self.detector.name(), frames = self.frames, "refining detector disposed");
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &TemporalTracker {
        &self.tracker
    }

    pub fn base_detector(&self) -> &D {
        &self.detector
    }

    fn stage_failed(&self, stage: Stage, source: StageError) -> RefineError {
        warn!(%stage, error = %source, "frame dropped");
        RefineError::stage(stage, source)
    }
}

fn elapsed_ms(t: Instant) -> f64 {
    t.elapsed().as_secs_f64() * 1000.0
}
