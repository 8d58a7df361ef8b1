// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 精炼流水线配置 - 通过JSON文件调整参数

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::detection::{Boxed, RawDetection};
use crate::error::{RefineError, Result};
use crate::pipeline::suppress;

/// 基础检测器请求参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectOptions {
    pub max_boxes: usize, // 最大检测框数
    pub min_score: f32,   // 初始置信度下限 (偏低以提高召回)
    pub iou_threshold: f32, // 检测器内部NMS阈值
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            max_boxes: 100,
            min_score: 0.3,
            iou_threshold: 0.5,
        }
    }
}

impl DetectOptions {
    /// 按请求参数整理检测器原始输出: 过滤低分 → 按分数降序 → NMS → 截断
    pub fn apply(&self, mut raw: Vec<RawDetection>) -> Vec<RawDetection> {
        raw.retain(|d| d.score >= self.min_score);
        raw.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
        let mut kept = suppress::suppress(raw, self.iou_threshold);
        kept.truncate(self.max_boxes);
        kept
    }
}

/// 精炼流水线参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    // === 区域重评分 ===
    pub base_confidence_threshold: f32, // 基础置信度阈值
    pub analysis_resolution: (u32, u32), // 区域分析分辨率 (宽, 高)

    // === NMS ===
    pub iou_threshold: f32,
    pub sort_before_suppress: bool, // NMS前按置信度降序排序

    // === 时间一致性 ===
    pub retention_window_millis: i64,
    pub min_consistent_frames: usize,
    pub temporal_confidence_threshold: f32, // 平均置信度须超过此值

    // === 基础检测器 ===
    pub detector: DetectOptions,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            base_confidence_threshold: 0.98,
            analysis_resolution: (224, 224),

            iou_threshold: 0.5,
            sort_before_suppress: false,

            retention_window_millis: 1000,
            min_consistent_frames: 3,
            temporal_confidence_threshold: 0.98,

            detector: DetectOptions::default(),
        }
    }
}

impl RefineConfig {
    /// 从JSON文件加载配置; 文件不存在时写出默认配置, 解析失败时使用默认值
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => match Self::from_json_str(&json) {
                Ok(config) => {
                    info!(path = %path.display(), "config loaded");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config parse failed, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "config file missing, writing defaults");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!(path = %path.display(), error = %e, "failed to write default config");
                }
                config
            }
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(RefineError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, v
                )))
            }
        };
        unit("base_confidence_threshold", self.base_confidence_threshold)?;
        unit("iou_threshold", self.iou_threshold)?;
        unit("temporal_confidence_threshold", self.temporal_confidence_threshold)?;
        unit("detector.min_score", self.detector.min_score)?;
        unit("detector.iou_threshold", self.detector.iou_threshold)?;

        if self.analysis_resolution.0 == 0 || self.analysis_resolution.1 == 0 {
            return Err(RefineError::InvalidConfig(
                "analysis_resolution must be non-zero".to_string(),
            ));
        }
        if self.min_consistent_frames == 0 {
            return Err(RefineError::InvalidConfig(
                "min_consistent_frames must be at least 1".to_string(),
            ));
        }
        if self.retention_window_millis <= 0 {
            return Err(RefineError::InvalidConfig(format!(
                "retention_window_millis must be positive, got {}",
                self.retention_window_millis
            )));
        }
        Ok(())
    }

    /// 打印当前配置
    pub fn summary(&self) {
        info!(
            base_threshold = self.base_confidence_threshold,
            iou_threshold = self.iou_threshold,
            retention_ms = self.retention_window_millis,
            min_frames = self.min_consistent_frames,
            temporal_threshold = self.temporal_confidence_threshold,
            resolution = ?self.analysis_resolution,
            "refine config"
        );
    }
}
