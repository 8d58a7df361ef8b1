// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 区域重评分 (Region re-scorer)
//!
//! 对每个候选框裁剪预处理后的区域, 缩放到分析分辨率, 计算区域指标作为第二置信度,
//! 与原始分数取平均。

use image::Rgb32FImage;
use ndarray::ArrayView3;
use rayon::prelude::*;
use tracing::debug;

use crate::detection::{Detection, RawDetection};
use crate::frame::Frame;
use crate::utils::resample::crop_and_resize;

/// 区域置信度指标
///
/// 指标公式是可替换的启发式; 返回值会被截断到 [0, 1] 再参与融合。
pub trait RegionMetric: Send + Sync {
    fn measure(&self, region: ArrayView3<f32>) -> f32;

    fn name(&self) -> &'static str;
}

/// 区域最大像素值
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxIntensity;

impl RegionMetric for MaxIntensity {
    fn measure(&self, region: ArrayView3<f32>) -> f32 {
        region
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |m| m.max(v))))
            .unwrap_or(0.0)
    }

    fn name(&self) -> &'static str {
        "max-intensity"
    }
}

pub struct RegionRescorer {
    threshold: f32,
    resolution: (u32, u32), // (宽, 高)
    metric: Box<dyn RegionMetric>,
}

impl RegionRescorer {
    pub fn new(threshold: f32, resolution: (u32, u32)) -> Self {
        Self {
            threshold,
            resolution,
            metric: Box::new(MaxIntensity),
        }
    }

    pub fn with_metric(mut self, metric: Box<dyn RegionMetric>) -> Self {
        self.metric = metric;
        self
    }

    pub fn metric_name(&self) -> &'static str {
        self.metric.name()
    }

    /// 重评分; 输出保持输入顺序 (后续 NMS 依赖该顺序)
    pub fn rescore(&self, raw: &[RawDetection], frame: &Frame) -> Vec<Detection> {
        let image = frame.to_rgb32f();
        raw.par_iter()
            // 低分候选直接丢弃, 避免区域分析开销
            .filter(|d| d.score >= self.threshold)
            .filter_map(|d| self.rescore_one(d, &image))
            .collect()
    }

    fn rescore_one(&self, raw: &RawDetection, image: &Rgb32FImage) -> Option<Detection> {
        let (w, h) = self.resolution;
        let region = match crop_and_resize(image, &raw.bbox, w, h) {
            Ok(region) => region,
            Err(e) => {
                debug!(class = %raw.class_label, bbox = ?raw.bbox, reason = ?e, "crop failed, candidate dropped");
                return None;
            }
        };

        let region_conf = self.metric.measure(region.view());
        let region_conf = if region_conf.is_finite() {
            region_conf.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let confidence = ((raw.score.clamp(0.0, 1.0) + region_conf) / 2.0).clamp(0.0, 1.0);

        if confidence < self.threshold {
            return None;
        }
        Some(Detection::new(raw.class_label.clone(), confidence, raw.bbox))
    }
}
