// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 贪心非极大值抑制 (Greedy NMS)

use crate::detection::Boxed;

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

/// 按输入顺序贪心选择: 候选框与所有已选框的 IoU 都严格小于阈值时才保留。
///
/// 输入顺序即优先级顺序, 函数内部不排序。需要"高置信度优先"的调用方
/// 应先调用 [`sort_by_confidence`]。
pub fn suppress<T: Boxed>(detections: Vec<T>, iou_threshold: f32) -> Vec<T> {
    let mut selected: Vec<T> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let keep = selected
            .iter()
            .all(|s| s.bbox().iou(candidate.bbox()) < iou_threshold);
        if keep {
            selected.push(candidate);
        }
    }
    selected
}

/// 按置信度降序稳定排序
pub fn sort_by_confidence<T: Boxed>(detections: &mut [T]) {
    detections.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
}
