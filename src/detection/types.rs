// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测系统数据结构定义
/// Data structures for the refinement pipeline
use serde::{Deserialize, Serialize};

// ========== 数据结构 ==========

/// 检测框 (像素坐标, 左上角 + 宽高)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// 宽高为负时截断为0
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    // 反序列化得到的负宽高按0处理
    pub fn xmax(&self) -> f32 {
        self.x + self.width.max(0.0)
    }

    pub fn ymax(&self) -> f32 {
        self.y + self.height.max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_degenerate(&self) -> bool {
        self.area() <= 0.0
    }

    pub fn intersection_area(&self, another: &BoundingBox) -> f32 {
        let overlap_w = self.xmax().min(another.xmax()) - self.x.max(another.x);
        let overlap_h = self.ymax().min(another.ymax()) - self.y.max(another.y);
        overlap_w.max(0.0) * overlap_h.max(0.0)
    }

    pub fn union_area(&self, another: &BoundingBox) -> f32 {
        self.area() + another.area() - self.intersection_area(another)
    }

    /// 交并比; 并集为0 (两框都退化) 时视为不重叠
    pub fn iou(&self, another: &BoundingBox) -> f32 {
        let intersection = self.intersection_area(another);
        let union = self.area() + another.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// 基础检测器原始输出 (external detector output)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    #[serde(rename = "class")]
    pub class_label: String,
    pub score: f32,
    #[serde(rename = "bbox")]
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new(class_label: impl Into<String>, score: f32, bbox: BoundingBox) -> Self {
        Self {
            class_label: class_label.into(),
            score,
            bbox,
        }
    }
}

/// 精炼后的检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f32,
    #[serde(rename = "bbox")]
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_label: class_label.into(),
            confidence,
            bbox,
        }
    }

    /// 整数百分比置信度 (用于告警文本)
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }

    pub fn history_key(&self) -> HistoryKey {
        HistoryKey::of(&self.class_label, &self.bbox)
    }
}

/// 带检测框的对象 (NMS 对原始检测与精炼检测通用)
pub trait Boxed {
    fn bbox(&self) -> &BoundingBox;
    fn confidence(&self) -> f32;
}

impl Boxed for RawDetection {
    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    fn confidence(&self) -> f32 {
        self.score
    }
}

impl Boxed for Detection {
    fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// 按类别名查找目标 (不区分大小写), 返回第一个命中
pub fn find_target<'a>(detections: &'a [Detection], label: &str) -> Option<&'a Detection> {
    detections
        .iter()
        .find(|d| d.class_label.eq_ignore_ascii_case(label))
}

/// 跨帧关联键: 类别 + 左上角取整坐标
///
/// 这是粗粒度空间哈希, 不是目标身份; 相邻帧左上角移动不足一个取整单位时命中同一键。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoryKey {
    pub class_label: String,
    pub x: i64,
    pub y: i64,
}

impl HistoryKey {
    pub fn of(class_label: &str, bbox: &BoundingBox) -> Self {
        Self {
            class_label: class_label.to_string(),
            x: round_half_up(bbox.x),
            y: round_half_up(bbox.y),
        }
    }
}

impl std::fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.class_label, self.x, self.y)
    }
}

// x.5 向正无穷取整, 负坐标与正坐标一致
fn round_half_up(v: f32) -> i64 {
    (v as f64 + 0.5).floor() as i64
}

/// 历史记录条目
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub confidence: f32,
    pub timestamp_millis: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_identical_box_is_one() {
        let b = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert!((b.iou(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_and_touching() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 10.0, 10.0);
        let touching = BoundingBox::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.iou(&touching), 0.0);
    }

    #[test]
    fn test_iou_degenerate_boxes() {
        let a = BoundingBox::new(5.0, 5.0, 0.0, 0.0);
        let b = BoundingBox::new(5.0, 5.0, 0.0, 0.0);
        let c = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.iou(&c), 0.0);
        assert_eq!(c.iou(&a), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 10.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_size_clamped() {
        let b = BoundingBox::new(1.0, 1.0, -4.0, 3.0);
        assert_eq!(b.width, 0.0);
        assert!(b.is_degenerate());
    }

    #[test]
    fn test_history_key_rounding() {
        let k1 = HistoryKey::of("person", &BoundingBox::new(10.4, 19.6, 5.0, 5.0));
        let k2 = HistoryKey::of("person", &BoundingBox::new(9.6, 20.2, 8.0, 8.0));
        assert_eq!(k1, k2);
        assert_eq!(k1.to_string(), "person_10_20");

        let half = HistoryKey::of("cat", &BoundingBox::new(2.5, -2.5, 1.0, 1.0));
        assert_eq!((half.x, half.y), (3, -2));
    }

    #[test]
    fn test_find_target_case_insensitive() {
        let dets = vec![
            Detection::new("cup", 0.99, BoundingBox::default()),
            Detection::new("Person", 0.985, BoundingBox::default()),
        ];
        let hit = find_target(&dets, "person").map(|d| d.confidence_percent());
        assert_eq!(hit, Some(99));
        assert!(find_target(&dets, "dog").is_none());
    }

    #[test]
    fn test_raw_detection_json_field_names() {
        let json = r#"{"class":"person","score":0.99,"bbox":{"x":1.0,"y":2.0,"width":3.0,"height":4.0}}"#;
        let raw: RawDetection = serde_json::from_str(json).unwrap();
        assert_eq!(raw.class_label, "person");
        assert_eq!(raw.bbox, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
    }
}
