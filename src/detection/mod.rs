/// 检测数据模型 (Detection data model)
///
/// - RawDetection: 基础检测器输出
/// - Detection:    精炼后的检测结果
/// - HistoryKey:   跨帧关联键
pub mod types;

pub use types::{
    find_target, BoundingBox, Boxed, Detection, HistoryEntry, HistoryKey, RawDetection,
};
