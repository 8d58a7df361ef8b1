// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 流水线配置参数
pub mod detection; // 检测数据模型
pub mod error; // 错误类型
pub mod frame; // 帧缓冲
pub mod models; // 基础检测器接口与实现
pub mod pipeline; // 检测精炼流水线
pub mod runner; // 帧处理工作线程
pub mod utils; // 图像工具

pub use crate::config::{DetectOptions, RefineConfig};
pub use crate::detection::{
    find_target, BoundingBox, Detection, HistoryEntry, HistoryKey, RawDetection,
};
pub use crate::error::{RefineError, Result, Stage, StageError};
pub use crate::frame::{Frame, PixelRange};
pub use crate::models::{BaseDetector, FnDetector, ReplayDetector};
pub use crate::pipeline::{
    preprocess, suppress, FrameReport, LifecycleState, RefiningDetector, TemporalTracker,
};
pub use crate::runner::{FrameLoop, FrameOutcome, SubmitError, TimedFrame, RESULT_CAPACITY};

/// 当前 UTC 时间 (毫秒)
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
