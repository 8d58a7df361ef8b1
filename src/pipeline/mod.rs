/// 检测精炼流水线 (Detection refinement pipeline)
///
/// 每帧按顺序执行:
/// - Preprocess: 归一化 + 对比度标准化 + 高斯平滑
/// - Detector:   外部基础检测器 (models::BaseDetector)
/// - Rescore:    区域重评分
/// - Suppress:   贪心 NMS
/// - Temporal:   滑动时间窗口一致性过滤
pub mod detector;
pub mod preprocess;
pub mod rescore;
pub mod suppress;
pub mod temporal;

pub use detector::{FrameReport, LifecycleState, RefiningDetector, StageCounts};
pub use preprocess::preprocess;
pub use rescore::{MaxIntensity, RegionMetric, RegionRescorer};
pub use suppress::{sort_by_confidence, suppress};
pub use temporal::TemporalTracker;
