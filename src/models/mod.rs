/// 基础检测器接口与实现
///
/// # 架构说明
///
/// 精炼流水线不包含检测模型本身, 只通过 [`BaseDetector`] 调用外部检测器:
///
/// ```text
/// 预处理帧 → BaseDetector::detect_raw → Vec<RawDetection>
/// ```
///
/// ## 内置实现
/// - **ReplayDetector**: 从JSON脚本逐帧回放原始检测结果 (离线验证 / `sentinel` 二进制)
/// - **FnDetector**:     闭包适配器, 便于接入任意后端或测试
///
/// ## 使用示例
/// ```no_run
/// use sentinel_refine::models::ReplayDetector;
/// use sentinel_refine::{RefineConfig, RefiningDetector};
///
/// let replay = ReplayDetector::from_json_file("raw.json")?;
/// let mut detector = RefiningDetector::create(replay, RefineConfig::default())?;
/// # Ok::<(), anyhow::Error>(())
/// ```
use anyhow::Result;

use crate::config::DetectOptions;
use crate::detection::RawDetection;
use crate::frame::Frame;

/// 外部检测器统一接口
///
/// 后端错误对流水线不透明, 统一以 `anyhow::Error` 返回; 流水线不做重试。
pub trait BaseDetector: Send {
    /// 加载模型 (可能耗时较长); 重复调用会重新加载
    fn load(&mut self) -> Result<()>;

    /// 对一帧执行检测
    fn detect_raw(&mut self, frame: &Frame, options: &DetectOptions) -> Result<Vec<RawDetection>>;

    /// 释放模型资源
    fn unload(&mut self) {}

    fn name(&self) -> &str;
}

pub mod func;
pub mod replay;

pub use func::FnDetector;
pub use replay::ReplayDetector;
