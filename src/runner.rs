// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 帧处理工作线程 (Frame loop)
//!
//! 工作线程独占一个 `RefiningDetector`, 串行处理提交的帧。
//! 队列容量为1: 一帧处理中时最多再排队一帧, 其余帧由调用方丢弃或重试。
//! 结果队列容量为 [`RESULT_CAPACITY`]; 调用方需及时读取 `results()`,
//! 队列满时新结果被丢弃并记录警告。

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::detection::Detection;
use crate::error::Result;
use crate::frame::Frame;
use crate::models::BaseDetector;
use crate::pipeline::RefiningDetector;

/// 结果队列容量
pub const RESULT_CAPACITY: usize = 8;

/// 带时间戳的待处理帧
pub struct TimedFrame {
    pub frame_id: u64,
    pub frame: Frame,
    pub timestamp_millis: i64,
}

/// 处理结果 (工作线程 → 调用方)
pub struct FrameOutcome {
    pub frame_id: u64,
    pub result: Result<Vec<Detection>>,
}

/// 提交失败, 原帧退回给调用方
pub enum SubmitError {
    /// 队列已满
    Busy(TimedFrame),
    /// 工作线程已退出
    Stopped(TimedFrame),
}

impl std::fmt::Debug for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Busy(job) => write!(f, "Busy(frame {})", job.frame_id),
            SubmitError::Stopped(job) => write!(f, "Stopped(frame {})", job.frame_id),
        }
    }
}

pub struct FrameLoop<D: BaseDetector + 'static> {
    tx: Option<Sender<TimedFrame>>,
    results: Receiver<FrameOutcome>,
    handle: Option<JoinHandle<RefiningDetector<D>>>,
}

impl<D: BaseDetector + 'static> FrameLoop<D> {
    pub fn spawn(detector: RefiningDetector<D>) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded::<TimedFrame>(1);
        let (out_tx, out_rx) = crossbeam_channel::bounded::<FrameOutcome>(RESULT_CAPACITY);

        let handle = thread::Builder::new()
            .name("refine-worker".to_string())
            .spawn(move || {
                let mut detector = detector;
                info!("frame loop started");
                for job in rx.iter() {
                    let result = detector.detect_at(&job.frame, job.timestamp_millis);
                    let outcome = FrameOutcome {
                        frame_id: job.frame_id,
                        result,
                    };
                    match out_tx.try_send(outcome) {
                        Ok(()) => {}
                        Err(TrySendError::Full(outcome)) => {
                            warn!(frame_id = outcome.frame_id, "result queue full, outcome dropped");
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            debug!("result receiver dropped, stopping frame loop");
                            break;
                        }
                    }
                }
                info!("frame loop stopped");
                detector
            })?;

        Ok(Self {
            tx: Some(tx),
            results: out_rx,
            handle: Some(handle),
        })
    }

    /// 非阻塞提交; 队列满时返回 Busy
    pub fn submit(&self, job: TimedFrame) -> std::result::Result<(), SubmitError> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(SubmitError::Stopped(job));
        };
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => Err(SubmitError::Busy(job)),
            Err(TrySendError::Disconnected(job)) => Err(SubmitError::Stopped(job)),
        }
    }

    /// 阻塞提交, 等待队列空位
    pub fn submit_blocking(&self, job: TimedFrame) -> std::result::Result<(), SubmitError> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(SubmitError::Stopped(job));
        };
        tx.send(job).map_err(|e| SubmitError::Stopped(e.into_inner()))
    }

    pub fn results(&self) -> &Receiver<FrameOutcome> {
        &self.results
    }

    /// 关闭队列, 等待工作线程处理完已排队的帧, 释放并返回检测器
    pub fn stop(mut self) -> Option<RefiningDetector<D>> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<RefiningDetector<D>> {
        self.tx.take();
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(mut detector) => {
                detector.dispose();
                Some(detector)
            }
            Err(_) => None,
        }
    }
}

impl<D: BaseDetector + 'static> Drop for FrameLoop<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
