// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 回放检测器: 从JSON脚本逐帧输出预先录制的原始检测
//!
//! 脚本格式为帧数组, 每帧是 `RawDetection` 数组:
//! `[[{"class":"person","score":0.99,"bbox":{"x":0,"y":0,"width":10,"height":10}}], []]`

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use super::BaseDetector;
use crate::config::DetectOptions;
use crate::detection::RawDetection;
use crate::frame::Frame;

pub struct ReplayDetector {
    frames: Vec<Vec<RawDetection>>,
    cursor: usize,
    looping: bool,
    loaded: bool,
}

impl ReplayDetector {
    pub fn new(frames: Vec<Vec<RawDetection>>) -> Self {
        Self {
            frames,
            cursor: 0,
            looping: false,
            loaded: false,
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read replay script {}", path.display()))?;
        let frames: Vec<Vec<RawDetection>> = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse replay script {}", path.display()))?;
        Ok(Self::new(frames))
    }

    /// 脚本结束后从头循环 (默认结束后返回空结果)
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl BaseDetector for ReplayDetector {
    fn load(&mut self) -> Result<()> {
        self.cursor = 0;
        self.loaded = true;
        info!(frames = self.frames.len(), "replay script loaded");
        Ok(())
    }

    fn detect_raw(&mut self, _frame: &Frame, options: &DetectOptions) -> Result<Vec<RawDetection>> {
        if !self.loaded {
            bail!("replay detector not loaded");
        }
        if self.looping && !self.frames.is_empty() && self.cursor >= self.frames.len() {
            self.cursor = 0;
        }
        let raw = self.frames.get(self.cursor).cloned().unwrap_or_default();
        self.cursor += 1;
        Ok(options.apply(raw))
    }

    fn unload(&mut self) {
        self.loaded = false;
    }

    fn name(&self) -> &str {
        "replay"
    }
}
