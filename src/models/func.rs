// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 闭包检测器适配器

use anyhow::Result;

use super::BaseDetector;
use crate::config::DetectOptions;
use crate::detection::RawDetection;
use crate::frame::Frame;

pub struct FnDetector<F> {
    name: String,
    detect: F,
    loads: usize,
    loaded: bool,
}

impl<F> FnDetector<F>
where
    F: FnMut(&Frame, &DetectOptions) -> Result<Vec<RawDetection>> + Send,
{
    pub fn new(name: impl Into<String>, detect: F) -> Self {
        Self {
            name: name.into(),
            detect,
            loads: 0,
            loaded: false,
        }
    }

    /// load() 被调用的次数
    pub fn load_count(&self) -> usize {
        self.loads
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

impl<F> BaseDetector for FnDetector<F>
where
    F: FnMut(&Frame, &DetectOptions) -> Result<Vec<RawDetection>> + Send,
{
    fn load(&mut self) -> Result<()> {
        self.loads += 1;
        self.loaded = true;
        Ok(())
    }

    fn detect_raw(&mut self, frame: &Frame, options: &DetectOptions) -> Result<Vec<RawDetection>> {
        (self.detect)(frame, options)
    }

    fn unload(&mut self) {
        self.loaded = false;
    }

    fn name(&self) -> &str {
        &self.name
    }
}
