// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 错误类型 (Error types)

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RefineError>;

/// 流水线阶段 (pipeline stage names)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Preprocess,
    BaseDetector,
    Rescore,
    Suppress,
    Temporal,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Preprocess,
        Stage::BaseDetector,
        Stage::Rescore,
        Stage::Suppress,
        Stage::Temporal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::BaseDetector => "base-detector",
            Stage::Rescore => "rescore",
            Stage::Suppress => "suppress",
            Stage::Temporal => "temporal",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 单个阶段内的失败
#[derive(Debug, Error)]
pub enum StageError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("base detector failed: {0:#}")]
    Detector(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum RefineError {
    #[error("detector not initialized")]
    NotInitialized,

    #[error("detector disposed")]
    Disposed,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("base detector failed to load: {0:#}")]
    Load(anyhow::Error),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RefineError {
    pub fn stage(stage: Stage, source: StageError) -> Self {
        Self::Stage { stage, source }
    }

    /// 失败的阶段 (None 表示非阶段错误)
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
