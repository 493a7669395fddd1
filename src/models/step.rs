//! 向导步骤
//!
//! 六个有序步骤加上落地页 `Main`

use serde::{Deserialize, Serialize};
use std::fmt;

/// 向导步骤（有序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WizardStep {
    /// 扫描前须知
    PreScan,
    /// 上传前须知
    PreUpload,
    /// 上传扫描件
    Upload,
    /// 填写元数据
    Metadata,
    /// 配置识别流水线
    PreProcess,
    /// 查看处理状态
    Status,
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        WizardStep::PreScan,
        WizardStep::PreUpload,
        WizardStep::Upload,
        WizardStep::Metadata,
        WizardStep::PreProcess,
        WizardStep::Status,
    ];

    /// 在步骤序列中的位置（从 0 开始）
    pub fn index(self) -> usize {
        self as usize
    }

    /// 路径片段
    pub fn segment(self) -> &'static str {
        match self {
            WizardStep::PreScan => "prescan",
            WizardStep::PreUpload => "preupload",
            WizardStep::Upload => "upload",
            WizardStep::Metadata => "metadata",
            WizardStep::PreProcess => "preprocess",
            WizardStep::Status => "status",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.segment() == segment)
    }

    /// 是否必须已有批次ID才能进入（Upload 之后的步骤）
    pub fn requires_batch_id(self) -> bool {
        self > WizardStep::Upload
    }

    /// 路径中是否携带批次ID（Upload 及之后）
    pub fn carries_batch_id(self) -> bool {
        self >= WizardStep::Upload
    }

    /// 标准名称
    pub fn name(self) -> &'static str {
        match self {
            WizardStep::PreScan => "PreScan",
            WizardStep::PreUpload => "PreUpload",
            WizardStep::Upload => "Upload",
            WizardStep::Metadata => "Metadata",
            WizardStep::PreProcess => "PreProcess",
            WizardStep::Status => "Status",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 面板标识：落地页或某个向导步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PaneId {
    Main,
    Step(WizardStep),
}

impl PaneId {
    pub fn step(self) -> Option<WizardStep> {
        match self {
            PaneId::Main => None,
            PaneId::Step(step) => Some(step),
        }
    }
}

impl From<WizardStep> for PaneId {
    fn from(step: WizardStep) -> Self {
        PaneId::Step(step)
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaneId::Main => f.write_str("Main"),
            PaneId::Step(step) => step.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_lookup() {
        for step in WizardStep::ALL {
            assert_eq!(WizardStep::from_segment(step.segment()), Some(step));
        }
        assert_eq!(WizardStep::from_segment("main"), None);
    }

    #[test]
    fn test_batch_id_requirements() {
        let required: Vec<_> = WizardStep::ALL
            .into_iter()
            .filter(|s| s.requires_batch_id())
            .collect();
        assert_eq!(
            required,
            vec![WizardStep::Metadata, WizardStep::PreProcess, WizardStep::Status]
        );
        assert!(WizardStep::Upload.carries_batch_id());
        assert!(!WizardStep::PreUpload.carries_batch_id());
    }
}
