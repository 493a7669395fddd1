//! 面板层
//!
//! 每个向导步骤对应 `Pane` 的一个变体，统一约定：
//! - `render` 生成文本视图
//! - `on_model_change` 在批次模型变化后重新计算派生状态
//! - `dispose` 释放资源（状态面板取消轮询）

pub mod info;
pub mod metadata;
pub mod preprocess;
pub mod status;
pub mod upload;

pub use info::InfoPane;
pub use metadata::{MetadataPane, REQUIRED_FIELDS};
pub use preprocess::PreProcessPane;
pub use status::{PollOptions, PollOutcome, StatusPane, TeardownHandle};
pub use upload::UploadPane;

use crate::models::{PaneId, WizardStep};
use crate::workflow::AppContext;
use std::fmt;

/// 面板的文本视图
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaneView {
    pub title: String,
    pub lines: Vec<String>,
}

impl PaneView {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn lines(mut self, lines: impl IntoIterator<Item = String>) -> Self {
        self.lines.extend(lines);
        self
    }
}

impl fmt::Display for PaneView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "【{}】", self.title)?;
        for line in &self.lines {
            write!(f, "\n  {}", line)?;
        }
        Ok(())
    }
}

/// 向导面板
pub enum Pane {
    Main(InfoPane),
    PreScan(InfoPane),
    PreUpload(InfoPane),
    Upload(UploadPane),
    Metadata(MetadataPane),
    PreProcess(PreProcessPane),
    Status(StatusPane),
}

impl Pane {
    /// 为指定步骤构建新面板
    pub fn build(id: PaneId) -> Self {
        match id {
            PaneId::Main => Pane::Main(InfoPane::new(id)),
            PaneId::Step(WizardStep::PreScan) => Pane::PreScan(InfoPane::new(id)),
            PaneId::Step(WizardStep::PreUpload) => Pane::PreUpload(InfoPane::new(id)),
            PaneId::Step(WizardStep::Upload) => Pane::Upload(UploadPane::new()),
            PaneId::Step(WizardStep::Metadata) => Pane::Metadata(MetadataPane::new()),
            PaneId::Step(WizardStep::PreProcess) => Pane::PreProcess(PreProcessPane::new()),
            PaneId::Step(WizardStep::Status) => Pane::Status(StatusPane::new()),
        }
    }

    pub fn id(&self) -> PaneId {
        match self {
            Pane::Main(_) => PaneId::Main,
            Pane::PreScan(_) => WizardStep::PreScan.into(),
            Pane::PreUpload(_) => WizardStep::PreUpload.into(),
            Pane::Upload(_) => WizardStep::Upload.into(),
            Pane::Metadata(_) => WizardStep::Metadata.into(),
            Pane::PreProcess(_) => WizardStep::PreProcess.into(),
            Pane::Status(_) => WizardStep::Status.into(),
        }
    }

    pub fn render(&mut self, ctx: &AppContext) -> PaneView {
        self.on_model_change(ctx);
        match self {
            Pane::Main(pane) | Pane::PreScan(pane) | Pane::PreUpload(pane) => pane.render(),
            Pane::Upload(pane) => pane.render(ctx),
            Pane::Metadata(pane) => pane.render(ctx),
            Pane::PreProcess(pane) => pane.render(ctx),
            Pane::Status(pane) => pane.render(ctx),
        }
    }

    pub fn on_model_change(&mut self, ctx: &AppContext) {
        match self {
            Pane::Main(_) | Pane::PreScan(_) | Pane::PreUpload(_) => {}
            Pane::Upload(pane) => pane.on_model_change(ctx),
            Pane::Metadata(pane) => pane.on_model_change(ctx),
            Pane::PreProcess(pane) => pane.on_model_change(ctx),
            Pane::Status(pane) => pane.on_model_change(ctx),
        }
    }

    pub fn dispose(&mut self) {
        match self {
            Pane::Upload(pane) => pane.dispose(),
            Pane::Status(pane) => pane.dispose(),
            _ => {}
        }
    }

    /// 当前步骤是否允许提交（说明类面板总是允许）
    pub fn submit_enabled(&self) -> bool {
        match self {
            Pane::Main(_) | Pane::PreScan(_) | Pane::PreUpload(_) => true,
            Pane::Upload(pane) => pane.submit_enabled(),
            Pane::Metadata(pane) => pane.submit_enabled(),
            Pane::PreProcess(pane) => pane.submit_enabled(),
            Pane::Status(_) => false,
        }
    }
}
