//! 说明类面板：落地页、扫描前须知、上传前须知
//!
//! 只展示固定文字，不发请求

use crate::models::{PaneId, WizardStep};
use crate::panes::PaneView;

const MAIN_LINES: &[&str] = &["提交扫描件进行文字识别", "流程: 扫描 → 上传 → 元数据 → 识别设置 → 状态"];
const PRESCAN_LINES: &[&str] = &["建议 300dpi 以上的灰度或彩色扫描", "每页保存为单独的图片文件"];
const PREUPLOAD_LINES: &[&str] = &["支持常见图片格式，服务端统一转换为 PNG", "上传完成后需要填写元数据"];

/// 固定说明面板
#[derive(Debug, Clone)]
pub struct InfoPane {
    id: PaneId,
}

impl InfoPane {
    pub fn new(id: PaneId) -> Self {
        Self { id }
    }

    pub fn render(&self) -> PaneView {
        let (title, lines) = match self.id {
            PaneId::Main => ("Iris OCR", MAIN_LINES),
            PaneId::Step(WizardStep::PreScan) => ("扫描前须知", PRESCAN_LINES),
            PaneId::Step(WizardStep::PreUpload) => ("上传前须知", PREUPLOAD_LINES),
            PaneId::Step(step) => (step.name(), &[] as &[&str]),
        };

        PaneView::new(title).lines(lines.iter().map(|l| l.to_string()))
    }
}
