//! 识别设置面板
//!
//! 至少选一种语言才允许提交；批次还没有任务时注册默认流水线并执行

use crate::error::{AppResult, BusinessError};
use crate::models::{BatchHandle, NlbinParams, OcrSelection, Script};
use crate::panes::PaneView;
use crate::services::{build_pipeline, validate_pipeline};
use crate::workflow::AppContext;
use tracing::info;

#[derive(Debug, Default)]
pub struct PreProcessPane {
    selection: OcrSelection,
    binarization: NlbinParams,
    submit_enabled: bool,
}

impl PreProcessPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, ctx: &AppContext, selection: OcrSelection, binarization: NlbinParams) {
        self.selection = selection;
        self.binarization = binarization;
        self.on_model_change(ctx);
    }

    /// 注册流水线并执行批次
    ///
    /// 批次已有任务时什么都不做，返回 None
    pub async fn submit(&mut self, ctx: &mut AppContext) -> AppResult<Option<BatchHandle>> {
        if !self.submit_enabled {
            return Err(BusinessError::NoLanguageSelected.into());
        }
        if !ctx.batch.tasks.is_empty() {
            info!("{} 批次已有 {} 个任务，跳过注册", ctx, ctx.batch.tasks.len());
            return Ok(None);
        }

        let pipeline = build_pipeline(&ctx.batch, &self.selection, &self.binarization)?;
        if ctx.config.validate_tasks {
            let catalogue = ctx.service.available_tasks().await?;
            validate_pipeline(&pipeline, &catalogue)?;
        }

        info!("{} ⚙️ 注册 {} 个任务...", ctx, pipeline.len());
        ctx.service.add_tasks(&mut ctx.batch, pipeline).await?;

        let handle = ctx.service.execute(&ctx.batch).await?;
        Ok(Some(handle))
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn on_model_change(&mut self, _ctx: &AppContext) {
        self.submit_enabled = self.selection.has_languages();
    }

    pub fn render(&self, ctx: &AppContext) -> PaneView {
        let engine = match self.selection.font_model() {
            Some(model) => format!("kraken ({})", model),
            None => "tesseract".to_string(),
        };
        let script = match self.selection.font_script() {
            Some(Script::Greek) => "希腊文",
            Some(Script::Arabic) => "阿拉伯文",
            Some(Script::Syriac) => "叙利亚文",
            None => "-",
        };

        PaneView::new("识别设置")
            .line(format!("语言: {}", self.selection.languages.join(", ")))
            .line(format!("字体面板: {}", script))
            .line(format!("识别引擎: {}", engine))
            .line(format!("已注册任务: {}", ctx.batch.tasks.len()))
    }
}
