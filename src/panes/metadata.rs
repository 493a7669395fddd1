//! 元数据面板
//!
//! 表单字段全部非空才算完成；上传与元数据都完成后才允许提交

use crate::error::{AppResult, BusinessError};
use crate::panes::PaneView;
use crate::workflow::AppContext;
use std::collections::BTreeMap;
use tracing::info;

/// 表单中必须出现的字段
pub const REQUIRED_FIELDS: [&str; 2] = ["title", "notes"];

#[derive(Debug, Default)]
pub struct MetadataPane {
    missing: Vec<String>,
    submit_enabled: bool,
}

impl MetadataPane {
    pub fn new() -> Self {
        Self::default()
    }

    /// 填写表单，重新计算完成状态
    pub fn fill(&mut self, ctx: &mut AppContext, fields: &BTreeMap<String, String>) {
        ctx.batch
            .metadata
            .extend(fields.iter().map(|(k, v)| (k.clone(), v.trim().to_string())));
        self.missing = ctx.batch.missing_metadata(&REQUIRED_FIELDS);
        ctx.batch.metadata_complete = self.missing.is_empty();
        self.on_model_change(ctx);
    }

    /// 以 YAML 文件上传元数据
    pub async fn submit(&mut self, ctx: &mut AppContext) -> AppResult<String> {
        if !ctx.batch.upload_complete {
            return Err(BusinessError::UploadIncomplete.into());
        }
        if !self.submit_enabled {
            return Err(BusinessError::MetadataIncomplete {
                missing: self.missing.clone(),
            }
            .into());
        }

        let url = ctx.service.save_metadata(&mut ctx.batch).await?;
        info!("{} ✓ 元数据已保存", ctx);
        Ok(url)
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn on_model_change(&mut self, ctx: &AppContext) {
        self.submit_enabled = ctx.batch.metadata_complete && ctx.batch.upload_complete;
    }

    pub fn render(&self, ctx: &AppContext) -> PaneView {
        let mut view = PaneView::new("元数据");
        for (key, value) in &ctx.batch.metadata {
            view = view.line(format!("{}: {}", key, value));
        }
        if !self.missing.is_empty() {
            view = view.line(format!("缺少: {}", self.missing.join(", ")));
        }
        view
    }
}
