//! 上传面板
//!
//! 进入时若批次还没有ID则先创建批次；提交时整队上传扫描件

use crate::error::{AppResult, BusinessError};
use crate::infrastructure::UploadFile;
use crate::panes::PaneView;
use crate::utils::logging::progress_bar;
use crate::workflow::AppContext;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct UploadPane {
    queue: Vec<UploadFile>,
    uploaded: usize,
    total: usize,
    submit_enabled: bool,
}

impl UploadPane {
    pub fn new() -> Self {
        Self::default()
    }

    /// 批次没有ID时创建，返回新分配的ID
    pub async fn ensure_batch(&mut self, ctx: &mut AppContext) -> AppResult<Option<String>> {
        if ctx.batch.id().is_some() {
            return Ok(None);
        }
        let id = ctx.service.create(&mut ctx.batch).await?;
        Ok(Some(id))
    }

    /// 加入上传队列，已完成的上传状态随之失效
    pub fn enqueue(&mut self, ctx: &mut AppContext, files: Vec<UploadFile>) {
        ctx.batch.upload_complete = false;
        self.total += files.len();
        self.queue.extend(files);
        self.on_model_change(ctx);
    }

    /// 上传整个队列
    pub async fn submit(&mut self, ctx: &mut AppContext) -> AppResult<usize> {
        if !self.submit_enabled {
            return Err(BusinessError::UploadIncomplete.into());
        }

        let count = self.queue.len();
        info!("{} 📤 上传 {} 个扫描件...", ctx, count);

        let result = ctx.service.upload_scans(&mut ctx.batch, self.queue.clone()).await;
        // 文件已被服务端接收（仅回读文档列表失败）时同样出队，避免重复上传
        if result.is_ok() || ctx.batch.upload_complete {
            self.queue.clear();
            self.uploaded += count;
        }
        self.on_model_change(ctx);

        if let Err(e) = result {
            warn!("{} ⚠️ 上传失败，{} 个扫描件保留在队列中: {}", ctx, self.queue.len(), e);
            return Err(e);
        }

        info!("{} ✓ 上传完成，服务端共 {} 个文档", ctx, ctx.batch.documents.len());
        Ok(count)
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn progress(&self) -> Option<f64> {
        (self.total > 0).then(|| self.uploaded as f64 / self.total as f64)
    }

    pub fn on_model_change(&mut self, _ctx: &AppContext) {
        self.submit_enabled = !self.queue.is_empty();
    }

    pub fn render(&self, ctx: &AppContext) -> PaneView {
        PaneView::new("上传扫描件")
            .line(format!("批次: {}", ctx.batch.id().unwrap_or("(创建中)")))
            .line(format!("待上传: {}", self.queue.len()))
            .line(format!("进度: {}", progress_bar(self.progress(), 20)))
            .line(format!("已上传文档: {}", ctx.batch.documents.len()))
    }

    /// 清空未上传的队列
    pub fn dispose(&mut self) {
        self.queue.clear();
        self.submit_enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::infrastructure::{Method, RecordingTransport, Reply};
    use crate::models::Batch;
    use crate::services::BatchService;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_failed_upload_keeps_queue() {
        let transport = Arc::new(RecordingTransport::dry_run());
        transport.reply(
            Method::Post,
            "/api/v1/batch/b1/pages",
            Reply::Error {
                status: 503,
                message: "unavailable".into(),
            },
        );
        transport.reply(Method::Post, "/api/v1/batch/b1/pages", Reply::Json(serde_json::json!([])));
        let mut ctx = AppContext::new(Config::default(), BatchService::new(transport.clone()), 1)
            .with_batch(Batch::with_id("b1"));

        let mut pane = UploadPane::new();
        pane.enqueue(&mut ctx, vec![UploadFile::scan("p1.png", vec![1, 2])]);
        assert!(pane.submit(&mut ctx).await.is_err());

        assert_eq!(pane.queue.len(), 1);
        assert!(pane.submit_enabled());
        assert_eq!(pane.progress(), Some(0.0));
        assert!(!ctx.batch.upload_complete);

        // 重试时上传的仍是原来的文件
        assert_eq!(pane.submit(&mut ctx).await.unwrap(), 1);
        assert!(pane.queue.is_empty());
        assert!(!pane.submit_enabled());
        assert_eq!(pane.progress(), Some(1.0));

        let posts: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|c| c.method == Method::Post && c.path == "/api/v1/batch/b1/pages")
            .collect();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[1].files, vec!["p1.png".to_string()]);
    }
}
