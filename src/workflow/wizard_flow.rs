//! 向导流程 - 流程层
//!
//! 核心职责：定义"一次提交"走完向导的完整顺序
//!
//! 流程顺序：
//! 1. PreScan → PreUpload（说明）
//! 2. Upload：创建批次，改写路由为 `/upload/{id}`，上传扫描件
//! 3. Metadata：填写并保存元数据
//! 4. PreProcess：注册流水线并执行
//! 5. Status：轮询直到完成

use crate::aggregator::{BatchState, TaskGraphSummary};
use crate::error::{AppError, AppResult, BusinessError, FileError};
use crate::infrastructure::UploadFile;
use crate::models::{Batch, PaneId, Submission, WizardStep};
use crate::navigator::PaneNavigator;
use crate::panes::{Pane, PollOptions, PollOutcome};
use crate::workflow::app_context::AppContext;
use std::path::Path;
use tracing::{debug, info};

const UPLOAD: PaneId = PaneId::Step(WizardStep::Upload);
const METADATA: PaneId = PaneId::Step(WizardStep::Metadata);
const PREPROCESS: PaneId = PaneId::Step(WizardStep::PreProcess);
const STATUS: PaneId = PaneId::Step(WizardStep::Status);

/// 向导结束时的结果
#[derive(Debug, Clone)]
pub struct WizardReport {
    pub batch_id: String,
    pub outcome: PollOutcome,
}

impl WizardReport {
    pub fn summary(&self) -> Option<&TaskGraphSummary> {
        match &self.outcome {
            PollOutcome::Completed(summary) => Some(summary),
            PollOutcome::Exhausted(summary) => summary.as_ref(),
            PollOutcome::TornDown => None,
        }
    }

    /// 全部任务完成且没有失败
    pub fn succeeded(&self) -> bool {
        matches!(&self.outcome, PollOutcome::Completed(s) if s.state() != BatchState::Failed)
    }
}

/// 向导流程
///
/// - 持有本次提交的上下文和导航器
/// - 决定何时切换面板、何时提交
/// - 具体请求委托给各个面板
pub struct WizardFlow {
    ctx: AppContext,
    navigator: PaneNavigator,
}

impl WizardFlow {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            navigator: PaneNavigator::new(),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn navigator(&self) -> &PaneNavigator {
        &self.navigator
    }

    /// 从落地页开始走完整个向导
    pub async fn run_submission(&mut self, submission: &Submission) -> AppResult<WizardReport> {
        if submission.scans.is_empty() {
            return Err(BusinessError::NoScans {
                submission: submission.name.clone(),
            }
            .into());
        }
        let files = read_scans(submission).await?;

        self.render_current();
        self.show_next()?; // PreScan
        self.show_next()?; // PreUpload
        self.show_next()?; // Upload

        // ========== Upload ==========
        let Some(Pane::Upload(upload)) = self.navigator.pane_mut(UPLOAD) else {
            return Err(missing_pane(UPLOAD));
        };
        if let Some(id) = upload.ensure_batch(&mut self.ctx).await? {
            let route = self.navigator.replace(UPLOAD, Some(&id))?;
            debug!("{} 路由改写为 {}", self.ctx, route);
        }
        let Some(Pane::Upload(upload)) = self.navigator.pane_mut(UPLOAD) else {
            return Err(missing_pane(UPLOAD));
        };
        upload.enqueue(&mut self.ctx, files);
        upload.submit(&mut self.ctx).await?;
        self.render_current();

        // ========== Metadata ==========
        self.show_next()?;
        let Some(Pane::Metadata(metadata)) = self.navigator.pane_mut(METADATA) else {
            return Err(missing_pane(METADATA));
        };
        metadata.fill(&mut self.ctx, &submission.metadata);
        metadata.submit(&mut self.ctx).await?;

        // ========== PreProcess ==========
        self.show_next()?;
        let Some(Pane::PreProcess(preprocess)) = self.navigator.pane_mut(PREPROCESS) else {
            return Err(missing_pane(PREPROCESS));
        };
        preprocess.select(&self.ctx, submission.ocr.clone(), submission.binarization.clone());
        preprocess.submit(&mut self.ctx).await?;
        self.render_current();

        // ========== Status ==========
        self.show_next()?;
        self.poll_status().await
    }

    /// 直接打开 `/status/{id}` 并轮询
    pub async fn run_status(&mut self, batch_id: &str) -> AppResult<WizardReport> {
        let route = self.navigator.open(&format!("/status/{}", batch_id))?;
        let id = route.batch_id.unwrap_or_else(|| batch_id.to_string());
        self.ctx.batch = Batch::with_id(id);
        self.render_current();
        self.poll_status().await
    }

    async fn poll_status(&mut self) -> AppResult<WizardReport> {
        let options = PollOptions::from_config(&self.ctx.config);
        let Some(Pane::Status(status)) = self.navigator.pane_mut(STATUS) else {
            return Err(missing_pane(STATUS));
        };

        let outcome = status.poll_until_complete(&mut self.ctx, options).await?;
        self.render_current();

        Ok(WizardReport {
            batch_id: self.ctx.batch.require_id()?.to_string(),
            outcome,
        })
    }

    fn show_next(&mut self) -> AppResult<()> {
        let route = self.navigator.next(self.ctx.batch.id())?;
        debug!("{} ➡️ {}", self.ctx, route);
        self.render_current();
        Ok(())
    }

    fn render_current(&mut self) {
        if let Some(pane) = self.navigator.current_pane_mut() {
            let view = pane.render(&self.ctx);
            info!("{} {}", self.ctx, view);
        }
    }

    /// 销毁全部面板，停止可能仍在进行的轮询
    pub fn teardown(&mut self) {
        self.navigator.dispose_all();
    }
}

fn missing_pane(id: PaneId) -> AppError {
    AppError::Other(format!("面板 {} 未初始化", id))
}

/// 读取提交中的全部扫描件
async fn read_scans(submission: &Submission) -> AppResult<Vec<UploadFile>> {
    let mut files = Vec::new();
    for path in submission.scan_paths() {
        let path_text = path.display().to_string();
        if !path.exists() {
            return Err(FileError::NotFound { path: path_text }.into());
        }
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AppError::file_read_failed(&path_text, e))?;
        files.push(UploadFile::scan(file_name(&path), bytes));
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "scan.png".to_string())
}
