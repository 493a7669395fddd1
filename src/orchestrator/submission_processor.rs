//! 单个提交处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **流程调度**：为提交创建上下文和 `WizardFlow`
//! 2. **资源清理**：无论成败都销毁面板，停止轮询
//! 3. **结果收尾**：失败任务写入记录文件，按需下载结果
//! 4. **统计输出**：记录文档成功/失败数量

use crate::config::Config;
use crate::infrastructure::Transport;
use crate::models::Submission;
use crate::services::{BatchService, FailureWriter, ResultDownloader};
use crate::utils::logging::truncate_text;
use crate::workflow::{AppContext, WizardFlow, WizardReport};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 处理单个提交
///
/// # 参数
/// - `submission`: 提交数据
/// - `index`: 提交序号（用于日志）
/// - `config`: 配置
/// - `transport`: 共享的传输层
///
/// # 返回
/// 全部任务成功返回 true
pub async fn process_submission(
    submission: Submission,
    index: usize,
    config: &Config,
    transport: Arc<dyn Transport>,
) -> Result<bool> {
    log_submission_start(index, &submission);

    let service = BatchService::new(transport);
    let mut flow = WizardFlow::new(AppContext::new(config.clone(), service.clone(), index));

    let result = flow.run_submission(&submission).await;
    flow.teardown();
    let report = result.with_context(|| format!("提交 {} 处理失败", submission.name))?;

    finish_report(&report, &submission.name, index, config, &service).await
}

/// 只查看已有批次的状态
pub async fn process_status(
    batch_id: &str,
    config: &Config,
    transport: Arc<dyn Transport>,
) -> Result<bool> {
    info!("🔎 查看批次 {} 的状态", batch_id);

    let service = BatchService::new(transport);
    let mut flow = WizardFlow::new(AppContext::new(config.clone(), service.clone(), 1));

    let result = flow.run_status(batch_id).await;
    flow.teardown();
    let report = result.with_context(|| format!("无法获取批次 {} 的状态", batch_id))?;

    finish_report(&report, batch_id, 1, config, &service).await
}

/// 写失败记录、下载结果并输出统计
async fn finish_report(
    report: &WizardReport,
    name: &str,
    index: usize,
    config: &Config,
    service: &BatchService,
) -> Result<bool> {
    let Some(summary) = report.summary() else {
        warn!("[提交 {}] ⚠️ 批次 {} 没有任务状态", index, report.batch_id);
        return Ok(false);
    };

    if let Err(e) = FailureWriter::with_path(&config.failure_log_file).write(name, &report.batch_id, &summary.failures) {
        error!("[提交 {}] 写入失败记录失败: {}", index, e);
    }

    if let Some(folder) = &config.download_folder {
        let saved = ResultDownloader::new(folder)
            .download_all(service, &report.batch_id, &summary.results)
            .await
            .with_context(|| format!("下载批次 {} 的结果失败", report.batch_id))?;
        info!("[提交 {}] 💾 已下载 {} 个结果文件到 {}", index, saved.len(), folder);
    }

    let failed_docs = summary.results.iter().filter(|r| r.failed).count();
    log_submission_complete(index, &report.batch_id, summary.results.len() - failed_docs, failed_docs);

    Ok(report.succeeded())
}

// ========== 日志辅助函数 ==========

fn log_submission_start(index: usize, submission: &Submission) {
    info!("[提交 {}] 开始处理", index);
    info!("[提交 {}] 名称: {}", index, truncate_text(&submission.name, 40));
    info!("[提交 {}] 扫描件数: {}", index, submission.scans.len());
    info!("[提交 {}] 语言: {}", index, submission.ocr.languages.join(", "));
}

fn log_submission_complete(index: usize, batch_id: &str, succeeded: usize, failed: usize) {
    info!(
        "[提交 {}] 文档统计: 成功 {}, 失败 {}, 批次 {}",
        index, succeeded, failed, batch_id
    );
    info!("\n[提交 {}] ✅ 提交处理完成\n", index);
}
