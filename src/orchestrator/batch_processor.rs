//! 批量提交处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量提交的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：初始化日志文件，创建传输层（真实 HTTP 或 dry-run 模拟）
//! 2. **批量加载**：扫描并加载所有提交文件（`Vec<Submission>`）
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分轮处理**：将提交分轮处理，每轮完成后再开始下一轮
//! 5. **全局统计**：汇总所有提交的处理结果

use crate::config::Config;
use crate::infrastructure::{HttpExecutor, RecordingTransport, Transport};
use crate::models::Submission;
use crate::orchestrator::submission_processor;
use crate::utils::logging::{
    init_log_file, log_round_complete, log_round_start, log_startup, log_submissions_loaded,
    print_final_stats,
};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    transport: Arc<dyn Transport>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        init_log_file(&config.output_log_file)?;
        log_startup(&config.api_base_url, config.max_concurrent_submissions);

        let transport: Arc<dyn Transport> = if config.dry_run {
            info!("🧪 dry-run 模式：使用内置模拟服务端");
            Arc::new(RecordingTransport::dry_run())
        } else {
            Arc::new(HttpExecutor::new(&config.api_base_url, config.request_timeout())?)
        };

        Ok(Self::with_transport(config, transport))
    }

    /// 使用指定的传输层
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// 处理提交目录中的全部提交
    pub async fn run(&self) -> Result<ProcessingStats> {
        let submissions = self.load_submissions().await?;

        if submissions.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML文件，程序结束");
            return Ok(ProcessingStats::default());
        }

        log_submissions_loaded(submissions.len(), self.max_concurrent());

        let stats = self.process_all(submissions).await?;

        print_final_stats(stats.success, stats.failed, stats.total, &self.config.output_log_file);

        Ok(stats)
    }

    /// 查看单个批次的状态，全部任务成功返回 true
    pub async fn run_status(&self, batch_id: &str) -> Result<bool> {
        submission_processor::process_status(batch_id, &self.config, self.transport.clone()).await
    }

    async fn load_submissions(&self) -> Result<Vec<Submission>> {
        info!("\n📁 正在扫描待处理的提交...");
        Ok(crate::models::load_all_submissions(&self.config.submission_folder).await?)
    }

    fn max_concurrent(&self) -> usize {
        self.config.max_concurrent_submissions.max(1)
    }

    async fn process_all(&self, submissions: Vec<Submission>) -> Result<ProcessingStats> {
        let max_concurrent = self.max_concurrent();
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total = submissions.len();
        let total_rounds = total.div_ceil(max_concurrent);
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        for round_start in (0..total).step_by(max_concurrent) {
            let round_end = (round_start + max_concurrent).min(total);
            let round = round_start / max_concurrent + 1;

            log_round_start(round, total_rounds, round_start + 1, round_end, total);

            let result = self
                .process_round(&submissions[round_start..round_end], round_start, semaphore.clone())
                .await?;

            stats.success += result.success;
            stats.failed += result.failed;

            log_round_complete(round, result.success, result.success + result.failed);
        }

        Ok(stats)
    }

    async fn process_round(
        &self,
        submissions: &[Submission],
        round_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<RoundResult> {
        let mut handles = Vec::new();

        for (offset, submission) in submissions.iter().enumerate() {
            let index = round_start + offset + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let submission = submission.clone();
            let config = self.config.clone();
            let transport = self.transport.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                match submission_processor::process_submission(submission, index, &config, transport).await {
                    Ok(success) => success,
                    Err(e) => {
                        error!("[提交 {}] ❌ 处理过程中发生错误: {:#}", index, e);
                        false
                    }
                }
            });
            handles.push((index, handle));
        }

        let mut result = RoundResult::default();
        for (index, handle) in handles {
            match handle.await {
                Ok(true) => result.success += 1,
                Ok(false) => result.failed += 1,
                Err(e) => {
                    error!("[提交 {}] 任务执行失败: {}", index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

/// 单轮处理结果
#[derive(Debug, Default)]
struct RoundResult {
    success: usize,
    failed: usize,
}
