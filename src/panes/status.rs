//! 状态面板
//!
//! 按固定间隔刷新批次状态并汇总任务图。计时器在以下任一情况停止，且只停止一次：
//! - 全部预期任务完成
//! - 面板被销毁（`dispose` 或 `TeardownHandle`）
//! - 达到最大轮询次数

use crate::aggregator::{summarize, TaskGraphSummary};
use crate::config::Config;
use crate::error::AppResult;
use crate::panes::PaneView;
use crate::utils::logging::progress_bar;
use crate::workflow::AppContext;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 轮询参数
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub interval: Duration,
    /// 0 表示不限
    pub max_rounds: usize,
}

impl PollOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            max_rounds: config.max_poll_rounds,
        }
    }
}

/// 轮询结束的原因
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(TaskGraphSummary),
    TornDown,
    /// 达到最大轮询次数，附带最后一次汇总
    Exhausted(Option<TaskGraphSummary>),
}

/// 可跨任务持有的销毁句柄
#[derive(Clone)]
pub struct TeardownHandle(Arc<watch::Sender<bool>>);

impl TeardownHandle {
    pub fn teardown(&self) {
        self.0.send_replace(true);
    }
}

pub struct StatusPane {
    summary: Option<TaskGraphSummary>,
    shutdown: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    polling: bool,
    stops: usize,
}

impl StatusPane {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            summary: None,
            shutdown: Arc::new(tx),
            shutdown_rx: rx,
            polling: false,
            stops: 0,
        }
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle(self.shutdown.clone())
    }

    pub fn summary(&self) -> Option<&TaskGraphSummary> {
        self.summary.as_ref()
    }

    /// 计时器停止的次数
    pub fn stop_count(&self) -> usize {
        self.stops
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// 轮询直到完成、被销毁或次数用尽
    ///
    /// 单次刷新失败只记录警告，下一轮继续
    pub async fn poll_until_complete(
        &mut self,
        ctx: &mut AppContext,
        options: PollOptions,
    ) -> AppResult<PollOutcome> {
        let mut shutdown = self.shutdown_rx.clone();
        if *shutdown.borrow() {
            return Ok(PollOutcome::TornDown);
        }

        let batch_id = ctx.batch.require_id()?.to_string();
        let mut ticker = tokio::time::interval(options.interval);
        let mut rounds = 0;
        self.polling = true;
        info!("{} 🔄 开始轮询批次 {} 状态", ctx, batch_id);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.stop();
                        info!("{} ⏹️ 状态面板已销毁，停止轮询", ctx);
                        return Ok(PollOutcome::TornDown);
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            rounds += 1;
            if let Err(e) = ctx.service.refresh_status(&mut ctx.batch).await {
                warn!("{} ⚠️ 第 {} 次刷新状态失败: {}", ctx, rounds, e);
            }
            self.on_model_change(ctx);

            match &self.summary {
                Some(summary) => {
                    info!(
                        "{} 📊 {} 完成 {}/{} | 运行 {} | 失败 {}",
                        ctx,
                        progress_bar(summary.done_ratio(), 20),
                        summary.done,
                        summary.total,
                        summary.running,
                        summary.failed
                    );
                    if summary.should_stop() {
                        let summary = summary.clone();
                        self.stop();
                        return Ok(PollOutcome::Completed(summary));
                    }
                }
                None => debug!("{} 批次尚未开始执行", ctx),
            }

            if options.max_rounds > 0 && rounds >= options.max_rounds {
                self.stop();
                warn!("{} ⚠️ 已轮询 {} 次仍未完成", ctx, rounds);
                return Ok(PollOutcome::Exhausted(self.summary.clone()));
            }
        }
    }

    fn stop(&mut self) {
        if self.polling {
            self.polling = false;
            self.stops += 1;
        }
    }

    pub fn on_model_change(&mut self, ctx: &AppContext) {
        if let Some(forest) = ctx.batch.chains() {
            self.summary = Some(summarize(forest, ctx.config.total_strategy));
        }
    }

    pub fn render(&self, ctx: &AppContext) -> PaneView {
        let mut view = PaneView::new("处理状态").line(format!("批次: {}", ctx.batch.id().unwrap_or("-")));
        let Some(summary) = &self.summary else {
            return view.line("等待任务开始...");
        };

        view = view
            .line(format!("完成 {} {}/{}", progress_bar(summary.done_ratio(), 20), summary.done, summary.total))
            .line(format!("运行 {} {}", progress_bar(summary.running_ratio(), 20), summary.running))
            .line(format!("状态: {}", summary.state()));

        for result in &summary.results {
            let mark = if result.failed { "✗" } else { "✓" };
            view = view.line(format!(
                "{} {} -> {}",
                mark,
                result.name,
                result.link.as_deref().unwrap_or("-")
            ));
        }
        for failure in &summary.failures {
            view = view.line(format!(
                "失败 {}: {}",
                failure.task.as_deref().unwrap_or("-"),
                failure.message.as_deref().unwrap_or("未知错误")
            ));
        }
        view
    }

    /// 取消轮询计时器
    pub fn dispose(&mut self) {
        self.shutdown.send_replace(true);
        self.stop();
    }
}

impl Default for StatusPane {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{Method, RecordingTransport, Reply};
    use crate::models::Batch;
    use crate::services::BatchService;
    use serde_json::json;

    fn context(transport: Arc<RecordingTransport>) -> AppContext {
        AppContext::new(Config::default(), BatchService::new(transport), 1).with_batch(Batch::with_id("b1"))
    }

    fn options(max_rounds: usize) -> PollOptions {
        PollOptions {
            interval: Duration::from_secs(5),
            max_rounds,
        }
    }

    fn running() -> Reply {
        Reply::Json(json!({"chains": {
            "a": {"state": "SUCCESS", "children": ["b"]},
            "b": {"state": "RUNNING", "parents": ["a"], "root_documents": ["/pages/b1/p.png"]}
        }}))
    }

    fn finished() -> Reply {
        Reply::Json(json!({"chains": {
            "a": {"state": "SUCCESS", "children": ["b"]},
            "b": {"state": "SUCCESS", "parents": ["a"], "root_documents": ["/pages/b1/p.png"],
                  "result": ["/pages/b1/p.xml"]}
        }}))
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_once_when_done() {
        let transport = Arc::new(RecordingTransport::new());
        transport.reply(Method::Get, "/api/v1/batch/b1", running());
        transport.reply(Method::Get, "/api/v1/batch/b1", finished());
        let mut ctx = context(transport.clone());
        let mut pane = StatusPane::new();

        let outcome = pane.poll_until_complete(&mut ctx, options(0)).await.unwrap();

        let PollOutcome::Completed(summary) = outcome else {
            panic!("应当完成");
        };
        assert_eq!(summary.done, summary.total as usize);
        assert_eq!(summary.results[0].link.as_deref(), Some("/pages/b1/p.xml"));
        assert_eq!(transport.count(Method::Get, "/api/v1/batch/b1"), 2);
        assert_eq!(pane.stop_count(), 1);
        assert!(!pane.is_polling());

        pane.dispose();
        assert_eq!(pane.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_rounds_exhausted() {
        let transport = Arc::new(RecordingTransport::new());
        transport.reply(Method::Get, "/api/v1/batch/b1", running());
        let mut ctx = context(transport.clone());
        let mut pane = StatusPane::new();

        let outcome = pane.poll_until_complete(&mut ctx, options(3)).await.unwrap();

        assert!(matches!(outcome, PollOutcome::Exhausted(Some(_))));
        assert_eq!(transport.count(Method::Get, "/api/v1/batch/b1"), 3);
        assert_eq!(pane.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_polling() {
        let transport = Arc::new(RecordingTransport::new());
        transport.reply(Method::Get, "/api/v1/batch/b1", running());
        let mut ctx = context(transport.clone());
        let mut pane = StatusPane::new();

        let handle = pane.teardown_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            handle.teardown();
        });

        let outcome = pane.poll_until_complete(&mut ctx, options(0)).await.unwrap();
        assert_eq!(outcome, PollOutcome::TornDown);
        // 0s、5s、10s 三次刷新
        assert_eq!(transport.count(Method::Get, "/api/v1/batch/b1"), 3);
        assert_eq!(pane.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_disposed_pane_issues_no_request() {
        let transport = Arc::new(RecordingTransport::new());
        let mut ctx = context(transport.clone());
        let mut pane = StatusPane::new();
        pane.dispose();

        let outcome = pane.poll_until_complete(&mut ctx, options(0)).await.unwrap();
        assert_eq!(outcome, PollOutcome::TornDown);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_errors_keep_polling() {
        let transport = Arc::new(RecordingTransport::new());
        transport.reply(
            Method::Get,
            "/api/v1/batch/b1",
            Reply::Error {
                status: 503,
                message: "busy".into(),
            },
        );
        transport.reply(Method::Get, "/api/v1/batch/b1", finished());
        let mut ctx = context(transport.clone());
        let mut pane = StatusPane::new();

        let outcome = pane.poll_until_complete(&mut ctx, options(5)).await.unwrap();
        assert!(matches!(outcome, PollOutcome::Completed(_)));
        assert_eq!(transport.count(Method::Get, "/api/v1/batch/b1"), 2);
    }
}
