//! # Iris Submit
//!
//! 向 Iris OCR 服务提交扫描件批次的命令行客户端
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 只暴露"发请求"的能力
//! - `Transport` - 传输接口；`HttpExecutor` 走真实 HTTP，`RecordingTransport` 用于测试和 dry-run
//!
//! ### ② 模型与汇总（Models / Aggregator）
//! - `models/` - 批次、任务、任务链森林、向导步骤、提交文件
//! - `aggregator/` - 把任务链森林归约为进度、失败说明和结果链接
//!
//! ### ③ 业务能力层（Services）
//! - `BatchService` - 批次与服务端同步
//! - `build_pipeline` - 默认识别流水线
//! - `ResultDownloader` / `FailureWriter` - 结果下载与失败记录
//!
//! ### ④ 向导层（Navigator / Panes / Workflow）
//! - `navigator/` - 路由、步骤图和面板导航器（状态机）
//! - `panes/` - 每个步骤一个面板：render / on_model_change / dispose
//! - `workflow/` - `AppContext` + `WizardFlow`，走完一次提交
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量提交，并发控制和统计
//! - `orchestrator/submission_processor` - 单个提交的收尾
//!
//! ## 模块结构

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod navigator;
pub mod orchestrator;
pub mod panes;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use aggregator::{summarize, TaskGraphSummary, TotalStrategy};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{HttpExecutor, RecordingTransport, Transport};
pub use models::{Batch, Submission, WizardStep};
pub use navigator::PaneNavigator;
pub use orchestrator::{App, ProcessingStats};
pub use workflow::{AppContext, WizardFlow};
