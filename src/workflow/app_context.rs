//! 向导上下文
//!
//! 封装"我正在处理哪个提交的哪个批次"，显式传给每个面板

use crate::config::Config;
use crate::models::Batch;
use crate::services::BatchService;
use std::fmt::Display;

/// 向导会话上下文
///
/// 每个提交独占一个上下文，批次只在 await 之间被修改
pub struct AppContext {
    pub batch: Batch,
    pub config: Config,
    pub service: BatchService,
    /// 提交序号（仅用于日志显示）
    pub index: usize,
}

impl AppContext {
    pub fn new(config: Config, service: BatchService, index: usize) -> Self {
        Self {
            batch: Batch::new(),
            config,
            service,
            index,
        }
    }

    /// 接管一个已有的批次
    pub fn with_batch(mut self, batch: Batch) -> Self {
        self.batch = batch;
        self
    }
}

impl Display for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[提交 {}]", self.index)
    }
}
