//! 命令行参数（clap derive）
//!
//! 命令行参数优先于环境变量

use crate::aggregator::TotalStrategy;
use clap::{Parser, Subcommand};

/// `iris-submit` 的命令行参数
#[derive(Debug, Clone, Parser)]
#[command(
    name = "iris-submit",
    version,
    about = "向 Iris OCR 服务提交扫描件批次并跟踪处理状态",
    long_about = None
)]
pub struct CliArgs {
    /// Iris API 根地址（覆盖 IRIS_API_BASE_URL）
    #[arg(long, value_name = "URL")]
    pub api: Option<String>,

    /// 提交文件目录（覆盖 SUBMISSION_FOLDER）
    #[arg(long, value_name = "DIR")]
    pub folder: Option<String>,

    /// 结果文件下载目录
    #[arg(long, value_name = "DIR")]
    pub download: Option<String>,

    /// 预期任务总数的计算方式
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub total_strategy: Option<TotalStrategy>,

    /// 不连接服务端，使用内置模拟响应
    #[arg(long)]
    pub dry_run: bool,

    /// 显示详细日志
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// 子命令，默认为 `submit`
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// 处理提交目录中的全部提交文件
    Submit,
    /// 直接打开某个批次的状态页并轮询
    Status {
        /// 批次ID
        batch_id: String,
    },
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
