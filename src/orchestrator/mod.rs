//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量提交处理器
//! - 管理应用生命周期（初始化、运行）
//! - 批量加载提交文件（Vec<Submission>）
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ### `submission_processor` - 单个提交处理器
//! - 创建并驱动 WizardFlow
//! - 写失败记录、下载结果
//! - 输出单个提交的统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Submission>)
//!     ↓
//! submission_processor (处理单个 Submission)
//!     ↓
//! workflow::WizardFlow (navigator + panes)
//!     ↓
//! services (能力层：batch / pipeline / download / failure)
//!     ↓
//! infrastructure (基础设施：Transport)
//! ```

pub mod batch_processor;
pub mod submission_processor;

pub use batch_processor::{App, ProcessingStats};
pub use submission_processor::{process_status, process_submission};
