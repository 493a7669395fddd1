//! 任务图汇总
//!
//! 每次轮询拿到任务链森林后，归约为：
//! - 完成 / 运行 / 等待 / 失败计数
//! - 失败说明（倒数第二条错误信息 + 根文档）
//! - 每个叶子节点的文档结果链接（排序后按位置配对）
//! - 进度比例和停止轮询信号

use crate::models::chain::{ChainForest, TaskChainNode, TaskState};
use std::fmt;
use std::str::FromStr;

/// 预期任务总数的计算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TotalStrategy {
    /// 每个叶子的每个根文档都向上遍历，每遇到一个失败祖先就按距离扣减
    #[default]
    #[value(name = "weighted")]
    AncestorWeighted,
    /// 失败节点及其全部后代各扣减一次
    #[value(name = "exact")]
    ExactDescendants,
}

impl FromStr for TotalStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted" | "ancestor_weighted" => Ok(TotalStrategy::AncestorWeighted),
            "exact" | "exact_descendants" => Ok(TotalStrategy::ExactDescendants),
            other => Err(format!("未知的统计方式: {}", other)),
        }
    }
}

/// 单个文档的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentResult {
    /// 路径最后一段
    pub name: String,
    /// 根文档完整路径
    pub path: String,
    /// 结果文件下载链接
    pub link: Option<String>,
    /// 自身或任一祖先任务失败
    pub failed: bool,
}

/// 失败任务说明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureNote {
    pub task: Option<String>,
    pub documents: Vec<String>,
    pub message: Option<String>,
}

/// 批次整体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Success,
    Pending,
    Failed,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BatchState::Success => "success",
            BatchState::Pending => "pending",
            BatchState::Failed => "failed",
        })
    }
}

/// 一次汇总的结果
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGraphSummary {
    pub node_count: usize,
    pub done: usize,
    pub running: usize,
    pub pending: usize,
    pub failed: usize,
    /// 祖先链上没有失败节点的运行/等待节点数
    pub live: usize,
    /// 扣减失败影响后的预期任务数，启发式扣减可能为负
    pub total: i64,
    pub results: Vec<DocumentResult>,
    pub failures: Vec<FailureNote>,
}

impl TaskGraphSummary {
    pub fn done_ratio(&self) -> Option<f64> {
        self.ratio(self.done)
    }

    pub fn running_ratio(&self) -> Option<f64> {
        self.ratio(self.running)
    }

    fn ratio(&self, count: usize) -> Option<f64> {
        (self.total > 0).then(|| (count as f64 / self.total as f64).min(1.0))
    }

    /// 是否停止轮询
    ///
    /// 正常终止条件是 `done == total`。只要还有未受失败波及的节点在运行或等待就继续；
    /// 过度扣减让 total 低于 done 时，以剩余节点全部被失败阻断作为终止
    pub fn should_stop(&self) -> bool {
        if self.node_count == 0 || self.live > 0 {
            return false;
        }
        self.done as i64 == self.total || self.failed > 0
    }

    pub fn state(&self) -> BatchState {
        if self.failed > 0 {
            BatchState::Failed
        } else if self.pending > 0 || self.running > 0 {
            BatchState::Pending
        } else {
            BatchState::Success
        }
    }
}

/// 汇总任务链森林
pub fn summarize(forest: &ChainForest, strategy: TotalStrategy) -> TaskGraphSummary {
    let mut summary = TaskGraphSummary {
        node_count: forest.len(),
        done: 0,
        running: 0,
        pending: 0,
        failed: 0,
        live: 0,
        total: forest.len() as i64,
        results: Vec::new(),
        failures: Vec::new(),
    };

    for (_, node) in forest.iter() {
        match node.state {
            TaskState::Success => summary.done += 1,
            TaskState::Running | TaskState::Pending => {
                if node.state == TaskState::Running {
                    summary.running += 1;
                } else {
                    summary.pending += 1;
                }
                if !has_failed_ancestor(forest, node) {
                    summary.live += 1;
                }
            }
            TaskState::Failure => {
                summary.failed += 1;
                summary.failures.push(FailureNote {
                    task: node.task_label(),
                    documents: node.root_documents().to_vec(),
                    message: node.failure_message().map(str::to_string),
                });
            }
        }

        if !node.is_leaf() {
            continue;
        }

        let mut failed_below = false;
        let documents = node.root_documents().len() as i64;
        for (distance, ancestor) in forest.ancestry(node) {
            if ancestor.state == TaskState::Failure {
                failed_below = true;
                if strategy == TotalStrategy::AncestorWeighted {
                    summary.total -= distance as i64 * documents;
                }
            }
        }

        if !node.housekeeping {
            summary.results.extend(pair_results(node, failed_below));
        }
    }

    if strategy == TotalStrategy::ExactDescendants {
        summary.total -= doomed_count(forest) as i64;
    }

    summary
        .results
        .sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));

    summary
}

/// 叶子节点的根文档与结果文件各自排序后按位置配对
fn pair_results(leaf: &TaskChainNode, failed: bool) -> Vec<DocumentResult> {
    let mut documents = leaf.root_documents().to_vec();
    documents.sort();

    let mut results = leaf.result.clone().unwrap_or_default();
    results.sort();

    documents
        .into_iter()
        .enumerate()
        .map(|(i, path)| DocumentResult {
            name: last_segment(&path).to_string(),
            link: results.get(i).cloned(),
            path,
            failed,
        })
        .collect()
}

/// 失败节点以及祖先中有失败节点的节点数量，每个只计一次
fn doomed_count(forest: &ChainForest) -> usize {
    forest
        .iter()
        .filter(|(_, node)| has_failed_ancestor(forest, node))
        .count()
}

/// 自身或祖先链上存在失败节点
fn has_failed_ancestor(forest: &ChainForest, node: &TaskChainNode) -> bool {
    forest
        .ancestry(node)
        .any(|(_, ancestor)| ancestor.state == TaskState::Failure)
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
