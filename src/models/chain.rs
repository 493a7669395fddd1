//! 任务链（服务端上报的任务依赖森林）
//!
//! 服务端在 `GET /api/v1/batch/{id}` 的 `chains` 字段里返回每个任务节点。
//! 客户端只读，字段缺失视为合法状态：
//! - 没有 `children` 视为叶子节点
//! - 没有 `parents` 视为根节点
//! - `result` / `errors` 格式异常时直接忽略

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap, HashSet};

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    Pending,
    Running,
    Success,
    Failure,
}

impl From<String> for TaskState {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "RUNNING" | "STARTED" => TaskState::Running,
            "SUCCESS" => TaskState::Success,
            "FAILURE" => TaskState::Failure,
            // 其余状态（RETRY、未知值）都还没有结果
            _ => TaskState::Pending,
        }
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Pending => "PENDING",
            TaskState::Running => "RUNNING",
            TaskState::Success => "SUCCESS",
            TaskState::Failure => "FAILURE",
        }
        .to_string()
    }
}

/// 父节点引用：链ID或者内联的节点
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParentRef {
    Id(String),
    Node(Box<TaskChainNode>),
}

/// 任务链节点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskChainNode {
    pub state: TaskState,

    #[serde(default, deserialize_with = "nullable_vec")]
    pub children: Vec<JsonValue>,

    #[serde(default, deserialize_with = "nullable_vec")]
    pub parents: Vec<ParentRef>,

    #[serde(default, deserialize_with = "lenient_paths")]
    pub root_documents: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient_paths")]
    pub result: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient_paths")]
    pub errors: Option<Vec<String>>,

    /// `[group, task]`
    #[serde(default, deserialize_with = "lenient_paths")]
    pub task: Option<Vec<String>>,

    #[serde(default, deserialize_with = "nullable_bool")]
    pub housekeeping: bool,
}

impl TaskChainNode {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            children: Vec::new(),
            parents: Vec::new(),
            root_documents: None,
            result: None,
            errors: None,
            task: None,
            housekeeping: false,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn root_documents(&self) -> &[String] {
        self.root_documents.as_deref().unwrap_or(&[])
    }

    /// 人类可读的失败原因
    ///
    /// 最后一条是终止标记，倒数第二条才是原因；只有一条时直接使用
    pub fn failure_message(&self) -> Option<&str> {
        let errors = self.errors.as_deref()?;
        match errors.len() {
            0 => None,
            1 => errors.first().map(String::as_str),
            n => errors.get(n - 2).map(String::as_str),
        }
    }

    /// `group.task` 形式的任务名
    pub fn task_label(&self) -> Option<String> {
        self.task.as_ref().filter(|t| !t.is_empty()).map(|t| t.join("."))
    }
}

/// 任务链森林
///
/// 按服务端给出的链ID建立索引，父节点引用通过ID解析
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawChains")]
pub struct ChainForest {
    ids: Vec<String>,
    nodes: Vec<TaskChainNode>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChains {
    Map(BTreeMap<String, TaskChainNode>),
    List(Vec<TaskChainNode>),
}

impl From<RawChains> for ChainForest {
    fn from(raw: RawChains) -> Self {
        match raw {
            RawChains::Map(map) => map.into_iter().collect(),
            RawChains::List(list) => list
                .into_iter()
                .enumerate()
                .map(|(i, node)| (i.to_string(), node))
                .collect(),
        }
    }
}

impl FromIterator<(String, TaskChainNode)> for ChainForest {
    fn from_iter<I: IntoIterator<Item = (String, TaskChainNode)>>(iter: I) -> Self {
        let mut forest = ChainForest::default();
        for (id, node) in iter {
            forest.insert(id, node);
        }
        forest
    }
}

impl ChainForest {
    /// 插入节点，重复ID覆盖旧节点
    pub fn insert(&mut self, id: impl Into<String>, node: TaskChainNode) {
        let id = id.into();
        if let Some(&pos) = self.index.get(&id) {
            self.nodes[pos] = node;
            return;
        }
        self.index.insert(id.clone(), self.nodes.len());
        self.ids.push(id);
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TaskChainNode> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskChainNode)> {
        self.ids.iter().map(String::as_str).zip(self.nodes.iter())
    }

    /// 第一个父节点；引用的ID不存在时视为根节点
    pub fn parent_of<'a>(&'a self, node: &'a TaskChainNode) -> Option<&'a TaskChainNode> {
        match node.parents.first()? {
            ParentRef::Id(id) => self.get(id),
            ParentRef::Node(parent) => Some(parent.as_ref()),
        }
    }

    /// 从 `node` 开始沿父链向上遍历，`node` 自身距离为 1
    pub fn ancestry<'a>(&'a self, node: &'a TaskChainNode) -> Ancestry<'a> {
        Ancestry {
            forest: self,
            next: Some(node),
            distance: 0,
            seen: HashSet::new(),
        }
    }
}

/// 父链迭代器，产出 `(距离, 节点)`，遇到环立即停止
pub struct Ancestry<'a> {
    forest: &'a ChainForest,
    next: Option<&'a TaskChainNode>,
    distance: usize,
    seen: HashSet<*const TaskChainNode>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = (usize, &'a TaskChainNode);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next.take()?;
        if !self.seen.insert(node as *const TaskChainNode) {
            return None;
        }
        self.distance += 1;
        self.next = self.forest.parent_of(node);
        Some((self.distance, node))
    }
}

// ========== 宽松反序列化 ==========

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// 接受字符串、字符串数组或 null；其它形状视为缺失
fn lenient_paths<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    Ok(match value {
        JsonValue::String(s) => Some(vec![s]),
        JsonValue::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    JsonValue::String(s) => Some(s),
                    JsonValue::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
        ),
        _ => None,
    })
}
