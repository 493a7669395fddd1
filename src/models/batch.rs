//! 批次模型
//!
//! 客户端持有的批次表示，与服务端接口保持同步

use crate::error::{AppResult, BusinessError};
use crate::models::chain::ChainForest;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;

/// 流水线任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub group: String,
    pub name: String,
    #[serde(default)]
    pub args: JsonMap<String, JsonValue>,
}

impl Task {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            args: JsonMap::new(),
        }
    }

    /// 添加一个参数
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.group, self.name)
    }
}

/// 已上传的文档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub url: String,
}

/// 创建/执行批次的响应
#[derive(Debug, Clone, Deserialize)]
pub struct BatchHandle {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// `GET /api/v1/batch/{id}` 的响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchStatus {
    #[serde(default)]
    pub pages: Option<String>,
    #[serde(default)]
    pub tasks: Option<String>,
    /// 批次开始执行后才会出现
    #[serde(default)]
    pub chains: Option<ChainForest>,
}

/// 提交批次
#[derive(Debug, Clone, Default)]
pub struct Batch {
    /// 首次保存后由服务端分配
    pub id: Option<String>,
    pub metadata: BTreeMap<String, String>,
    /// 元数据文件上传后的地址
    pub metadata_url: Option<String>,
    pub upload_complete: bool,
    pub metadata_complete: bool,
    pub tasks: Vec<Task>,
    pub documents: Vec<Document>,
    pub status: Option<BatchStatus>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用已有的批次ID构建（直接打开状态页时使用）
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// 批次ID，不存在时报错
    pub fn require_id(&self) -> AppResult<&str> {
        self.id().ok_or_else(|| BusinessError::BatchNotCreated.into())
    }

    /// 当前的任务链森林（尚未执行时为 None）
    pub fn chains(&self) -> Option<&ChainForest> {
        self.status.as_ref()?.chains.as_ref()
    }

    /// 元数据中缺失或为空的字段
    pub fn missing_metadata(&self, required: &[&str]) -> Vec<String> {
        let mut missing: Vec<String> = required
            .iter()
            .filter(|field| self.metadata.get(**field).map_or(true, |v| v.trim().is_empty()))
            .map(|field| field.to_string())
            .collect();
        missing.extend(
            self.metadata
                .iter()
                .filter(|(k, v)| v.trim().is_empty() && !required.contains(&k.as_str()))
                .map(|(k, _)| k.clone()),
        );
        missing
    }
}

/// 把服务端 `{group: [[task, {args}], ...]}` 形式的任务列表展开
pub fn flatten_task_listing(listing: &JsonValue) -> Vec<Task> {
    let Some(groups) = listing.as_object() else {
        return Vec::new();
    };

    let mut tasks = Vec::new();
    for (group, entries) in groups {
        let Some(entries) = entries.as_array() else {
            continue;
        };
        for entry in entries {
            let Some(pair) = entry.as_array() else {
                continue;
            };
            let Some(name) = pair.first().and_then(|v| v.as_str()) else {
                continue;
            };
            let args = pair
                .get(1)
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();
            tasks.push(Task {
                group: group.clone(),
                name: name.to_string(),
                args,
            });
        }
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_task_listing() {
        let listing = json!({
            "segmentation": [["tesseract", {}]],
            "ocr": [["kraken", {"model": "teubner"}], "garbage"]
        });
        let tasks = flatten_task_listing(&listing);
        assert_eq!(tasks.len(), 2);
        let kraken = tasks.iter().find(|t| t.group == "ocr").unwrap();
        assert_eq!(kraken.name, "kraken");
        assert_eq!(kraken.args["model"], "teubner");
    }

    #[test]
    fn test_require_id() {
        assert!(Batch::new().require_id().is_err());
        assert!(Batch::with_id("").require_id().is_err());
        assert_eq!(Batch::with_id("abc").require_id().unwrap(), "abc");
    }

    #[test]
    fn test_missing_metadata() {
        let mut batch = Batch::new();
        batch.metadata.insert("title".into(), "Iliad".into());
        batch.metadata.insert("notes".into(), "  ".into());
        assert_eq!(batch.missing_metadata(&["title", "author"]), vec!["author", "notes"]);
    }

    #[test]
    fn test_status_without_chains() {
        let status: BatchStatus =
            serde_json::from_value(json!({"pages": "/api/v1/batch/x/pages", "tasks": "/api/v1/batch/x/tasks"}))
                .unwrap();
        assert!(status.chains.is_none());
    }
}
