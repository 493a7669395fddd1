//! 内存传输 - 基础设施层
//!
//! 记录每一次请求，并按预设或模拟规则返回响应。
//! `--dry-run` 模式和测试都使用它代替真实服务端。

use crate::error::{AppError, AppResult};
use crate::infrastructure::transport::{Transport, UploadFile};
use async_trait::async_trait;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// 一次被记录的请求
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<JsonValue>,
    /// 上传的文件名
    pub files: Vec<String>,
}

/// 预设响应
#[derive(Debug, Clone)]
pub enum Reply {
    Json(JsonValue),
    Error { status: u16, message: String },
}

type Responder = dyn Fn(&RecordedCall, &[RecordedCall]) -> Reply + Send + Sync;

/// 记录请求的内存传输
pub struct RecordingTransport {
    calls: Mutex<Vec<RecordedCall>>,
    scripted: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    responder: Box<Responder>,
}

impl RecordingTransport {
    /// 未预设的请求一律返回 `null`
    pub fn new() -> Self {
        Self::with_responder(|_, _| Reply::Json(JsonValue::Null))
    }

    /// 模拟一个完整的 Iris 服务端
    pub fn dry_run() -> Self {
        Self::with_responder(simulate)
    }

    pub fn with_responder(
        responder: impl Fn(&RecordedCall, &[RecordedCall]) -> Reply + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            scripted: Mutex::new(HashMap::new()),
            responder: Box::new(responder),
        }
    }

    /// 为某个请求预设响应；多次预设按顺序返回，最后一个会一直重复
    pub fn reply(&self, method: Method, path: impl Into<String>, reply: Reply) {
        lock(&self.scripted)
            .entry((method, path.into()))
            .or_default()
            .push_back(reply);
    }

    /// 已记录的全部请求
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// 指定请求出现的次数
    pub fn count(&self, method: Method, path: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    fn dispatch(&self, call: RecordedCall) -> AppResult<JsonValue> {
        let scripted = {
            let mut scripted = lock(&self.scripted);
            scripted
                .get_mut(&(call.method, call.path.clone()))
                .and_then(|queue| {
                    if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    }
                })
        };

        let mut calls = lock(&self.calls);
        let reply = scripted.unwrap_or_else(|| (self.responder)(&call, &calls));
        let path = call.path.clone();
        calls.push(call);

        match reply {
            Reply::Json(value) => Ok(value),
            Reply::Error { status, message } => Err(AppError::bad_response(path, status, Some(message))),
        }
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn get_json(&self, path: &str) -> AppResult<JsonValue> {
        self.dispatch(RecordedCall {
            method: Method::Get,
            path: path.to_string(),
            body: None,
            files: Vec::new(),
        })
    }

    async fn post_json(&self, path: &str, body: Option<&JsonValue>) -> AppResult<JsonValue> {
        self.dispatch(RecordedCall {
            method: Method::Post,
            path: path.to_string(),
            body: body.cloned(),
            files: Vec::new(),
        })
    }

    async fn post_files(&self, path: &str, files: Vec<UploadFile>) -> AppResult<JsonValue> {
        self.dispatch(RecordedCall {
            method: Method::Post,
            path: path.to_string(),
            body: None,
            files: files.into_iter().map(|f| f.file_name).collect(),
        })
    }

    async fn get_bytes(&self, path: &str) -> AppResult<Vec<u8>> {
        let value = self.get_json(path).await?;
        Ok(match value {
            JsonValue::String(text) => text.into_bytes(),
            other => serde_json::to_vec(&other)?,
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ========== 模拟服务端 ==========

const API_PREFIX: &str = "/api/v1/";

/// 按 Iris API 的行为模拟响应，状态只从历史请求推导
fn simulate(call: &RecordedCall, history: &[RecordedCall]) -> Reply {
    // 查询参数（如 `?auxiliary=1`）不影响模拟结果
    let path = call.path.split_once('?').map_or(call.path.as_str(), |(path, _)| path);
    let Some(rest) = path.strip_prefix(API_PREFIX) else {
        return not_found();
    };
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match (call.method, segments.as_slice()) {
        (Method::Post, ["batch"]) => {
            let created = history
                .iter()
                .filter(|c| c.method == Method::Post && c.path == "/api/v1/batch")
                .count();
            let id = format!("dry-run-{:04}", created + 1);
            Reply::Json(json!({"id": id, "url": format!("/api/v1/batch/{}", id)}))
        }
        (Method::Post, ["batch", id, "pages"]) => {
            let listing: Vec<_> = call.files.iter().map(|name| page_entry(id, name)).collect();
            Reply::Json(JsonValue::Array(listing))
        }
        (Method::Get, ["batch", id, "pages"]) => {
            let listing: Vec<_> = uploaded_documents(id, history)
                .iter()
                .map(|name| page_entry(id, name))
                .collect();
            Reply::Json(JsonValue::Array(listing))
        }
        (Method::Post, ["batch", _, "tasks", _, _]) => Reply::Json(json!({})),
        (Method::Get, ["batch", id, "tasks"]) => Reply::Json(registered_tasks(id, history)),
        (Method::Post, ["batch", id]) => {
            Reply::Json(json!({"id": id, "url": format!("/api/v1/batch/{}", id)}))
        }
        (Method::Get, ["batch", id]) => {
            let mut status = json!({
                "pages": format!("/api/v1/batch/{}/pages", id),
                "tasks": format!("/api/v1/batch/{}/tasks", id),
            });
            let executed = history
                .iter()
                .any(|c| c.method == Method::Post && c.path == format!("/api/v1/batch/{}", id));
            if executed {
                status["chains"] = simulated_chains(id, &uploaded_documents(id, history));
            }
            Reply::Json(status)
        }
        (Method::Get, ["tasks"]) => Reply::Json(json!({
            "img": {"any_to_png": {}, "rgb_to_gray": {}},
            "binarize": {"nlbin": {"threshold": "float", "zoom": "float", "escale": "float",
                                   "border": "float", "perc": [0, 100], "range": "int",
                                   "low": [0, 100], "high": [0, 100]}},
            "segmentation": {"tesseract": {}, "kraken": {}},
            "ocr": {"tesseract": {"languages": [], "extended": [false, true]}, "kraken": {"model": []}},
            "output": {"metadata": {"metadata": "file", "validate": [true, false]}},
            "archive": {"pybossa": {"name": "str", "description": "str"}}
        })),
        (Method::Get, ["pages", ..]) => Reply::Json(JsonValue::String(
            "<TEI xmlns=\"http://www.tei-c.org/ns/1.0\"/>".to_string(),
        )),
        _ => not_found(),
    }
}

fn not_found() -> Reply {
    Reply::Error {
        status: 404,
        message: "Not Found".to_string(),
    }
}

fn page_entry(batch_id: &str, name: &str) -> JsonValue {
    json!({"name": name, "url": format!("/api/v1/pages/{}/{}", batch_id, name)})
}

/// 历史中上传到该批次的扫描件（不含辅助文件）
fn uploaded_documents(batch_id: &str, history: &[RecordedCall]) -> Vec<String> {
    let pages = format!("/api/v1/batch/{}/pages", batch_id);
    history
        .iter()
        .filter(|c| c.method == Method::Post && c.path == pages)
        .flat_map(|c| c.files.iter().cloned())
        .collect()
}

fn registered_tasks(batch_id: &str, history: &[RecordedCall]) -> JsonValue {
    let prefix = format!("/api/v1/batch/{}/tasks/", batch_id);
    let mut groups: JsonMap<String, JsonValue> = JsonMap::new();
    for call in history.iter().filter(|c| c.method == Method::Post) {
        let Some((group, task)) = call.path.strip_prefix(&prefix).and_then(|r| r.split_once('/')) else {
            continue;
        };
        let args = call.body.clone().unwrap_or_else(|| json!({}));
        if let Some(entries) = groups
            .entry(group.to_string())
            .or_insert_with(|| JsonValue::Array(Vec::new()))
            .as_array_mut()
        {
            entries.push(json!([task, args]));
        }
    }
    JsonValue::Object(groups)
}

/// 每个文档一条 img -> ocr 链，全部成功
fn simulated_chains(batch_id: &str, documents: &[String]) -> JsonValue {
    let mut chains = JsonMap::new();
    for name in documents {
        let document = format!("/api/v1/pages/{}/{}", batch_id, name);
        let stem = name.rsplit_once('.').map_or(name.as_str(), |(stem, _)| stem);
        let result = format!("/api/v1/pages/{}/{}_ocr.xml", batch_id, stem);
        let img_id = format!("{}:img", name);
        let ocr_id = format!("{}:ocr", name);
        chains.insert(
            img_id.clone(),
            json!({"state": "SUCCESS", "children": [ocr_id], "parents": [],
                   "root_documents": [document], "task": ["img", "any_to_png"]}),
        );
        chains.insert(
            ocr_id,
            json!({"state": "SUCCESS", "children": [], "parents": [img_id],
                   "root_documents": [document], "result": [result], "task": ["ocr", "tesseract"]}),
        );
    }
    JsonValue::Object(chains)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_repeat_last() {
        let transport = RecordingTransport::new();
        transport.reply(Method::Get, "/a", Reply::Json(json!(1)));
        transport.reply(Method::Get, "/a", Reply::Json(json!(2)));

        assert_eq!(transport.get_json("/a").await.unwrap(), json!(1));
        assert_eq!(transport.get_json("/a").await.unwrap(), json!(2));
        assert_eq!(transport.get_json("/a").await.unwrap(), json!(2));
        assert_eq!(transport.get_json("/b").await.unwrap(), JsonValue::Null);
        assert_eq!(transport.count(Method::Get, "/a"), 3);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let transport = RecordingTransport::new();
        transport.reply(
            Method::Post,
            "/api/v1/batch",
            Reply::Error {
                status: 500,
                message: "boom".into(),
            },
        );
        let err = transport.post_json("/api/v1/batch", None).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_dry_run_lifecycle() {
        let transport = RecordingTransport::dry_run();
        let created = transport.post_json("/api/v1/batch", None).await.unwrap();
        assert_eq!(created["id"], "dry-run-0001");

        transport
            .post_files(
                "/api/v1/batch/dry-run-0001/pages",
                vec![UploadFile::scan("a.png", vec![1, 2, 3])],
            )
            .await
            .unwrap();
        let status = transport.get_json("/api/v1/batch/dry-run-0001").await.unwrap();
        assert!(status.get("chains").is_none());

        transport.post_json("/api/v1/batch/dry-run-0001", None).await.unwrap();
        let status = transport.get_json("/api/v1/batch/dry-run-0001").await.unwrap();
        assert_eq!(status["chains"].as_object().unwrap().len(), 2);
    }
}
