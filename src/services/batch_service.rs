//! 批次服务 - 业务能力层
//!
//! 把客户端 `Batch` 模型与服务端接口同步。
//! 每个方法只做一件事，不关心向导流程顺序。

use crate::error::{AppError, AppResult, BusinessError};
use crate::infrastructure::{Transport, UploadFile};
use crate::models::{flatten_task_listing, Batch, BatchHandle, BatchStatus, Document, Task};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info, warn};

const BATCH_ENDPOINT: &str = "/api/v1/batch";
const TASK_CATALOGUE_ENDPOINT: &str = "/api/v1/tasks";
const METADATA_FILE_NAME: &str = "metadata.yaml";

/// 批次服务
///
/// 职责：
/// - 创建、执行批次
/// - 上传扫描件与元数据文件
/// - 注册任务并回读任务列表
/// - 刷新状态快照
/// - 不持有 Batch，调用方传入可变引用
#[derive(Clone)]
pub struct BatchService {
    transport: Arc<dyn Transport>,
}

impl BatchService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// 在服务端创建批次，返回分配的ID
    pub async fn create(&self, batch: &mut Batch) -> AppResult<String> {
        let response = self.transport.post_json(BATCH_ENDPOINT, None).await?;
        let handle: BatchHandle = serde_json::from_value(response)
            .map_err(|e| AppError::unexpected_payload(BATCH_ENDPOINT, e.to_string()))?;

        if handle.id.is_empty() {
            return Err(AppError::unexpected_payload(BATCH_ENDPOINT, "批次ID为空"));
        }

        info!("🆕 批次已创建: {}", handle.id);
        batch.id = Some(handle.id.clone());
        Ok(handle.id)
    }

    /// 上传扫描件，整批完成后标记上传完成并刷新文档列表
    pub async fn upload_scans(&self, batch: &mut Batch, files: Vec<UploadFile>) -> AppResult<()> {
        let path = pages_path(batch.require_id()?);
        debug!("上传 {} 个扫描件到 {}", files.len(), path);

        self.transport.post_files(&path, files).await?;
        batch.upload_complete = true;

        self.fetch_documents(batch).await?;
        Ok(())
    }

    /// 回读已上传的文档
    pub async fn fetch_documents(&self, batch: &mut Batch) -> AppResult<()> {
        let path = pages_path(batch.require_id()?);
        let response = self.transport.get_json(&path).await?;
        batch.documents = parse_documents(&path, response)?;
        Ok(())
    }

    /// 元数据以 YAML 文件形式上传为辅助文件，记录返回的地址
    pub async fn save_metadata(&self, batch: &mut Batch) -> AppResult<String> {
        let path = format!("{}?auxiliary=1", pages_path(batch.require_id()?));
        let blob = serde_yaml::to_string(&batch.metadata)?;

        let response = self
            .transport
            .post_files(&path, vec![UploadFile::scan(METADATA_FILE_NAME, blob.into_bytes())])
            .await?;

        let url = parse_documents(&path, response)?
            .into_iter()
            .next()
            .map(|doc| doc.url)
            .ok_or_else(|| AppError::unexpected_payload(&path, "缺少元数据文件地址"))?;

        debug!("元数据文件地址: {}", url);
        batch.metadata_url = Some(url.clone());
        Ok(url)
    }

    /// 注册单个任务
    pub async fn add_task(&self, batch: &mut Batch, task: Task) -> AppResult<()> {
        self.add_tasks(batch, vec![task]).await
    }

    /// 按顺序注册任务
    ///
    /// 全部请求结束后只回读一次任务列表；任一失败即返回错误，不重试
    pub async fn add_tasks(&self, batch: &mut Batch, tasks: Vec<Task>) -> AppResult<()> {
        let id = batch.require_id()?.to_string();
        let total = tasks.len();

        let requests = tasks.iter().map(|task| {
            let path = format!("{}/{}/tasks/{}/{}", BATCH_ENDPOINT, id, task.group, task.name);
            let body = JsonValue::Object(task.args.clone());
            async move { self.transport.post_json(&path, Some(&body)).await }
        });
        let outcomes = futures::future::join_all(requests).await;

        let mut failed = 0;
        for (task, outcome) in tasks.iter().zip(outcomes) {
            if let Err(e) = outcome {
                warn!("⚠️ 任务注册失败 {}: {}", task.label(), e);
                failed += 1;
            }
        }

        self.fetch_tasks(batch).await?;

        if failed > 0 {
            return Err(BusinessError::TaskRegistrationFailed { failed, total }.into());
        }
        Ok(())
    }

    /// 回读任务列表
    pub async fn fetch_tasks(&self, batch: &mut Batch) -> AppResult<()> {
        let path = format!("{}/{}/tasks", BATCH_ENDPOINT, batch.require_id()?);
        let listing = self.transport.get_json(&path).await?;
        batch.tasks = flatten_task_listing(&listing);
        Ok(())
    }

    /// 开始执行批次
    pub async fn execute(&self, batch: &Batch) -> AppResult<BatchHandle> {
        let id = batch.require_id()?;
        let path = format!("{}/{}", BATCH_ENDPOINT, id);
        let response = self.transport.post_json(&path, None).await?;

        info!("▶️ 批次 {} 开始执行", id);
        Ok(serde_json::from_value(response).unwrap_or_else(|_| BatchHandle {
            id: id.to_string(),
            url: None,
        }))
    }

    /// 刷新状态快照
    pub async fn refresh_status(&self, batch: &mut Batch) -> AppResult<()> {
        let path = format!("{}/{}", BATCH_ENDPOINT, batch.require_id()?);
        let response = self.transport.get_json(&path).await?;
        let status: BatchStatus = serde_json::from_value(response)
            .map_err(|e| AppError::unexpected_payload(&path, e.to_string()))?;
        batch.status = Some(status);
        Ok(())
    }

    /// 服务端支持的任务目录
    pub async fn available_tasks(&self) -> AppResult<JsonValue> {
        self.transport.get_json(TASK_CATALOGUE_ENDPOINT).await
    }

    /// 下载结果文件
    pub async fn download(&self, url: &str) -> AppResult<Vec<u8>> {
        self.transport.get_bytes(url).await
    }
}

fn pages_path(id: &str) -> String {
    format!("{}/{}/pages", BATCH_ENDPOINT, id)
}

fn parse_documents(endpoint: &str, response: JsonValue) -> AppResult<Vec<Document>> {
    match response {
        JsonValue::Null => Ok(Vec::new()),
        other => serde_json::from_value(other)
            .map_err(|e| AppError::unexpected_payload(endpoint, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{Method, RecordingTransport, Reply};

    fn service() -> (Arc<RecordingTransport>, BatchService) {
        let transport = Arc::new(RecordingTransport::dry_run());
        (transport.clone(), BatchService::new(transport))
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let (_, service) = service();
        let mut batch = Batch::new();
        let id = service.create(&mut batch).await.unwrap();
        assert_eq!(batch.id(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn test_no_request_without_id() {
        let (transport, service) = service();
        let mut batch = Batch::new();

        assert!(service.upload_scans(&mut batch, Vec::new()).await.is_err());
        assert!(service.save_metadata(&mut batch).await.is_err());
        assert!(service.add_task(&mut batch, Task::new("img", "any_to_png")).await.is_err());
        assert!(service.refresh_status(&mut batch).await.is_err());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_task_fetches_task_list_once() {
        let (transport, service) = service();
        let mut batch = Batch::new();
        let id = service.create(&mut batch).await.unwrap();

        service
            .add_task(&mut batch, Task::new("ocr", "kraken").arg("model", "grc-x"))
            .await
            .unwrap();

        let tasks_path = format!("/api/v1/batch/{}/tasks", id);
        assert_eq!(transport.count(Method::Get, &tasks_path), 1);
        assert_eq!(batch.tasks.len(), 1);
        assert_eq!(batch.tasks[0].label(), "ocr/kraken");
        assert_eq!(batch.tasks[0].args["model"], "grc-x");
    }

    #[tokio::test]
    async fn test_partial_registration_failure() {
        let (transport, service) = service();
        let mut batch = Batch::new();
        let id = service.create(&mut batch).await.unwrap();
        transport.reply(
            Method::Post,
            format!("/api/v1/batch/{}/tasks/ocr/tesseract", id),
            Reply::Error {
                status: 400,
                message: "bad args".into(),
            },
        );

        let tasks = vec![Task::new("img", "any_to_png"), Task::new("ocr", "tesseract")];
        let err = service.add_tasks(&mut batch, tasks).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Business(BusinessError::TaskRegistrationFailed { failed: 1, total: 2 })
        ));
        assert_eq!(transport.count(Method::Get, &format!("/api/v1/batch/{}/tasks", id)), 1);
    }

    #[tokio::test]
    async fn test_upload_and_metadata() {
        let (transport, service) = service();
        let mut batch = Batch::new();
        let id = service.create(&mut batch).await.unwrap();

        service
            .upload_scans(&mut batch, vec![UploadFile::scan("p1.png", vec![0u8; 4])])
            .await
            .unwrap();
        assert!(batch.upload_complete);
        assert_eq!(batch.documents.len(), 1);
        assert_eq!(batch.documents[0].name, "p1.png");

        batch.metadata.insert("title".into(), "Iliad".into());
        let url = service.save_metadata(&mut batch).await.unwrap();
        assert!(url.ends_with("metadata.yaml"));
        assert_eq!(batch.metadata_url.as_deref(), Some(url.as_str()));

        let aux = transport
            .calls()
            .into_iter()
            .find(|c| c.path == format!("/api/v1/batch/{}/pages?auxiliary=1", id))
            .unwrap();
        assert_eq!(aux.files, vec!["metadata.yaml".to_string()]);
    }
}
