//! HTTP 执行器 - 基础设施层
//!
//! 持有唯一的 reqwest 客户端，只暴露"发请求"的能力

use crate::error::{AppError, AppResult};
use crate::infrastructure::transport::{Transport, UploadFile};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

/// HTTP 执行器
///
/// 职责：
/// - 持有 reqwest Client
/// - 拼接 API 根地址
/// - 把非 2xx 响应转换为 `ApiError::BadResponse`
/// - 不认识 Batch / Task
pub struct HttpExecutor {
    client: Client,
    base_url: String,
}

impl HttpExecutor {
    /// 创建新的 HTTP 执行器
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::api_request_failed("client", e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 相对路径拼接到根地址，完整 URL 原样返回
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// 检查状态码并读取响应体
    async fn read_body(url: &str, response: Response) -> AppResult<Vec<u8>> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::api_request_failed(url, e))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<JsonValue>(&bytes)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));
            return Err(AppError::bad_response(url, status.as_u16(), message));
        }

        Ok(bytes.to_vec())
    }

    async fn read_json(url: &str, response: Response) -> AppResult<JsonValue> {
        let bytes = Self::read_body(url, response).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonValue::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Transport for HttpExecutor {
    async fn get_json(&self, path: &str) -> AppResult<JsonValue> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;
        Self::read_json(&url, response).await
    }

    async fn post_json(&self, path: &str, body: Option<&JsonValue>) -> AppResult<JsonValue> {
        let url = self.url(path);
        debug!("POST {} body={:?}", url, body);
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;
        Self::read_json(&url, response).await
    }

    async fn post_files(&self, path: &str, files: Vec<UploadFile>) -> AppResult<JsonValue> {
        let url = self.url(path);
        debug!("POST {} ({} 个文件)", url, files.len());

        let form = files.into_iter().fold(Form::new(), |form, file| {
            form.part(file.field, Part::bytes(file.bytes).file_name(file.file_name))
        });

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;
        Self::read_json(&url, response).await
    }

    async fn get_bytes(&self, path: &str) -> AppResult<Vec<u8>> {
        let url = self.url(path);
        debug!("GET {} (下载)", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;
        Self::read_body(&url, response).await
    }
}
