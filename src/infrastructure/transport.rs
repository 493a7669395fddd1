//! 传输接口 - 基础设施层
//!
//! 上层服务只依赖这个 trait，不关心请求如何发出

use crate::error::AppResult;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// 待上传的文件
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// 表单字段名
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// 以 `scans` 字段上传
    pub fn scan(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: "scans".to_string(),
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// REST 传输能力
///
/// `path` 可以是相对 API 根地址的路径，也可以是完整 URL
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET 并解析 JSON
    async fn get_json(&self, path: &str) -> AppResult<JsonValue>;

    /// POST JSON（可为空）并解析 JSON 响应
    async fn post_json(&self, path: &str, body: Option<&JsonValue>) -> AppResult<JsonValue>;

    /// multipart 上传
    async fn post_files(&self, path: &str, files: Vec<UploadFile>) -> AppResult<JsonValue>;

    /// GET 原始字节（下载结果文件）
    async fn get_bytes(&self, path: &str) -> AppResult<Vec<u8>>;
}
