//! 结果下载 - 业务能力层
//!
//! 把成功文档的结果文件保存到 `<下载目录>/<批次ID>/<文件名>`

use crate::aggregator::DocumentResult;
use crate::error::{AppError, AppResult};
use crate::services::BatchService;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 结果下载器
pub struct ResultDownloader {
    folder: PathBuf,
}

impl ResultDownloader {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// 下载所有有链接且未失败的结果，返回写入的文件路径
    ///
    /// 单个文件下载失败只记录警告
    pub async fn download_all(
        &self,
        service: &BatchService,
        batch_id: &str,
        results: &[DocumentResult],
    ) -> AppResult<Vec<PathBuf>> {
        let target_dir = self.folder.join(batch_id);
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(|e| AppError::file_write_failed(target_dir.display().to_string(), e))?;

        let mut saved = Vec::new();
        for result in results.iter().filter(|r| !r.failed) {
            let Some(link) = result.link.as_deref() else {
                continue;
            };

            let bytes = match service.download(link).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("⚠️ 下载结果失败 {}: {}", result.name, e);
                    continue;
                }
            };

            let path = target_dir.join(file_name(link));
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
            debug!("已保存 {}", path.display());
            saved.push(path);
        }

        Ok(saved)
    }
}

fn file_name(link: &str) -> &str {
    let trimmed = link.split(['?', '#']).next().unwrap_or(link);
    Path::new(trimmed)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("result.xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::RecordingTransport;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_download_skips_failed_and_missing_links() {
        let dir = tempfile::tempdir().unwrap();
        let service = BatchService::new(Arc::new(RecordingTransport::dry_run()));
        let results = vec![
            DocumentResult {
                name: "a.png".into(),
                path: "/api/v1/pages/b1/a.png".into(),
                link: Some("/api/v1/pages/b1/a_ocr.xml".into()),
                failed: false,
            },
            DocumentResult {
                name: "b.png".into(),
                path: "/api/v1/pages/b1/b.png".into(),
                link: Some("/api/v1/pages/b1/b_ocr.xml".into()),
                failed: true,
            },
            DocumentResult {
                name: "c.png".into(),
                path: "/api/v1/pages/b1/c.png".into(),
                link: None,
                failed: false,
            },
        ];

        let saved = ResultDownloader::new(dir.path())
            .download_all(&service, "b1", &results)
            .await
            .unwrap();

        assert_eq!(saved, vec![dir.path().join("b1").join("a_ocr.xml")]);
        let content = std::fs::read_to_string(&saved[0]).unwrap();
        assert!(content.contains("TEI"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("http://x/pages/b/a.xml?raw=1"), "a.xml");
        assert_eq!(file_name("/pages/b/"), "b");
    }
}
