use crate::error::{AppError, AppResult, FileError};
use crate::models::submission::Submission;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载一次提交
pub async fn load_submission(toml_file_path: &Path) -> AppResult<Submission> {
    let path_text = toml_file_path.display().to_string();
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_text, e))?;

    let submission: Submission = toml::from_str(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: path_text.clone(),
            source: Box::new(e),
        })
    })?;

    Ok(submission.with_file_path(toml_file_path.to_string_lossy().to_string()))
}

/// 从文件夹中加载所有提交文件，按文件名排序
pub async fn load_all_submissions(folder_path: &str) -> AppResult<Vec<Submission>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    toml_files.sort();

    let mut submissions = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_submission(&path).await {
            Ok(submission) => {
                tracing::info!("成功加载 {} 个扫描件", submission.scans.len());
                submissions.push(submission);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(submissions)
}
