//! 失败记录服务 - 业务能力层
//!
//! 只负责把失败的任务写入 warn.txt，不关心流程

use crate::aggregator::FailureNote;
use crate::error::{AppError, AppResult};
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

/// 失败记录服务
///
/// 职责：
/// - 将失败的任务及其文档追加到记录文件
/// - 一次只写一个批次
pub struct FailureWriter {
    file_path: String,
}

impl FailureWriter {
    pub fn new() -> Self {
        Self {
            file_path: "warn.txt".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            file_path: path.into(),
        }
    }

    /// 追加一个批次的失败记录，没有失败时不写文件
    pub fn write(&self, submission: &str, batch_id: &str, failures: &[FailureNote]) -> AppResult<()> {
        if failures.is_empty() {
            return Ok(());
        }
        debug!("写入失败记录: 批次 {} | {} 条", batch_id, failures.len());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .map_err(|e| AppError::file_write_failed(&self.file_path, e))?;

        let mut lines = String::new();
        for note in failures {
            lines.push_str(&format!(
                "提交 {} | 批次 {} | 任务 {} | 文档: {} | 原因: {}\n",
                submission,
                batch_id,
                note.task.as_deref().unwrap_or("-"),
                note.documents.join(", "),
                note.message.as_deref().unwrap_or("未知"),
            ));
        }

        file.write_all(lines.as_bytes())
            .map_err(|e| AppError::file_write_failed(&self.file_path, e))?;
        Ok(())
    }
}

impl Default for FailureWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warn.txt");
        let writer = FailureWriter::with_path(path.to_string_lossy());

        let note = FailureNote {
            task: Some("binarize.nlbin".into()),
            documents: vec!["/pages/b1/a.png".into()],
            message: Some("image too small".into()),
        };
        writer.write("iliad", "b1", &[note.clone()]).unwrap();
        writer.write("iliad", "b1", &[note]).unwrap();
        writer.write("iliad", "b1", &[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("binarize.nlbin"));
        assert!(content.contains("image too small"));
    }
}
