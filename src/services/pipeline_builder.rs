//! 流水线构建 - 业务能力层
//!
//! 根据识别语言、字体和二值化参数生成默认的处理流水线，
//! 并可对照服务端任务目录做校验。

use crate::error::{AppResult, BusinessError};
use crate::models::{Batch, NlbinParams, OcrSelection, Task};
use serde_json::Value as JsonValue;

/// 构建默认流水线
///
/// 顺序：转 PNG → nlbin 二值化 → tesseract 分割 → OCR → 元数据输出 → pybossa 归档
pub fn build_pipeline(batch: &Batch, ocr: &OcrSelection, binarization: &NlbinParams) -> AppResult<Vec<Task>> {
    if !ocr.has_languages() {
        return Err(BusinessError::NoLanguageSelected.into());
    }
    let metadata_url = batch
        .metadata_url
        .as_deref()
        .ok_or_else(|| BusinessError::MetadataIncomplete {
            missing: vec!["metadata.yaml".to_string()],
        })?;

    let mut binarize = Task::new("binarize", "nlbin");
    if let Ok(JsonValue::Object(args)) = serde_json::to_value(binarization) {
        binarize.args = args;
    }

    let ocr_task = match ocr.font_model() {
        Some(model) => Task::new("ocr", "kraken").arg("model", model),
        None => Task::new("ocr", "tesseract")
            .arg("languages", ocr.languages.clone())
            .arg("extended", true),
    };

    let field = |key: &str| batch.metadata.get(key).cloned().unwrap_or_default();

    Ok(vec![
        Task::new("img", "any_to_png"),
        binarize,
        Task::new("segmentation", "tesseract"),
        ocr_task,
        Task::new("output", "metadata")
            .arg("metadata", metadata_url)
            .arg("validate", false),
        Task::new("archive", "pybossa")
            .arg("name", field("title"))
            .arg("description", field("notes")),
    ])
}

/// 对照 `GET /api/v1/tasks` 的目录检查每个任务是否存在
pub fn validate_pipeline(tasks: &[Task], catalogue: &JsonValue) -> AppResult<()> {
    for task in tasks {
        let known = catalogue
            .get(&task.group)
            .and_then(|group| group.get(&task.name))
            .is_some();
        if !known {
            return Err(BusinessError::UnknownTask {
                group: task.group.clone(),
                task: task.name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use serde_json::json;

    fn batch() -> Batch {
        let mut batch = Batch::with_id("b1");
        batch.metadata_url = Some("/api/v1/pages/b1/metadata.yaml".into());
        batch.metadata.insert("title".into(), "Iliad".into());
        batch.metadata.insert("notes".into(), "book 1".into());
        batch
    }

    fn selection(languages: &[&str]) -> OcrSelection {
        OcrSelection {
            languages: languages.iter().map(|l| l.to_string()).collect(),
            ..OcrSelection::default()
        }
    }

    #[test]
    fn test_default_pipeline_uses_tesseract() {
        let tasks = build_pipeline(&batch(), &selection(&["eng", "lat"]), &NlbinParams::default()).unwrap();
        let labels: Vec<_> = tasks.iter().map(Task::label).collect();
        assert_eq!(
            labels,
            vec![
                "img/any_to_png",
                "binarize/nlbin",
                "segmentation/tesseract",
                "ocr/tesseract",
                "output/metadata",
                "archive/pybossa"
            ]
        );
        assert_eq!(tasks[1].args["threshold"], 0.5);
        assert_eq!(tasks[1].args["perc"], 80);
        assert_eq!(tasks[3].args["languages"], json!(["eng", "lat"]));
        assert_eq!(tasks[3].args["extended"], true);
        assert_eq!(tasks[4].args["metadata"], "/api/v1/pages/b1/metadata.yaml");
        assert_eq!(tasks[4].args["validate"], false);
        assert_eq!(tasks[5].args["name"], "Iliad");
        assert_eq!(tasks[5].args["description"], "book 1");
    }

    #[test]
    fn test_greek_font_selects_kraken() {
        let mut ocr = selection(&["grc", "lat"]);
        ocr.greek_font = Some("teubner".into());
        let tasks = build_pipeline(&batch(), &ocr, &NlbinParams::default()).unwrap();
        assert_eq!(tasks[3].label(), "ocr/kraken");
        assert_eq!(tasks[3].args["model"], "teubner");

        ocr.greek_font = Some("none".into());
        let tasks = build_pipeline(&batch(), &ocr, &NlbinParams::default()).unwrap();
        assert_eq!(tasks[3].label(), "ocr/tesseract");
    }

    #[test]
    fn test_requires_language_and_metadata() {
        let err = build_pipeline(&batch(), &selection(&[]), &NlbinParams::default()).unwrap_err();
        assert!(matches!(err, AppError::Business(BusinessError::NoLanguageSelected)));

        let err = build_pipeline(&Batch::with_id("b1"), &selection(&["eng"]), &NlbinParams::default()).unwrap_err();
        assert!(matches!(err, AppError::Business(BusinessError::MetadataIncomplete { .. })));
    }

    #[test]
    fn test_validate_against_catalogue() {
        let tasks = vec![Task::new("img", "any_to_png"), Task::new("ocr", "abbyy")];
        let catalogue = json!({"img": {"any_to_png": {}}, "ocr": {"tesseract": {}}});
        assert!(validate_pipeline(&tasks[..1], &catalogue).is_ok());
        let err = validate_pipeline(&tasks, &catalogue).unwrap_err();
        assert!(err.to_string().contains("ocr/abbyy"));
    }

    #[test]
    fn test_default_pipeline_matches_server_catalogue() {
        use crate::infrastructure::{RecordingTransport, Transport};

        let transport = RecordingTransport::dry_run();
        let catalogue = tokio_test::block_on(transport.get_json("/api/v1/tasks")).unwrap();

        let mut ocr = selection(&["syr"]);
        ocr.syriac_font = Some("estrangelo".into());
        for selection in [selection(&["eng"]), ocr] {
            let tasks = build_pipeline(&batch(), &selection, &NlbinParams::default()).unwrap();
            tokio_test::assert_ok!(validate_pipeline(&tasks, &catalogue));
        }
    }
}
