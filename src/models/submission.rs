//! 提交文件模型
//!
//! 一个 TOML 文件描述一次提交：扫描件、元数据、识别语言和二值化参数

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 一次提交（对应一个 TOML 文件）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub name: String,
    /// 扫描件路径，相对路径以提交文件所在目录为准
    #[serde(default)]
    pub scans: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub ocr: OcrSelection,
    #[serde(default)]
    pub binarization: NlbinParams,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl Submission {
    /// 解析后的扫描件路径
    pub fn scan_paths(&self) -> Vec<PathBuf> {
        let base = self
            .file_path
            .as_deref()
            .and_then(|p| Path::new(p).parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();

        self.scans
            .iter()
            .map(|scan| {
                let path = Path::new(scan);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    base.join(path)
                }
            })
            .collect()
    }

    pub fn with_file_path(mut self, file_path: String) -> Self {
        self.file_path = Some(file_path);
        self
    }
}

/// 需要专用字体模型的文字
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Greek,
    Arabic,
    Syriac,
}

/// 识别语言与字体选择
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrSelection {
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub greek_font: Option<String>,
    #[serde(default)]
    pub arabic_font: Option<String>,
    #[serde(default)]
    pub syriac_font: Option<String>,
}

/// 可与希腊字体模型组合的语言
const GREEK_COMPATIBLE: [&str; 3] = ["lat", "eng", "grc"];

impl OcrSelection {
    pub fn has_languages(&self) -> bool {
        !self.languages.is_empty()
    }

    /// 当前语言组合下可选字体的文字
    ///
    /// - 希腊文：选中 grc，且全部语言都在 lat/eng/grc 之内
    /// - 阿拉伯文：只选中 ara
    /// - 叙利亚文：只选中 syr
    pub fn font_script(&self) -> Option<Script> {
        let langs = &self.languages;
        if langs.iter().any(|l| l == "grc") && langs.iter().all(|l| GREEK_COMPATIBLE.contains(&l.as_str())) {
            return Some(Script::Greek);
        }
        match langs.as_slice() {
            [only] if only == "ara" => Some(Script::Arabic),
            [only] if only == "syr" => Some(Script::Syriac),
            _ => None,
        }
    }

    /// 选中的字体模型；未选或选择 `none` 时为 None
    pub fn font_model(&self) -> Option<&str> {
        let font = match self.font_script()? {
            Script::Greek => self.greek_font.as_deref(),
            Script::Arabic => self.arabic_font.as_deref(),
            Script::Syriac => self.syriac_font.as_deref(),
        }?;
        let font = font.trim();
        (!font.is_empty() && font != "none").then_some(font)
    }
}

/// nlbin 二值化参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NlbinParams {
    pub threshold: f64,
    pub zoom: f64,
    pub escale: f64,
    pub border: f64,
    pub perc: u32,
    pub range: u32,
    pub low: u32,
    pub high: u32,
}

impl Default for NlbinParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            zoom: 0.5,
            escale: 1.0,
            border: 0.1,
            perc: 80,
            range: 20,
            low: 5,
            high: 90,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(langs: &[&str]) -> OcrSelection {
        OcrSelection {
            languages: langs.iter().map(|s| s.to_string()).collect(),
            greek_font: Some("teubner".into()),
            arabic_font: Some("amiri".into()),
            syriac_font: Some("none".into()),
        }
    }

    #[test]
    fn test_font_script_rules() {
        assert_eq!(selection(&["grc", "lat"]).font_script(), Some(Script::Greek));
        assert_eq!(selection(&["grc", "deu"]).font_script(), None);
        assert_eq!(selection(&["ara"]).font_script(), Some(Script::Arabic));
        assert_eq!(selection(&["ara", "eng"]).font_script(), None);
        assert_eq!(selection(&["syr"]).font_script(), Some(Script::Syriac));
    }

    #[test]
    fn test_font_model_none_is_ignored() {
        assert_eq!(selection(&["grc"]).font_model(), Some("teubner"));
        assert_eq!(selection(&["syr"]).font_model(), None);
        assert_eq!(selection(&["eng"]).font_model(), None);
    }

    #[test]
    fn test_scan_paths_relative_to_file() {
        let submission = Submission {
            name: "iliad".into(),
            scans: vec!["scans/001.png".into(), "/abs/002.png".into()],
            metadata: BTreeMap::new(),
            ocr: OcrSelection::default(),
            binarization: NlbinParams::default(),
            file_path: Some("/data/submissions/iliad.toml".into()),
        };
        assert_eq!(
            submission.scan_paths(),
            vec![
                PathBuf::from("/data/submissions/scans/001.png"),
                PathBuf::from("/abs/002.png")
            ]
        );
    }
}
