//! 客户端路由
//!
//! 路径与面板之间的双向映射：
//! `/`、`/prescan`、`/preupload`、`/upload[/{id}]`、`/metadata/{id}`、`/preprocess/{id}`、`/status/{id}`

use crate::error::NavigationError;
use crate::models::{PaneId, WizardStep};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// 批次ID只允许字母、数字和 `_` `.` `-`，且不能以符号开头
fn is_valid_batch_id(id: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(id))
}

/// 解析后的路由
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub target: PaneId,
    pub batch_id: Option<String>,
}

impl Route {
    /// 解析路径，开头的 `#` 和 `/` 可省略
    pub fn parse(path: &str) -> Result<Self, NavigationError> {
        let unknown = || NavigationError::UnknownRoute {
            path: path.to_string(),
        };

        let trimmed = path.trim();
        let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let trimmed = trimmed.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self {
                target: PaneId::Main,
                batch_id: None,
            });
        }

        let mut segments = trimmed.split('/');
        let step = segments
            .next()
            .and_then(WizardStep::from_segment)
            .ok_or_else(unknown)?;
        let batch_id = segments.next();
        if segments.next().is_some() {
            return Err(unknown());
        }

        match batch_id {
            Some(id) if !step.carries_batch_id() || !is_valid_batch_id(id) => Err(unknown()),
            None if step.requires_batch_id() => Err(NavigationError::MissingBatchId {
                step: step.name().to_string(),
            }),
            _ => Ok(Self {
                target: step.into(),
                batch_id: batch_id.map(str::to_string),
            }),
        }
    }

    /// 标准路径
    pub fn path(&self) -> String {
        match (self.target, self.batch_id.as_deref()) {
            (PaneId::Main, _) => "/".to_string(),
            (PaneId::Step(step), Some(id)) if step.carries_batch_id() => {
                format!("/{}/{}", step.segment(), id)
            }
            (PaneId::Step(step), _) => format!("/{}", step.segment()),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// 构建目标路由：Upload 及之后的步骤在已有批次ID时携带它，其余步骤从不携带
pub fn route_for(target: PaneId, batch_id: Option<&str>) -> Route {
    let carries = target.step().is_some_and(WizardStep::carries_batch_id);
    Route {
        target,
        batch_id: batch_id
            .filter(|id| carries && !id.is_empty())
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_route_form() {
        let cases = [
            ("/", PaneId::Main, None),
            ("", PaneId::Main, None),
            ("#prescan", WizardStep::PreScan.into(), None),
            ("preupload", WizardStep::PreUpload.into(), None),
            ("/upload", WizardStep::Upload.into(), None),
            ("#/upload/abc-1", WizardStep::Upload.into(), Some("abc-1")),
            ("/metadata/abc-1", WizardStep::Metadata.into(), Some("abc-1")),
            ("/preprocess/abc-1/", WizardStep::PreProcess.into(), Some("abc-1")),
            ("status/abc-1", WizardStep::Status.into(), Some("abc-1")),
        ];
        for (path, target, id) in cases {
            let route = Route::parse(path).unwrap();
            assert_eq!(route.target, target, "{}", path);
            assert_eq!(route.batch_id.as_deref(), id, "{}", path);
            assert_eq!(Route::parse(&route.path()).unwrap(), route);
        }
    }

    #[test]
    fn test_parse_rejects() {
        assert!(matches!(
            Route::parse("/metadata"),
            Err(NavigationError::MissingBatchId { .. })
        ));
        assert!(matches!(
            Route::parse("/status/"),
            Err(NavigationError::MissingBatchId { .. })
        ));
        for bad in ["/nowhere", "/prescan/abc", "/status/a/b", "/status/../x", "/upload/a b"] {
            assert!(
                matches!(Route::parse(bad), Err(NavigationError::UnknownRoute { .. })),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_route_for_decoration() {
        assert_eq!(route_for(WizardStep::PreScan.into(), Some("x")).path(), "/prescan");
        assert_eq!(route_for(WizardStep::PreUpload.into(), Some("x")).path(), "/preupload");
        assert_eq!(route_for(WizardStep::Upload.into(), None).path(), "/upload");
        assert_eq!(route_for(WizardStep::Upload.into(), Some("x")).path(), "/upload/x");
        assert_eq!(route_for(WizardStep::Status.into(), Some("x")).path(), "/status/x");
        assert_eq!(route_for(PaneId::Main, Some("x")).path(), "/");
    }
}
