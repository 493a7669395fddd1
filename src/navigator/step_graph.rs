//! 步骤图
//!
//! 显式的线性步骤序列，代替按页面元素相邻关系推导上一步/下一步

use crate::error::NavigationError;
use crate::models::{PaneId, WizardStep};

/// 有序步骤图：Main → PreScan → PreUpload → Upload → Metadata → PreProcess → Status
#[derive(Debug, Clone)]
pub struct StepGraph {
    order: Vec<PaneId>,
}

impl Default for StepGraph {
    fn default() -> Self {
        let order = std::iter::once(PaneId::Main)
            .chain(WizardStep::ALL.into_iter().map(PaneId::from))
            .collect();
        Self { order }
    }
}

impl StepGraph {
    pub fn steps(&self) -> &[PaneId] {
        &self.order
    }

    fn position(&self, id: PaneId) -> Option<usize> {
        self.order.iter().position(|p| *p == id)
    }

    pub fn next(&self, from: PaneId) -> Result<PaneId, NavigationError> {
        self.position(from)
            .and_then(|i| self.order.get(i + 1))
            .copied()
            .ok_or_else(|| NavigationError::NoNextStep {
                from: from.to_string(),
            })
    }

    pub fn previous(&self, from: PaneId) -> Result<PaneId, NavigationError> {
        self.position(from)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.order.get(i))
            .copied()
            .ok_or_else(|| NavigationError::NoPreviousStep {
                from: from.to_string(),
            })
    }

    /// 进入 Upload 之后的步骤必须有批次ID
    pub fn guard(target: PaneId, batch_id: Option<&str>) -> Result<(), NavigationError> {
        match target.step() {
            Some(step) if step.requires_batch_id() && batch_id.map_or(true, str::is_empty) => {
                Err(NavigationError::MissingBatchId {
                    step: step.name().to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}
