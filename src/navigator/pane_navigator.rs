//! 面板导航器
//!
//! 向导状态机：决定哪个面板可见，维护步骤进度和历史记录。
//! 每次切换都会：
//! - 隐藏其它面板
//! - 目标面板首次出现时构建，之后复用同一实例
//! - 目标之前的步骤标记为完成，其余标记为未完成（Main 不显示进度）

use crate::error::NavigationError;
use crate::models::{PaneId, WizardStep};
use crate::navigator::route::{route_for, Route};
use crate::navigator::step_graph::StepGraph;
use crate::panes::Pane;
use std::collections::BTreeMap;
use tracing::debug;

/// 步骤进度指示
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepProgress {
    visible: bool,
    complete: [bool; 6],
}

impl StepProgress {
    fn update(&mut self, target: PaneId) {
        match target.step() {
            None => {
                self.visible = false;
                self.complete = Default::default();
            }
            Some(current) => {
                self.visible = true;
                for step in WizardStep::ALL {
                    self.complete[step.index()] = step < current;
                }
            }
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_complete(&self, step: WizardStep) -> bool {
        self.complete[step.index()]
    }

    pub fn completed(&self) -> usize {
        self.complete.iter().filter(|c| **c).count()
    }

    /// 形如 `✔PreScan ✔PreUpload ○Upload ...`
    pub fn render(&self) -> String {
        if !self.visible {
            return String::new();
        }
        WizardStep::ALL
            .iter()
            .map(|step| format!("{}{}", if self.is_complete(*step) { "✔" } else { "○" }, step))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 面板注册表，每个步骤至多一个实例
#[derive(Default)]
pub struct PaneRegistry {
    panes: BTreeMap<PaneId, Pane>,
    visible: Option<PaneId>,
    constructed: usize,
}

impl PaneRegistry {
    /// 显示目标面板并隐藏其它面板，返回是否新构建
    fn show(&mut self, id: PaneId) -> bool {
        self.visible = Some(id);
        if self.panes.contains_key(&id) {
            return false;
        }
        self.panes.insert(id, Pane::build(id));
        self.constructed += 1;
        true
    }

    pub fn get(&self, id: PaneId) -> Option<&Pane> {
        self.panes.get(&id)
    }

    pub fn get_mut(&mut self, id: PaneId) -> Option<&mut Pane> {
        self.panes.get_mut(&id)
    }

    pub fn is_visible(&self, id: PaneId) -> bool {
        self.visible == Some(id)
    }

    /// 累计构建的面板数量
    pub fn constructed(&self) -> usize {
        self.constructed
    }

    fn dispose_all(&mut self) {
        for pane in self.panes.values_mut() {
            pane.dispose();
        }
        self.visible = None;
    }
}

/// 面板导航器
pub struct PaneNavigator {
    graph: StepGraph,
    current: PaneId,
    history: Vec<String>,
    progress: StepProgress,
    registry: PaneRegistry,
}

impl PaneNavigator {
    /// 初始状态为 Main，不写入历史记录
    pub fn new() -> Self {
        let mut navigator = Self {
            graph: StepGraph::default(),
            current: PaneId::Main,
            history: Vec::new(),
            progress: StepProgress::default(),
            registry: PaneRegistry::default(),
        };
        navigator.enter(PaneId::Main);
        navigator
    }

    pub fn current(&self) -> PaneId {
        self.current
    }

    /// 切换到指定步骤并写入历史记录
    pub fn navigate(&mut self, target: PaneId, batch_id: Option<&str>) -> Result<Route, NavigationError> {
        StepGraph::guard(target, batch_id)?;
        let route = route_for(target, batch_id);
        self.enter(target);
        self.history.push(route.path());
        Ok(route)
    }

    pub fn next(&mut self, batch_id: Option<&str>) -> Result<Route, NavigationError> {
        let target = self.graph.next(self.current)?;
        self.navigate(target, batch_id)
    }

    pub fn previous(&mut self, batch_id: Option<&str>) -> Result<Route, NavigationError> {
        let target = self.graph.previous(self.current)?;
        self.navigate(target, batch_id)
    }

    /// 按路径直接打开（深链接）
    pub fn open(&mut self, path: &str) -> Result<Route, NavigationError> {
        let route = Route::parse(path)?;
        self.enter(route.target);
        self.history.push(route.path());
        Ok(route)
    }

    /// 替换当前历史记录（创建批次后把 `/upload` 改写为 `/upload/{id}`）
    pub fn replace(&mut self, target: PaneId, batch_id: Option<&str>) -> Result<Route, NavigationError> {
        StepGraph::guard(target, batch_id)?;
        let route = route_for(target, batch_id);
        self.enter(target);
        match self.history.last_mut() {
            Some(last) => *last = route.path(),
            None => self.history.push(route.path()),
        }
        Ok(route)
    }

    fn enter(&mut self, target: PaneId) {
        let constructed = self.registry.show(target);
        self.progress.update(target);
        self.current = target;
        debug!(
            "进入面板 {}{} | 进度 {}",
            target,
            if constructed { " (新建)" } else { "" },
            self.progress.render()
        );
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn progress(&self) -> &StepProgress {
        &self.progress
    }

    pub fn registry(&self) -> &PaneRegistry {
        &self.registry
    }

    pub fn pane_mut(&mut self, id: PaneId) -> Option<&mut Pane> {
        self.registry.get_mut(id)
    }

    pub fn current_pane_mut(&mut self) -> Option<&mut Pane> {
        self.registry.get_mut(self.current)
    }

    /// 销毁全部面板（停止状态轮询）
    pub fn dispose_all(&mut self) {
        self.registry.dispose_all();
    }
}

impl Default for PaneNavigator {
    fn default() -> Self {
        Self::new()
    }
}
