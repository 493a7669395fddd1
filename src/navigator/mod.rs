//! 导航层
//!
//! 向导状态机：路由解析、显式步骤图和面板导航器

pub mod pane_navigator;
pub mod route;
pub mod step_graph;

pub use pane_navigator::{PaneNavigator, PaneRegistry, StepProgress};
pub use route::{route_for, Route};
pub use step_graph::StepGraph;
