pub mod app_context;
pub mod wizard_flow;

pub use app_context::AppContext;
pub use wizard_flow::{WizardFlow, WizardReport};
