pub mod batch;
pub mod chain;
pub mod loaders;
pub mod step;
pub mod submission;

pub use batch::{flatten_task_listing, Batch, BatchHandle, BatchStatus, Document, Task};
pub use chain::{ChainForest, ParentRef, TaskChainNode, TaskState};
pub use loaders::{load_all_submissions, load_submission};
pub use step::{PaneId, WizardStep};
pub use submission::{NlbinParams, OcrSelection, Script, Submission};
