pub mod task_graph;

pub use task_graph::{
    summarize, BatchState, DocumentResult, FailureNote, TaskGraphSummary, TotalStrategy,
};
