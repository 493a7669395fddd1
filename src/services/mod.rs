pub mod batch_service;
pub mod failure_writer;
pub mod pipeline_builder;
pub mod result_downloader;

pub use batch_service::BatchService;
pub use failure_writer::FailureWriter;
pub use pipeline_builder::{build_pipeline, validate_pipeline};
pub use result_downloader::ResultDownloader;
