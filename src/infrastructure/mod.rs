pub mod http_executor;
pub mod recording;
pub mod transport;

pub use http_executor::HttpExecutor;
pub use recording::{Method, RecordedCall, RecordingTransport, Reply};
pub use transport::{Transport, UploadFile};
