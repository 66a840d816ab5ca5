pub mod config;
pub mod logging;

pub mod engine;
pub mod request;
pub mod response;
pub mod scheduler;
pub mod store;

pub use engine::{CurlEngine, SlotId, TransferEngine, TransferInfo};
pub use request::{Callback, Method, Payload, Request, TransferOptions};
pub use response::Response;
pub use scheduler::{ExecuteError, QueueHandle, RunSummary, Scheduler, StopHandle};
