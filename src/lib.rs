mod error;
mod ort_service;
mod routes;
mod server;
mod state;

pub mod config;
pub mod decision;
pub mod decode;
pub mod model_service;
pub mod normalize;
pub mod pipeline;
pub mod storage;
pub mod telemetry;

pub use error::ApiError;
pub use ort_service::{ModelLoadError, OrtModelService};
pub use routes::{AnalyzeRequest, ServiceInfo};
pub use server::{build_router, start_server};
pub use state::ServiceContext;
