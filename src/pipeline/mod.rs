pub mod orchestrator;
pub mod types;


pub use orchestrator::RequestOrchestrator;
pub use types::{GenerateResponse, PipelineOutcome, PipelineState};
