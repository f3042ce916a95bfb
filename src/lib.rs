pub mod assembler;
pub mod bria;
pub mod config;
pub mod error;
pub mod geometry;
pub mod logger;
pub mod models;
pub mod resolver;
pub mod session;

pub use assembler::{Operation, RequestAssembler};
pub use bria::{DispatchOutcome, Dispatcher, HttpDispatcher, StudioClient};
pub use config::{PollConfig, StudioConfig};
pub use error::{Result, StudioError};
pub use models::*;
pub use resolver::{
    HttpProbe, JobPoller, PollOutcome, ProbeStatus, ReadinessProbe, ResultNormalizer,
};
pub use session::Session;
