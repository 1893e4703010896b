pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod policy;
pub mod protocol;
pub mod rank;
pub mod server;
pub mod summarize;
pub mod validate;

#[cfg(test)]
mod test_support;

pub use client::{HealthCheck, ServiceClient};
pub use config::AppConfig;
pub use engine::{EngineState, InferenceEngine, ModelLoader};
pub use error::{Error, ErrorKind, Result};
pub use policy::ClampPolicy;
pub use rank::{RankRequest, RankResponse, RankResult, RankService};
pub use summarize::{SummarizeRequest, SummarizeResponse, SummarizeService};
