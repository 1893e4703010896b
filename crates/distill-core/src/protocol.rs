//! Wire types shared by the HTTP services and their client.
//!
//! Request/response bodies for ranking and summarization live next to their
//! orchestrators in [`crate::rank`] and [`crate::summarize`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::EngineState;

// Route paths
pub mod routes {
    pub const HEALTH: &str = "/health";
    pub const RANK: &str = "/rank";
    pub const SUMMARIZE: &str = "/summarize";
}

pub const NOTE_LAZY_LOAD: &str = "Model will load on first request";

/// Body of every non-2xx JSON response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `GET /health` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model: String,
    pub port: u16,
    pub model_loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_secs: Option<f64>,
}

impl HealthStatus {
    pub fn new(model: &str, port: u16, state: EngineState) -> Self {
        let (note, loaded_at, load_secs) = match state {
            EngineState::Unloaded => (Some(NOTE_LAZY_LOAD.to_string()), None, None),
            EngineState::Loaded {
                loaded_at,
                load_duration,
            } => (None, Some(loaded_at), Some(load_duration.as_secs_f64())),
        };
        Self {
            status: "ok".to_string(),
            model: model.to_string(),
            port,
            model_loaded: state.is_loaded(),
            note,
            loaded_at,
            load_secs,
        }
    }
}
