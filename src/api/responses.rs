use serde::{Deserialize, Serialize};

/// Body of `GET /`
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    /// Greeting text
    pub message: String,
}

/// Body of `GET /health_check`
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `"OK"` while the process is serving
    pub status: String,
}

impl MessageResponse {
    pub(crate) fn hello() -> Self {
        Self {
            message: "Hello World".to_string(),
        }
    }
}

impl HealthResponse {
    pub(crate) fn ok() -> Self {
        Self {
            status: "OK".to_string(),
        }
    }
}
