pub mod handlers;
pub mod routes;

use serde::{Deserialize, Serialize};

use crate::tts::{EngineType, SynthesisRequest};

#[derive(Debug, Deserialize)]
pub struct SynthesizeParams {
    pub text: Option<String>,
    #[serde(default)]
    pub engine_type: EngineType,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_speed")]
    pub speed: f64,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_speed() -> f64 {
    1.0
}

impl SynthesizeParams {
    pub fn into_request(self) -> Option<SynthesisRequest> {
        Some(SynthesisRequest {
            text: self.text?,
            engine: self.engine_type,
            language: self.language,
            speed: self.speed,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: String,
    pub status: String,
    pub version: String,
}
