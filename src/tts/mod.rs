pub mod artifact;
pub mod espeak;
pub mod gtts;
pub mod languages;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use artifact::{wav_duration_seconds, AudioArtifact, AudioFormat};
pub use espeak::EspeakEngine;
pub use gtts::GoogleTts;

pub const MIN_SPEED: f64 = 0.5;
pub const MAX_SPEED: f64 = 2.0;

/// Engine whose voice is selected by language code.
#[async_trait]
pub trait LanguageEngine: Send + Sync {
    fn languages(&self) -> BTreeMap<String, String>;

    /// Write speech for `text` to `output`.
    async fn synthesize(&self, text: &str, language: &str, output: &Path) -> Result<(), AppError>;
}

/// Engine whose voice is selected by index into its voice list.
#[async_trait]
pub trait VoiceEngine: Send + Sync {
    /// Words per minute at speed 1.0.
    fn base_rate(&self) -> u32;

    async fn voices(&self) -> Result<Vec<Voice>, AppError>;

    /// Write speech for `text` to `output`.
    async fn synthesize(
        &self,
        text: &str,
        voice: &Voice,
        rate: u32,
        output: &Path,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum EngineType {
    #[default]
    #[serde(rename = "gtts")]
    Gtts,
    #[serde(rename = "pyttsx3", alias = "espeak")]
    Pyttsx3,
}

impl EngineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineType::Gtts => "gtts",
            EngineType::Pyttsx3 => "pyttsx3",
        }
    }

    pub fn format(&self) -> AudioFormat {
        match self {
            EngineType::Gtts => AudioFormat::Mp3,
            EngineType::Pyttsx3 => AudioFormat::Wav,
        }
    }
}

impl std::fmt::Display for EngineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub name: String,
    /// Token the synthesizer selects the voice by.
    pub identifier: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceInfo {
    pub id: usize,
    pub name: String,
    pub languages: Vec<String>,
}

impl VoiceInfo {
    fn from_voice(id: usize, voice: &Voice) -> Self {
        Self {
            id,
            name: voice.name.clone(),
            languages: vec![voice
                .language
                .clone()
                .unwrap_or_else(|| "en-US".to_string())],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub engine: EngineType,
    /// Language code for gtts, voice index for pyttsx3.
    pub language: String,
    pub speed: f64,
}

#[derive(Debug)]
pub struct SynthesizedAudio {
    pub audio: Vec<u8>,
    pub filename: String,
    pub format: AudioFormat,
    pub duration_seconds: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct Catalog {
    pub gtts_languages: BTreeMap<String, String>,
    pub pyttsx3_voices: Vec<VoiceInfo>,
}

pub struct TtsService {
    language_engine: Arc<dyn LanguageEngine>,
    voice_engine: Arc<dyn VoiceEngine>,
    temp_dir: PathBuf,
}

impl TtsService {
    pub fn new(language_engine: Arc<dyn LanguageEngine>, voice_engine: Arc<dyn VoiceEngine>) -> Self {
        Self::with_temp_dir(language_engine, voice_engine, std::env::temp_dir())
    }

    pub fn with_temp_dir(
        language_engine: Arc<dyn LanguageEngine>,
        voice_engine: Arc<dyn VoiceEngine>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            language_engine,
            voice_engine,
            temp_dir,
        }
    }

    pub async fn catalog(&self) -> Catalog {
        let voices = match self.voice_engine.voices().await {
            Ok(voices) => voices,
            Err(e) => {
                tracing::warn!("Could not list voices, returning none: {}", e);
                Vec::new()
            }
        };

        Catalog {
            gtts_languages: self.language_engine.languages(),
            pyttsx3_voices: voices
                .iter()
                .enumerate()
                .map(|(id, v)| VoiceInfo::from_voice(id, v))
                .collect(),
        }
    }

    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, AppError> {
        validate(request)?;

        tracing::info!(
            engine = %request.engine,
            language = %request.language,
            speed = request.speed,
            text_length = request.text.len(),
            "TTS synthesis request"
        );

        match request.engine {
            EngineType::Gtts => self.synthesize_language(request).await,
            EngineType::Pyttsx3 => self.synthesize_voice(request).await,
        }
    }

    async fn synthesize_language(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, AppError> {
        let languages = self.language_engine.languages();
        if !languages.contains_key(&request.language) {
            let codes: Vec<&str> = languages.keys().map(String::as_str).collect();
            return Err(AppError::InvalidLanguage(format!(
                "Invalid language code for gTTS. Available languages: {}",
                codes.join(", ")
            )));
        }

        let artifact = AudioArtifact::create(&self.temp_dir, request.engine.format())?;
        self.language_engine
            .synthesize(&request.text, &request.language, artifact.path())
            .await?;

        finish(artifact, request.engine).await
    }

    async fn synthesize_voice(&self, request: &SynthesisRequest) -> Result<SynthesizedAudio, AppError> {
        let voices = self.voice_engine.voices().await?;
        let voice = select_voice(&voices, &request.language)?;
        let rate = scaled_rate(self.voice_engine.base_rate(), request.speed);

        let artifact = AudioArtifact::create(&self.temp_dir, request.engine.format())?;
        self.voice_engine
            .synthesize(&request.text, voice, rate, artifact.path())
            .await?;

        finish(artifact, request.engine).await
    }
}

fn validate(request: &SynthesisRequest) -> Result<(), AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("Text cannot be empty".into()));
    }

    if !(MIN_SPEED..=MAX_SPEED).contains(&request.speed) {
        return Err(AppError::Validation(format!(
            "Speed must be between {} and {}",
            MIN_SPEED, MAX_SPEED
        )));
    }

    Ok(())
}

fn select_voice<'a>(voices: &'a [Voice], token: &str) -> Result<&'a Voice, AppError> {
    let upper = voices.len() as i64 - 1;
    let token = token.trim();

    match token.parse::<i64>() {
        Ok(index) if (0..=upper).contains(&index) => Ok(&voices[index as usize]),
        Ok(_) => Err(voice_out_of_range(voices)),
        // Integers too wide for i64 are still integers, just out of range.
        Err(_) if is_integer(token) => Err(voice_out_of_range(voices)),
        Err(_) => Err(AppError::InvalidVoice(format!(
            "For pyttsx3 engine, language parameter must be a valid voice ID (integer between 0 and {})",
            upper
        ))),
    }
}

fn is_integer(token: &str) -> bool {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn voice_out_of_range(voices: &[Voice]) -> AppError {
    let listing: Vec<String> = voices
        .iter()
        .enumerate()
        .map(|(i, v)| format!("'{} (ID: {})'", v.name, i))
        .collect();
    AppError::InvalidVoice(format!(
        "Invalid voice ID. Must be between 0 and {}. Available voices: [{}]",
        voices.len() as i64 - 1,
        listing.join(", ")
    ))
}

fn scaled_rate(base_rate: u32, speed: f64) -> u32 {
    (base_rate as f64 * speed).floor() as u32
}

async fn finish(artifact: AudioArtifact, engine: EngineType) -> Result<SynthesizedAudio, AppError> {
    let audio = artifact.read().await?;
    if audio.is_empty() {
        return Err(AppError::TtsError(format!("{} produced no audio", engine)));
    }

    let duration_seconds = match artifact.format() {
        AudioFormat::Wav => wav_duration_seconds(&audio),
        AudioFormat::Mp3 => None,
    };

    tracing::info!(
        engine = %engine,
        filename = artifact.filename(),
        bytes = audio.len(),
        "TTS synthesis complete"
    );

    Ok(SynthesizedAudio {
        audio,
        filename: artifact.filename().to_string(),
        format: artifact.format(),
        duration_seconds,
    })
}
