use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use super::{languages, LanguageEngine};
use crate::error::AppError;

/// Google rejects longer `q` values.
pub const MAX_CHUNK_CHARS: usize = 100;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

lazy_static! {
    static ref SENTENCE_END: Regex = Regex::new(r"[.!?;:,]+(\s+|$)|[。！？、\n]+").unwrap();
}

/// Online engine backed by Google Translate TTS.
pub struct GoogleTts {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTts {
    pub fn new(tld: &str, timeout: Duration) -> Result<Self, AppError> {
        Self::with_endpoint(
            format!("https://translate.google.{}/translate_tts", tld),
            timeout,
        )
    }

    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        language: &str,
        idx: usize,
        total: usize,
    ) -> Result<Vec<u8>, AppError> {
        let query = [
            ("ie", "UTF-8".to_string()),
            ("q", chunk.to_string()),
            ("tl", language.to_string()),
            ("client", "tw-ob".to_string()),
            ("ttsspeed", "1".to_string()),
            ("total", total.to_string()),
            ("idx", idx.to_string()),
            ("textlen", chunk.chars().count().to_string()),
        ];

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl LanguageEngine for GoogleTts {
    fn languages(&self) -> BTreeMap<String, String> {
        languages::google_languages()
    }

    async fn synthesize(&self, text: &str, language: &str, output: &Path) -> Result<(), AppError> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(AppError::TtsError("No text to speak".into()));
        }

        let total = chunks.len();
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            tracing::debug!(idx, total, chars = chunk.chars().count(), "Fetching speech chunk");
            audio.extend(self.fetch_chunk(chunk, language, idx, total).await?);
        }

        tokio::fs::write(output, audio).await?;
        Ok(())
    }
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Whole sentences are packed together when they fit, long sentences are
/// broken on whitespace, and words longer than the limit are cut.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if char_len(text) <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences(text) {
        if char_len(sentence) <= max_chars {
            push_piece(&mut chunks, &mut current, sentence, max_chars);
            continue;
        }

        for word in sentence.split_whitespace() {
            for piece in hard_cut(word, max_chars) {
                push_piece(&mut chunks, &mut current, &piece, max_chars);
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut last_end = 0;

    for mat in SENTENCE_END.find_iter(text) {
        out.push(text[last_end..mat.end()].trim());
        last_end = mat.end();
    }
    if last_end < text.len() {
        out.push(text[last_end..].trim());
    }

    out.retain(|s| !s.is_empty());
    out
}

fn push_piece(chunks: &mut Vec<String>, current: &mut String, piece: &str, max_chars: usize) {
    if current.is_empty() {
        current.push_str(piece);
    } else if char_len(current) + 1 + char_len(piece) <= max_chars {
        current.push(' ');
        current.push_str(piece);
    } else {
        chunks.push(std::mem::take(current));
        current.push_str(piece);
    }
}

fn hard_cut(word: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
