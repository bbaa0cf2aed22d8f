//! Wire and cache types for resume scoring.

use serde::{Deserialize, Serialize};

use crate::llm_client::prompts::UNREADABLE_PLACEHOLDER;

fn placeholder() -> String {
    UNREADABLE_PLACEHOLDER.to_string()
}

/// Raw JSON returned by the AI scorer, before range checks.
#[derive(Debug, Clone, Deserialize)]
pub struct ScorerOutput {
    pub score: i64,
    pub reason: String,
    #[serde(default = "placeholder")]
    pub email: String,
    #[serde(default = "placeholder")]
    pub name: String,
}

/// A validated score for one resume. This is exactly what the cache stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredResume {
    pub score: u8,
    pub reason: String,
    pub email: String,
    pub name: String,
}

impl ScoredResume {
    pub const MAX_SCORE: i64 = 100;
}

impl TryFrom<ScorerOutput> for ScoredResume {
    type Error = String;

    fn try_from(output: ScorerOutput) -> Result<Self, Self::Error> {
        if !(0..=Self::MAX_SCORE).contains(&output.score) {
            return Err(format!("score {} is outside 0..=100", output.score));
        }
        if output.reason.trim().is_empty() {
            return Err("reason is empty".to_string());
        }

        Ok(ScoredResume {
            score: output.score as u8,
            reason: output.reason.trim().to_string(),
            email: or_placeholder(output.email),
            name: or_placeholder(output.name),
        })
    }
}

fn or_placeholder(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        placeholder()
    } else {
        trimmed.to_string()
    }
}

/// Per-resume result returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub score: u8,
    pub reason: String,
    pub email: String,
    pub name: String,
    pub is_cache_hit: bool,
}

impl ScoreResult {
    pub fn new(scored: ScoredResume, is_cache_hit: bool) -> Self {
        let ScoredResume {
            score,
            reason,
            email,
            name,
        } = scored;
        Self {
            score,
            reason,
            email,
            name,
            is_cache_hit,
        }
    }
}

/// POST body: one inner array of base64 page images per resume.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub img_urls: Vec<Vec<String>>,
    pub requirements: String,
}

impl BatchRequest {
    pub fn total_pages(&self) -> usize {
        self.img_urls.iter().map(Vec::len).sum()
    }
}

/// Error marker placed in a failed resume's slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotError {
    pub code: &'static str,
    pub message: String,
}

/// One position of the batch response, aligned with the submitted resumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScoreSlot {
    Scored(ScoreResult),
    Failed { error: SlotError },
}

impl ScoreSlot {
    pub fn is_scored(&self) -> bool {
        matches!(self, ScoreSlot::Scored(_))
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub payload: Vec<ScoreSlot>,
}
