//! Resume Scorer: pluggable, trait-based backend that turns requirements plus
//! page images into a `ScoredResume`.
//!
//! Default: `GeminiScorer` (vision model via `LlmClient`).
//!
//! The gateway holds an `Arc<dyn ResumeScorer>`, so tests swap in a stub.

use async_trait::async_trait;

use crate::llm_client::prompts::RESUME_SCORING_SYSTEM;
use crate::llm_client::{LlmClient, LlmError, Part};
use crate::scoring::models::{ScoredResume, ScorerOutput};

/// Implement this to swap the AI backend without touching the gateway or handlers.
#[async_trait]
pub trait ResumeScorer: Send + Sync {
    async fn score(&self, requirements: &str, pages: &[String])
        -> Result<ScoredResume, LlmError>;

    /// Backend label for logs.
    fn backend(&self) -> &'static str;
}

/// Scores resumes with the Gemini vision model.
pub struct GeminiScorer(pub LlmClient);

#[async_trait]
impl ResumeScorer for GeminiScorer {
    async fn score(
        &self,
        requirements: &str,
        pages: &[String],
    ) -> Result<ScoredResume, LlmError> {
        let parts = std::iter::once(Part::text(requirements))
            .chain(pages.iter().map(|page| Part::png(page)))
            .collect();

        let output: ScorerOutput = self.0.generate_json(RESUME_SCORING_SYSTEM, parts).await?;

        ScoredResume::try_from(output).map_err(LlmError::InvalidOutput)
    }

    fn backend(&self) -> &'static str {
        "gemini"
    }
}
