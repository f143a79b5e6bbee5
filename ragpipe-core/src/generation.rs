//! Answer generation: the generation-client trait and the grounded-answer
//! synthesis component.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::Result;

/// A client that produces natural-language text from a prompt.
///
/// Implementations wrap specific generative backends behind a unified async
/// interface.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a completion for the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Synthesizes a grounded answer from retrieved context.
///
/// Builds a fixed instruction template around the context and question and
/// asks the [`GenerationClient`] to answer strictly from the given context.
/// Provider failures do not propagate: [`generate`](AnswerGenerator::generate)
/// returns a diagnostic placeholder string instead, so the pipeline always
/// completes with a full result. Retrieval and source attribution remain
/// valid even when answer synthesis fails, and the failure is surfaced to
/// the caller through the answer text itself.
pub struct AnswerGenerator {
    client: Arc<dyn GenerationClient>,
}

impl AnswerGenerator {
    /// Create a new `AnswerGenerator` backed by the given client.
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    /// Build the instruction prompt embedding the context and question.
    pub fn build_prompt(context: &str, query: &str) -> String {
        format!(
            "You are a helpful AI assistant that answers questions based on \
             the provided context.\n\
             If the information isn't in the context, say you don't have that \
             information.\n\
             Keep your answers concise and to the point.\n\n\
             Context:\n{context}\n\n\
             Question: {query}"
        )
    }

    /// Generate an answer to `query` grounded in `context`.
    ///
    /// Never fails: on provider error a placeholder answer describing the
    /// failure is returned instead.
    pub async fn generate(&self, query: &str, context: &str) -> String {
        let prompt = Self::build_prompt(context, query);
        debug!(prompt_len = prompt.len(), "generating answer");

        match self.client.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "answer generation failed, returning placeholder");
                format!("Error generating answer: {e}")
            }
        }
    }
}
