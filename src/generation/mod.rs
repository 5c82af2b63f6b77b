// Answer generation from retrieved context
// The language model itself is an opaque prompt-to-text collaborator


use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::retrieval::RetrievedChunk;
use crate::{RagError, Result};

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Turns a prompt into text
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// A structured business answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub summary: String,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Outcome of [`generate_structured`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StructuredOutcome {
    Parsed(StructuredAnswer),
    /// The model did not produce parseable JSON; a plain answer was generated instead
    Fallback { raw_response: String, error: String },
}

fn context_of(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.metadata.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[inline]
pub fn build_prompt(query: &str, chunks: &[RetrievedChunk]) -> String {
    format!(
        "You are a business intelligence assistant.\n\
         Given the following context extracted from business documents:\n\
         {}\n\n\
         Answer the following query with actionable insights:\n\
         {}\n\n\
         Answer:",
        context_of(chunks),
        query
    )
}

#[inline]
pub fn build_structured_prompt(query: &str, chunks: &[RetrievedChunk]) -> String {
    let sources: Vec<&str> = chunks.iter().map(|c| c.metadata.file_path.as_str()).collect();
    format!(
        "You are a business intelligence assistant.\n\
         Given the following context extracted from business documents:\n\
         {}\n\n\
         Answer the following query: {}\n\n\
         Respond only with a JSON object with the keys \"summary\" (string), \
         \"key_insights\" (list of strings), \"recommendations\" (list of strings) \
         and \"sources\" (list drawn from: {}).\n\
         JSON:",
        context_of(chunks),
        query,
        sources.join(", ")
    )
}

/// Strip an echoed prompt from the start of generated text
#[inline]
pub fn extract_response(generated: &str, prompt: &str) -> String {
    generated
        .strip_prefix(prompt)
        .unwrap_or(generated)
        .trim()
        .to_string()
}

/// Drop a trailing incomplete sentence. Text without any complete sentence is kept as is.
#[inline]
pub fn clean_response(response: &str) -> String {
    let trimmed = response.trim();
    if trimmed.ends_with(SENTENCE_TERMINATORS) {
        return trimmed.to_string();
    }

    trimmed
        .rfind(SENTENCE_TERMINATORS)
        .and_then(|end| trimmed.get(..=end))
        .unwrap_or(trimmed)
        .to_string()
}

/// Parse the first `{` .. last `}` span of `text` as a [`StructuredAnswer`]
#[inline]
pub fn parse_structured(text: &str) -> Result<StructuredAnswer> {
    let json = text
        .find('{')
        .zip(text.rfind('}'))
        .filter(|(start, end)| start < end)
        .and_then(|(start, end)| text.get(start..=end))
        .ok_or_else(|| RagError::MalformedUpstream("no JSON object in response".to_string()))?;

    serde_json::from_str(json).map_err(|e| RagError::MalformedUpstream(e.to_string()))
}

/// Generate a plain-text answer grounded in `chunks`. Generator failures propagate.
#[inline]
pub fn generate_response(
    generator: &dyn Generator,
    query: &str,
    chunks: &[RetrievedChunk],
) -> Result<String> {
    info!("Generating response for query: {}", query);

    let prompt = build_prompt(query, chunks);
    let generated = generator.generate(&prompt)?;
    let answer = clean_response(&extract_response(&generated, &prompt));

    debug!("Generated response: {}", answer);
    Ok(answer)
}

/// Generate a [`StructuredAnswer`], falling back to a plain answer when the model's
/// output is not valid JSON.
#[inline]
pub fn generate_structured(
    generator: &dyn Generator,
    query: &str,
    chunks: &[RetrievedChunk],
) -> Result<StructuredOutcome> {
    info!("Generating structured response for query: {}", query);

    let prompt = build_structured_prompt(query, chunks);
    let generated = generator.generate(&prompt)?;

    match parse_structured(&extract_response(&generated, &prompt)) {
        Ok(answer) => Ok(StructuredOutcome::Parsed(answer)),
        Err(err) => {
            warn!("Structured response was not valid JSON, falling back: {}", err);
            let raw_response = generate_response(generator, query, chunks)?;
            Ok(StructuredOutcome::Fallback {
                raw_response,
                error: err.to_string(),
            })
        }
    }
}
