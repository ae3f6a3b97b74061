use crate::embeddings::EmbeddingProvider;
use crate::error::{AskblogError, Result};
use crate::index::{IndexEntry, VectorIndex};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Google API keys carry this prefix; anything else is rejected before any
/// network call is made.
const API_KEY_PREFIX: &str = "AIza";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Marker line the model is instructed to finish its reply with
const SOURCES_MARKER: &str = "SOURCES:";

/// Answer-generation capability: prompt in, completion text out
#[async_trait]
pub trait AnswerModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// A composed answer plus the source URLs that contributed to it
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

/// Gemini answer-generation client.
///
/// Construction validates the credential shape and fails fast with a
/// descriptive error; no request leaves the process with a key that cannot
/// possibly be valid.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, temperature: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(AskblogError::Provider(
                "Google API key is not set".to_string(),
            ));
        }
        if !api_key.starts_with(API_KEY_PREFIX) {
            return Err(AskblogError::Provider(format!(
                "Invalid Google API key: expected it to start with '{}'",
                API_KEY_PREFIX
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(AskblogError::Transport)?;

        Ok(Self {
            client,
            api_key,
            model,
            temperature,
        })
    }
}

#[async_trait]
impl AnswerModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AskblogError::Provider(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(AskblogError::Provider(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AskblogError::Provider(format!("Failed to parse Gemini response: {}", e)))?;

        let text = result
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| {
                AskblogError::Provider("Gemini returned no candidates".to_string())
            })?;

        Ok(text)
    }

    // Note: exercising generate() against the live endpoint needs a real API
    // key; covered manually, not in unit tests.
}

/// Answer a question from the loaded index.
///
/// Embeds the query in the index's embedding space, retrieves the `top_k`
/// most similar chunks, and asks the model to answer using only that context
/// and to cite which source URLs it used. Cited URLs are filtered down to
/// the retrieved chunks' provenance, deduplicated, in retrieval order.
///
/// A provider failure here is fatal for this query only; the index stays
/// loaded and usable.
pub async fn answer(
    query: &str,
    index: &VectorIndex,
    embedder: &dyn EmbeddingProvider,
    model: &dyn AnswerModel,
    top_k: usize,
) -> Result<Answer> {
    let query_vec = embedder.embed_query(query).await?;
    let retrieved = index.search(&query_vec, top_k)?;

    if retrieved.is_empty() {
        return Ok(Answer {
            answer: "No relevant passages were found in the index.".to_string(),
            sources: Vec::new(),
        });
    }

    let prompt = build_prompt(query, &retrieved);
    log::debug!("Answering with {} retrieved chunks", retrieved.len());

    let reply = model.generate(&prompt).await?;

    let allowed: Vec<&str> = retrieved.iter().map(|(e, _)| e.source_url.as_str()).collect();
    Ok(parse_reply(&reply, &allowed))
}

fn build_prompt(query: &str, retrieved: &[(&IndexEntry, f32)]) -> String {
    let mut prompt = String::from(
        "You are answering a question about blog posts. Use ONLY the context \
         passages below. If the context does not contain the answer, say so.\n\n",
    );

    for (i, (entry, _)) in retrieved.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] Source: {}\n{}\n\n",
            i + 1,
            entry.source_url,
            entry.text
        ));
    }

    prompt.push_str(&format!(
        "Question: {}\n\nAnswer the question, then finish with a single line \
         of the form `{} <comma-separated URLs of the sources you used>`.",
        query, SOURCES_MARKER
    ));

    prompt
}

/// Split a model reply into answer text and cited sources.
///
/// Only URLs that actually appear among the retrieved chunks' provenance are
/// kept; the model cannot introduce sources the retrieval never surfaced.
fn parse_reply(reply: &str, allowed: &[&str]) -> Answer {
    let mut answer_lines: Vec<&str> = Vec::new();
    let mut cited: Vec<String> = Vec::new();

    for line in reply.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix(SOURCES_MARKER) {
            for url in rest.split(',') {
                let url = url.trim().trim_end_matches('.');
                if url.is_empty() {
                    continue;
                }
                if allowed.contains(&url) && !cited.iter().any(|c| c == url) {
                    cited.push(url.to_string());
                }
            }
        } else {
            answer_lines.push(line);
        }
    }

    Answer {
        answer: answer_lines.join("\n").trim().to_string(),
        sources: cited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::testing::MockEmbeddingProvider;
    use crate::ingest::Chunk;

    struct StaticModel(String);

    #[async_trait]
    impl AnswerModel for StaticModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl AnswerModel for FailingModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(AskblogError::Provider("model unavailable".to_string()))
        }
    }

    #[test]
    fn test_gemini_rejects_empty_key() {
        let err = GeminiClient::new(String::new(), "gemini-2.0-flash".to_string(), 0.5)
            .err()
            .unwrap();
        assert!(matches!(err, AskblogError::Provider(_)));
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn test_gemini_rejects_wrong_prefix_before_any_network_call() {
        let err = GeminiClient::new(
            "sk-not-a-google-key".to_string(),
            "gemini-2.0-flash".to_string(),
            0.5,
        )
        .err()
        .unwrap();
        assert!(matches!(err, AskblogError::Provider(_)));
        assert!(err.to_string().contains("AIza"));
    }

    #[test]
    fn test_gemini_accepts_well_formed_key() {
        assert!(GeminiClient::new(
            "AIzaSyTest1234".to_string(),
            "gemini-2.0-flash".to_string(),
            0.5
        )
        .is_ok());
    }

    #[test]
    fn test_parse_reply_filters_to_allowed_sources() {
        let reply = "Jetpack Compose is a UI toolkit.\n\
                     SOURCES: https://blog/compose, https://evil.example.com/injected";
        let answer = parse_reply(reply, &["https://blog/compose", "https://blog/kotlin"]);
        assert_eq!(answer.answer, "Jetpack Compose is a UI toolkit.");
        assert_eq!(answer.sources, vec!["https://blog/compose".to_string()]);
    }

    #[test]
    fn test_parse_reply_dedupes_and_handles_missing_marker() {
        let reply = "Answer text only.";
        let answer = parse_reply(reply, &["https://blog/a"]);
        assert_eq!(answer.answer, "Answer text only.");
        assert!(answer.sources.is_empty());

        let reply = "A.\nSOURCES: https://blog/a, https://blog/a";
        let answer = parse_reply(reply, &["https://blog/a"]);
        assert_eq!(answer.sources, vec!["https://blog/a".to_string()]);
    }

    async fn fixture_index(provider: &MockEmbeddingProvider) -> VectorIndex {
        let chunks = vec![
            Chunk {
                text: "wear os news".to_string(),
                source_url: "https://example.com/a".to_string(),
            },
            Chunk {
                text: "compose news".to_string(),
                source_url: "https://example.com/b".to_string(),
            },
            Chunk {
                text: "kotlin news".to_string(),
                source_url: "https://example.com/c".to_string(),
            },
        ];
        VectorIndex::build(chunks, provider, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_answer_sources_come_from_retrieved_provenance() {
        let provider = MockEmbeddingProvider::new(3)
            .with_response("wear os news", vec![1.0, 0.0, 0.0])
            .with_response("compose news", vec![0.0, 1.0, 0.0])
            .with_response("kotlin news", vec![0.0, 0.0, 1.0])
            .with_response("what's new in wear os?", vec![1.0, 0.1, 0.0]);
        let index = fixture_index(&provider).await;

        // The model cites the matching source plus one it made up
        let model = StaticModel(
            "Wear OS got a new release.\n\
             SOURCES: https://example.com/a, https://not-retrieved.example.com"
                .to_string(),
        );

        let result = answer("what's new in wear os?", &index, &provider, &model, 2)
            .await
            .unwrap();

        assert_eq!(result.answer, "Wear OS got a new release.");
        assert_eq!(result.sources, vec!["https://example.com/a".to_string()]);
    }

    #[tokio::test]
    async fn test_answer_provider_failure_is_per_query() {
        let provider = MockEmbeddingProvider::new(3);
        let index = fixture_index(&provider).await;

        let err = answer("q", &index, &provider, &FailingModel, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, AskblogError::Provider(_)));

        // The index remains usable for the next query
        let model = StaticModel("Fine.\nSOURCES:".to_string());
        let ok = answer("q", &index, &provider, &model, 2).await.unwrap();
        assert_eq!(ok.answer, "Fine.");
    }

    #[tokio::test]
    async fn test_prompt_contains_context_and_instructions() {
        let provider = MockEmbeddingProvider::new(3);
        let index = fixture_index(&provider).await;
        let q = provider.embed_query("anything").await.unwrap();
        let retrieved = index.search(&q, 2).unwrap();

        let prompt = build_prompt("anything", &retrieved);
        assert!(prompt.contains("Source: "));
        assert!(prompt.contains("Question: anything"));
        assert!(prompt.contains(SOURCES_MARKER));
    }
}
