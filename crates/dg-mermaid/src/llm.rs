//! LLM-backed Mermaid generation.
//!
//! Talks to an OpenAI-style chat-completions endpoint. The prompt carries
//! the diagram kind, the user content verbatim, extracted entities, the
//! kind's syntax rules, and three worked examples. The response is vetted
//! with [`validate_dsl`] before it is accepted; any failure is reported as
//! a retriable [`GenerateError::Llm`] so the caller falls through to the
//! deterministic builder.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use dg_core::GenerateError;

use crate::extract::Extraction;
use crate::kind::{MermaidKind, validate_dsl};

/// Per-call timeout for the LLM endpoint.
const LLM_TIMEOUT: Duration = Duration::from_secs(20);

/// Configuration for the LLM path.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Chat-completions endpoint URL.
    pub endpoint: String,
    /// Bearer token, if the endpoint needs one.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Client for the LLM Mermaid path.
pub struct LlmClient {
    config: LlmConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl LlmClient {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Generate DSL for a kind, validating the result.
    ///
    /// # Errors
    ///
    /// Every failure mode: timeout, non-200, malformed body, DSL that does
    /// not validate: is a retriable [`GenerateError::Llm`].
    pub async fn generate(
        &self,
        kind: MermaidKind,
        content: &str,
        extraction: &Extraction,
    ) -> Result<String, GenerateError> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": system_prompt(kind) },
                { "role": "user", "content": user_prompt(kind, content, extraction) },
            ],
        });

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .timeout(LLM_TIMEOUT)
            .json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenerateError::Llm(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(GenerateError::Llm(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::Llm(format!("malformed response: {e}")))?;
        let dsl = parsed
            .choices
            .first()
            .map(|c| strip_code_fence(&c.message.content))
            .ok_or_else(|| GenerateError::Llm("empty response".to_owned()))?;

        if validate_dsl(kind, &dsl) {
            Ok(dsl)
        } else {
            Err(GenerateError::Llm(format!(
                "candidate failed validation for {}",
                kind.declaration()
            )))
        }
    }
}

/// Remove a wrapping ```` ```mermaid ```` fence if present.
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed.to_owned();
    };
    let inner = inner.strip_prefix("mermaid").unwrap_or(inner);
    inner.trim_end_matches('`').trim().to_owned()
}

fn system_prompt(kind: MermaidKind) -> String {
    format!(
        "You write Mermaid diagrams. Respond with only the DSL text, no \
         prose and no code fences. The first line must be `{}`.",
        kind.declaration()
    )
}

fn user_prompt(kind: MermaidKind, content: &str, extraction: &Extraction) -> String {
    let mut prompt = format!(
        "Diagram kind: {}\n\nDescription:\n{content}\n",
        kind.declaration()
    );

    if !extraction.entities.is_empty() {
        prompt.push_str("\nExtracted entities, in order:\n");
        for entity in &extraction.entities {
            prompt.push_str(&format!("- {entity}\n"));
        }
    }

    prompt.push_str("\nSyntax rules:\n");
    prompt.push_str(syntax_rules(kind));
    prompt.push_str("\nWorked examples:\n");
    prompt.push_str(worked_examples(kind));
    prompt
}

fn syntax_rules(kind: MermaidKind) -> &'static str {
    match kind {
        MermaidKind::Flowchart => {
            "- Open with `flowchart TD`\n\
             - Nodes: `id[\"Label\"]`, edges: `a --> b`\n\
             - Quote labels containing spaces or punctuation\n"
        }
        MermaidKind::Sequence => {
            "- Open with `sequenceDiagram`\n\
             - Declare `participant X as Label` before use\n\
             - Messages: `A->>B: text`\n"
        }
        MermaidKind::Gantt => {
            "- Open with `gantt`, then `dateFormat YYYY-MM-DD`\n\
             - Group tasks under `section Name`\n\
             - Tasks: `Label :id, start-or-after, duration`\n"
        }
        MermaidKind::State => {
            "- Open with `stateDiagram-v2`\n\
             - Transitions: `A --> B`; `[*]` is the initial and final state\n"
        }
        MermaidKind::Journey => {
            "- Open with `journey`, then `title` and `section`\n\
             - Steps: `Label: score: Actor` with score 1-5\n"
        }
        MermaidKind::MindMap => {
            "- Open with `mindmap`\n\
             - Root: `root((Topic))`; children are indented lines\n"
        }
    }
}

fn worked_examples(kind: MermaidKind) -> &'static str {
    match kind {
        MermaidKind::Flowchart => {
            "flowchart TD\n    A[\"Order placed\"] --> B[\"Payment\"]\n    B --> C[\"Shipped\"]\n\n\
             flowchart TD\n    In[\"Input\"] --> Val[\"Validate\"]\n    Val --> Out[\"Output\"]\n\n\
             flowchart TD\n    Draft[\"Draft\"] --> Review[\"Review\"]\n    Review --> Done[\"Published\"]\n"
        }
        MermaidKind::Sequence => {
            "sequenceDiagram\n    participant C as Client\n    participant S as Server\n    C->>S: request\n    S->>C: response\n\n\
             sequenceDiagram\n    participant U as User\n    participant A as App\n    U->>A: tap\n    A->>U: feedback\n\n\
             sequenceDiagram\n    participant P as Producer\n    participant Q as Queue\n    P->>Q: publish\n"
        }
        MermaidKind::Gantt => {
            "gantt\n    title Launch\n    dateFormat YYYY-MM-DD\n    section Plan\n    Design :d, 2024-01-01, 5d\n    Build :b, after d, 10d\n\n\
             gantt\n    title Sprint\n    dateFormat YYYY-MM-DD\n    section Work\n    Spec :s, 2024-02-01, 3d\n\n\
             gantt\n    title Rollout\n    dateFormat YYYY-MM-DD\n    section Phases\n    Pilot :p, 2024-03-01, 7d\n    GA :g, after p, 7d\n"
        }
        MermaidKind::State => {
            "stateDiagram-v2\n    [*] --> Idle\n    Idle --> Active\n    Active --> [*]\n\n\
             stateDiagram-v2\n    [*] --> Draft\n    Draft --> Review\n    Review --> Draft\n    Review --> [*]\n\n\
             stateDiagram-v2\n    [*] --> Queued\n    Queued --> Running\n    Running --> Failed\n    Running --> [*]\n"
        }
        MermaidKind::Journey => {
            "journey\n    title Checkout\n    section Shop\n      Browse: 4: User\n      Pay: 2: User\n\n\
             journey\n    title Onboarding\n    section First run\n      Sign up: 3: User\n      Tutorial: 5: User\n\n\
             journey\n    title Support\n    section Ticket\n      File: 2: User\n      Resolve: 4: Agent\n"
        }
        MermaidKind::MindMap => {
            "mindmap\n  root((Product))\n    Features\n    Pricing\n\n\
             mindmap\n  root((Strategy))\n    Growth\n    Retention\n\n\
             mindmap\n  root((Team))\n    Hiring\n    Culture\n"
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::extract::extract;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(
            strip_code_fence("```mermaid\nflowchart TD\n    A --> B\n```"),
            "flowchart TD\n    A --> B"
        );
        assert_eq!(strip_code_fence("flowchart TD"), "flowchart TD");
        assert_eq!(
            strip_code_fence("```\ngantt\n```"),
            "gantt"
        );
    }

    #[test]
    fn test_user_prompt_carries_content_verbatim() {
        let content = "Start → Validate → End";
        let prompt = user_prompt(MermaidKind::Flowchart, content, &extract(content));
        assert!(prompt.contains(content));
        assert!(prompt.contains("- Start\n"));
        assert!(prompt.contains("- Validate\n"));
        assert!(prompt.contains("Worked examples"));
    }

    #[test]
    fn test_system_prompt_names_declaration() {
        assert!(system_prompt(MermaidKind::Gantt).contains("`gantt`"));
        assert!(system_prompt(MermaidKind::State).contains("`stateDiagram-v2`"));
    }

    #[test]
    fn test_worked_examples_validate() {
        for kind in [
            MermaidKind::Flowchart,
            MermaidKind::Sequence,
            MermaidKind::Gantt,
            MermaidKind::State,
            MermaidKind::Journey,
            MermaidKind::MindMap,
        ] {
            for example in worked_examples(kind).split("\n\n") {
                assert!(
                    validate_dsl(kind, example),
                    "example for {kind:?} failed validation:\n{example}"
                );
            }
        }
    }
}
