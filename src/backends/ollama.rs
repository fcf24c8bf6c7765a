//! Ollama-backed implementation of the four stage backends.
//!
//! Talks to a local Ollama server over its chat API. One client serves
//! all four roles; each role carries its own model settings (temperature,
//! token budget) from configuration.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ModelSettings, OllamaConfig};
use crate::domain::{Fix, Research, ReviewVerdict, Vulnerability};

use super::parse::{self, ParseOutcome};
use super::{BackendError, Fixer, Researcher, Reviewer, Scanner};

const SCANNER_SYSTEM: &str = "You are an expert security vulnerability scanner.";
const RESEARCHER_SYSTEM: &str = "You are an expert cybersecurity researcher.";
const FIXER_SYSTEM: &str = "You are an expert secure code developer.";
const REVIEWER_SYSTEM: &str = "You are a senior security code reviewer.";

/// Ollama chat backend for all four pipeline roles
pub struct OllamaBackend {
    client: reqwest::Client,
    base_url: String,
    scanner: ModelSettings,
    researcher: ModelSettings,
    fixer: ModelSettings,
    reviewer: ModelSettings,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OllamaBackend {
    /// Build the backend from resolved configuration
    pub fn from_config(config: &OllamaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            scanner: config.scanner.clone(),
            researcher: config.researcher.clone(),
            fixer: config.fixer.clone(),
            reviewer: config.reviewer.clone(),
        }
    }

    async fn chat(
        &self,
        settings: &ModelSettings,
        system: &str,
        prompt: &str,
    ) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: &settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: settings.temperature,
                num_predict: settings.max_tokens,
            },
        };

        let url = format!("{}/api/chat", self.base_url);
        debug!(model = %settings.model, %url, "ollama chat request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        Ok(response.message.content)
    }
}

#[async_trait]
impl Scanner for OllamaBackend {
    async fn scan(&self, repo_path: &Path) -> Result<Vec<Vulnerability>, BackendError> {
        let prompt = format!(
            "Analyze the code repository at: {}\n\n\
             Focus on common vulnerability patterns including SQL injection, \
             cross-site scripting, command injection, path traversal, insecure \
             deserialization, authentication/authorization issues, cryptographic \
             weaknesses, and input validation issues.\n\n\
             For each vulnerability found provide: id (unique identifier), title, \
             description, severity (CRITICAL, HIGH, MEDIUM, LOW), cwe_id if \
             applicable, file_path, line_number, code_snippet, and confidence \
             (0.0-1.0).\n\n\
             Return JSON: {{\"vulnerabilities\": [...]}}. Return an empty array \
             if the code is clean.",
            repo_path.display()
        );

        let raw = self.chat(&self.scanner, SCANNER_SYSTEM, &prompt).await?;
        parse::parse_vulnerabilities(&raw)
    }
}

#[async_trait]
impl Researcher for OllamaBackend {
    async fn research(&self, vulnerability: &Vulnerability) -> Result<Research, BackendError> {
        let prompt = format!(
            "Analyze this vulnerability and provide detailed research:\n\n\
             {}\n\n\
             Cover: root cause analysis, attack vectors, business impact, \
             industry-standard remediation approaches, prevention best \
             practices, relevant frameworks (OWASP, NIST), and testing \
             strategies to verify fixes.\n\n\
             Return JSON with \"analysis\" and \"recommendation\" fields.",
            serde_json::to_string_pretty(vulnerability)
                .map_err(|e| BackendError::Malformed(e.to_string()))?
        );

        let raw = self
            .chat(&self.researcher, RESEARCHER_SYSTEM, &prompt)
            .await?;
        Ok(parse::parse_research(&raw, &vulnerability.id))
    }
}

#[async_trait]
impl Fixer for OllamaBackend {
    async fn propose_fix(
        &self,
        vulnerability: &Vulnerability,
        research: &Research,
    ) -> Result<ParseOutcome<Fix>, BackendError> {
        let prompt = format!(
            "Generate a secure fix for this vulnerability:\n\n\
             Vulnerability: {title} ({severity}) in {file} line {line}\n\
             Original code:\n{snippet}\n\n\
             Research analysis:\n{analysis}\n\n\
             Recommended approach:\n{recommendation}\n\n\
             The fix must eliminate the vulnerability, preserve functionality, \
             and follow secure coding standards.\n\n\
             Return JSON with \"fixed_code\", \"explanation\", and \
             \"confidence\" (0.0-1.0) fields.",
            title = vulnerability.title,
            severity = vulnerability.severity,
            file = vulnerability.file_path,
            line = vulnerability.line_number,
            snippet = vulnerability.code_snippet,
            analysis = research.analysis,
            recommendation = research.recommendation,
        );

        let raw = self.chat(&self.fixer, FIXER_SYSTEM, &prompt).await?;
        Ok(parse::parse_fix(&raw, vulnerability))
    }
}

#[async_trait]
impl Reviewer for OllamaBackend {
    async fn review(&self, fix: &Fix) -> Result<ParseOutcome<ReviewVerdict>, BackendError> {
        let prompt = format!(
            "Review this security fix:\n\n\
             Vulnerability: {vuln_id}\n\
             Original vulnerable code:\n{original}\n\n\
             Proposed fix:\n{fixed}\n\n\
             Fixer's explanation:\n{explanation}\n\n\
             Evaluate whether the fix eliminates the vulnerability, whether it \
             introduces new issues, whether functionality is preserved, and \
             whether edge cases are handled.\n\n\
             Return JSON with \"status\" (APPROVED, NEEDS_REVISION, or \
             REJECTED), \"comments\", and \"score\" (0-100) fields.",
            vuln_id = fix.vulnerability_id,
            original = fix.original_code,
            fixed = fix.fixed_code,
            explanation = fix.explanation,
        );

        let raw = self.chat(&self.reviewer, REVIEWER_SYSTEM, &prompt).await?;
        Ok(parse::parse_review(&raw))
    }
}
