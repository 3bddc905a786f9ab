use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::Level;

use crate::docs::fetch::HttpFetcher;
use crate::docs::types::SourceRef;
use crate::docs::DocumentStore;
use crate::error::{RagError, Result};
use crate::llm::{ChatModel, LlmClient};
use crate::rag::RagEngine;
use crate::retry::RetryPolicy;

const DATASET_BASE: &str =
    "https://storage.googleapis.com/gg-raggle-public/competitions/29676d73-5675-4278-b1a6-d4a9fdd0a0ba/dataset";

/// The fixed contract corpus, in load order.
const CORPUS_FILES: &[&str] = &[
    "Architectural_Design_Service_Contract.pdf",
    "Call_Center_Operation_Service_Contract.pdf",
    "Consulting_Service_Contract.pdf",
    "Content_Production_Service_Contract_(Request_Form).pdf",
    "Customer_Referral_Contract.pdf",
    "Draft_Editing_Service_Contract.pdf",
    "Graphic_Design_Production_Service_Contract.pdf",
    "M&A_Advisory_Service_Contract_(Preparatory_Committee).pdf",
    "M&A_Intermediary_Service_Contract_SME_M&A_[Small_and_Medium_Enterprises].pdf",
    "Manufacturing_Sales_Post-Safety_Management_Contract.pdf",
    "software_development_outsourcing_contracts.pdf",
    "Technical_Verification_(PoC)_Contract.pdf",
];

/// Which relevance strategy picks documents for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    /// Ask the completion model to pick titles from the candidate list.
    Model,
    /// Match `<name>契約` fragments in the question against titles.
    Pattern,
}

impl FromStr for SelectorKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "model" => Ok(Self::Model),
            "pattern" => Ok(Self::Pattern),
            other => Err(RagError::config(format!(
                "unknown selector '{}', expected 'model' or 'pattern'",
                other
            ))),
        }
    }
}

/// How classifier tokens are compared with stored titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMatch {
    /// Byte-for-byte equality, including case and internal whitespace.
    Exact,
    /// Equality after trimming, dropping all whitespace, and lowercasing.
    Normalized,
}

impl FromStr for TitleMatch {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "normalized" => Ok(Self::Normalized),
            other => Err(RagError::config(format!(
                "unknown title match policy '{}', expected 'exact' or 'normalized'",
                other
            ))),
        }
    }
}

/// Process configuration, built once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub selector: SelectorKind,
    pub title_match: TitleMatch,
    pub few_shot: bool,
    pub fetch_concurrency: usize,
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub log_level: Level,
    pub sources: Vec<SourceRef>,
}

impl Default for RagConfig {
    fn default() -> Self {
        let sources = default_sources();
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            temperature: 0.0,
            selector: SelectorKind::Model,
            title_match: TitleMatch::Exact,
            few_shot: true,
            fetch_concurrency: sources.len(),
            max_retries: 0,
            request_timeout: Duration::from_secs(120),
            log_level: Level::INFO,
            sources,
        }
    }
}

impl RagConfig {
    /// Read configuration from the process environment (and `.env`).
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unset or empty keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("LLM_BASE_URL") {
            config.base_url = url;
        }
        if let Some(model) = get("LLM_MODEL") {
            config.model = model;
        }
        config.api_key = get("LLM_API_KEY").or_else(|| get("OPENAI_API_KEY"));

        if let Some(v) = get("RAG_SELECTOR") {
            config.selector = v.parse()?;
        }
        if let Some(v) = get("RAG_TITLE_MATCH") {
            config.title_match = v.parse()?;
        }
        if let Some(v) = get("RAG_FEW_SHOT") {
            config.few_shot = parse_bool("RAG_FEW_SHOT", &v)?;
        }
        if let Some(v) = get("RAG_FETCH_CONCURRENCY") {
            let n: usize = parse_number("RAG_FETCH_CONCURRENCY", &v)?;
            if n == 0 {
                return Err(RagError::config("RAG_FETCH_CONCURRENCY must be at least 1"));
            }
            config.fetch_concurrency = n;
        }
        if let Some(v) = get("RAG_MAX_RETRIES") {
            config.max_retries = parse_number("RAG_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("RAG_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = parse_number("RAG_REQUEST_TIMEOUT_SECS", &v)?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = get("RAG_LOG") {
            config.log_level = v
                .trim()
                .parse()
                .map_err(|_| RagError::config(format!("RAG_LOG: invalid level '{}'", v)))?;
        }

        Ok(config)
    }
}

fn default_sources() -> Vec<SourceRef> {
    CORPUS_FILES
        .iter()
        .map(|file| SourceRef::new(format!("{}/{}", DATASET_BASE, file)))
        .collect()
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RagError::config(format!("{}: expected a number, got '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RagError::config(format!(
            "{}: expected a boolean, got '{}'",
            key, value
        ))),
    }
}

/// Everything one invocation needs, wired from a [`RagConfig`].
pub struct AppState {
    pub config: Arc<RagConfig>,
    pub rag: RagEngine,
}

impl AppState {
    pub fn new(config: RagConfig) -> Result<Self> {
        let retry = RetryPolicy::new(config.max_retries);
        let fetcher = Arc::new(HttpFetcher::new(config.request_timeout, retry)?);
        let store = Arc::new(DocumentStore::new(fetcher, config.fetch_concurrency));
        let llm: Arc<dyn ChatModel> = Arc::new(LlmClient::new(&config)?);
        let rag = RagEngine::new(&config, store, llm);
        Ok(Self {
            config: Arc::new(config),
            rag,
        })
    }
}
