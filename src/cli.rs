use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::{RagError, Result};
use crate::state::{AppState, RagConfig, SelectorKind, TitleMatch};

/// Answer a question about the contract corpus, grounded in the contracts' text.
#[derive(Debug, Parser)]
#[command(name = "contract-rag", version)]
pub struct Cli {
    /// The question, e.g. "ソフトウェア開発業務委託契約について、委託料はいくらですか"
    pub question: String,

    /// Relevance strategy: model | pattern (overrides RAG_SELECTOR)
    #[arg(long)]
    pub selector: Option<SelectorKind>,

    /// Classifier title matching: exact | normalized (overrides RAG_TITLE_MATCH)
    #[arg(long)]
    pub title_match: Option<TitleMatch>,

    /// Leave the example answers out of the answer prompt
    #[arg(long)]
    pub no_few_shot: bool,
}

impl Cli {
    pub fn apply(&self, config: &mut RagConfig) {
        if let Some(selector) = self.selector {
            config.selector = selector;
        }
        if let Some(policy) = self.title_match {
            config.title_match = policy;
        }
        if self.no_few_shot {
            config.few_shot = false;
        }
    }
}

/// The single line written to stdout.
#[derive(Debug, Serialize, Deserialize)]
pub struct Output {
    pub result: String,
    pub run_id: String,
}

/// Run the pipeline once under a fresh run id.
pub async fn ask(state: &AppState, question: &str) -> Result<Output> {
    let run_id = Uuid::now_v7();
    let span = info_span!("rag", %run_id);

    async {
        info!(
            model = %state.config.model,
            selector = ?state.config.selector,
            question,
            "query started"
        );
        let response = state.rag.query(question).await?;
        info!(
            selected = ?response.selected,
            context_len = response.context_len,
            answer_len = response.answer.len(),
            "query complete"
        );
        Ok::<_, RagError>(Output {
            result: response.answer,
            run_id: run_id.to_string(),
        })
    }
    .instrument(span)
    .await
}
