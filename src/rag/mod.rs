pub mod answer;
pub mod context;
pub mod parse;
pub mod prompts;
pub mod select;

use std::sync::Arc;

use tracing::{debug, info};

use crate::docs::types::SourceRef;
use crate::docs::DocumentStore;
use crate::error::Result;
use crate::llm::ChatModel;
use crate::state::RagConfig;

use answer::AnswerSynthesizer;
use select::{selector_for, RelevanceSelector};

#[derive(Debug)]
pub struct RagResponse {
    pub answer: String,
    /// Titles of the documents the answer was grounded in, in context order.
    pub selected: Vec<String>,
    pub context_len: usize,
}

/// Question in, grounded answer out. Every call reloads the corpus from scratch.
pub struct RagEngine {
    store: Arc<DocumentStore>,
    sources: Vec<SourceRef>,
    selector: Box<dyn RelevanceSelector>,
    synthesizer: AnswerSynthesizer,
}

impl RagEngine {
    pub fn new(config: &RagConfig, store: Arc<DocumentStore>, llm: Arc<dyn ChatModel>) -> Self {
        Self {
            store,
            sources: config.sources.clone(),
            selector: selector_for(config, llm.clone()),
            synthesizer: AnswerSynthesizer::new(llm, config.few_shot),
        }
    }

    pub async fn query(&self, question: &str) -> Result<RagResponse> {
        let corpus = self.store.load_all(&self.sources).await?;
        debug!(
            titles = ?corpus.iter().map(|d| d.title.as_str()).collect::<Vec<_>>(),
            "candidates"
        );

        let selection = self.selector.select(question, &corpus).await?;
        info!(
            strategy = self.selector.name(),
            selected = selection.documents.len(),
            candidates = corpus.len(),
            "relevance selection complete"
        );

        let context = context::assemble(&selection.documents);
        let answer = self.synthesizer.answer(question, &context).await?;

        Ok(RagResponse {
            answer,
            selected: selection.titles().into_iter().map(str::to_string).collect(),
            context_len: context.len(),
        })
    }
}
