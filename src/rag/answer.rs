use std::sync::Arc;

use tracing::{debug, info};

use super::prompts;
use crate::error::Result;
use crate::llm::{ChatModel, Message};

/// Single-shot grounded answer generation. The reply is returned verbatim.
pub struct AnswerSynthesizer {
    llm: Arc<dyn ChatModel>,
    system_prompt: String,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn ChatModel>, few_shot: bool) -> Self {
        Self {
            llm,
            system_prompt: prompts::answer_system_prompt(few_shot),
        }
    }

    pub fn messages(&self, question: &str, context: &str) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt.clone()),
            Message::user(prompts::answer_user_prompt(question, context)),
        ]
    }

    /// Generate an answer even when `context` is empty; the prompt then obliges
    /// the model to say the information is missing.
    pub async fn answer(&self, question: &str, context: &str) -> Result<String> {
        if context.is_empty() {
            debug!("answering without context");
        }
        let answer = self.llm.chat(&self.messages(question, context)).await?;
        info!(context_len = context.len(), answer_len = answer.len(), "answer generated");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;

    #[tokio::test]
    async fn test_reply_passed_through_verbatim() {
        let reply = "  委託料の金額は金五百万円（税別）です。\n";
        let llm = Arc::new(ScriptedModel::new(&[reply]));
        let synth = AnswerSynthesizer::new(llm.clone(), true);

        let answer = synth.answer("委託料は？", "委託料は金五百万円（税別）とする。").await.unwrap();
        assert_eq!(answer, reply);

        let request = llm.request(0);
        assert_eq!(request.len(), 2);
        assert_eq!(request[0].content, prompts::answer_system_prompt(true));
        assert_eq!(
            request[1].content,
            "【コンテキスト】\n委託料は金五百万円（税別）とする。\n\n【質問】委託料は？"
        );
    }

    #[tokio::test]
    async fn test_empty_context_still_calls_model() {
        let llm = Arc::new(ScriptedModel::new(&[
            "提供されたコンテキストには該当する情報がありません。",
        ]));
        let synth = AnswerSynthesizer::new(llm.clone(), false);

        let answer = synth.answer("保証期間は？", "").await.unwrap();
        assert!(answer.contains("情報がありません"));
        assert_eq!(llm.request_count(), 1);
        assert_eq!(llm.request(0)[0].content, prompts::ANSWER_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let llm = Arc::new(ScriptedModel::failing("HTTP 503"));
        let synth = AnswerSynthesizer::new(llm, true);
        assert!(synth.answer("質問", "本文").await.is_err());
    }
}
