use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use super::parse::{parse_title_list, titles_match};
use super::prompts;
use crate::docs::title::CONTRACT_MARKER;
use crate::docs::types::CorpusDocument;
use crate::error::Result;
use crate::llm::{ChatModel, Message};
use crate::state::{RagConfig, SelectorKind, TitleMatch};

/// Documents judged relevant, in candidate order, plus any parsed fragments
/// that matched no candidate title.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub documents: Vec<CorpusDocument>,
    pub unmatched: Vec<String>,
}

impl Selection {
    pub fn titles(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.title.as_str()).collect()
    }
}

/// Decides which candidate documents are relevant to a question.
///
/// Every implementation returns a subset of `candidates` and treats an empty
/// question or empty candidate list as "nothing relevant".
#[async_trait]
pub trait RelevanceSelector: Send + Sync {
    async fn select(&self, question: &str, candidates: &[CorpusDocument]) -> Result<Selection>;

    fn name(&self) -> &'static str;
}

/// Build the selector named by the configuration.
pub fn selector_for(config: &RagConfig, llm: Arc<dyn ChatModel>) -> Box<dyn RelevanceSelector> {
    match config.selector {
        SelectorKind::Model => Box::new(ModelSelector::new(llm, config.title_match)),
        SelectorKind::Pattern => Box::new(PatternSelector),
    }
}

/// Keep the candidates whose title satisfies `is_hit`, in candidate order, once each.
fn filter_candidates<F>(candidates: &[CorpusDocument], mut is_hit: F) -> Vec<CorpusDocument>
where
    F: FnMut(&str) -> bool,
{
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|doc| seen.insert(doc.source_id.clone()) && is_hit(&doc.title))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Model-assisted classification
// ---------------------------------------------------------------------------

/// Asks the completion model to name relevant titles from the candidate list.
pub struct ModelSelector {
    llm: Arc<dyn ChatModel>,
    policy: TitleMatch,
}

impl ModelSelector {
    pub fn new(llm: Arc<dyn ChatModel>, policy: TitleMatch) -> Self {
        Self { llm, policy }
    }

    /// Match a raw classifier reply against the candidates.
    ///
    /// Unparseable or unmatched output selects nothing; it is never an error.
    pub fn match_reply(&self, reply: &str, candidates: &[CorpusDocument]) -> Selection {
        let tokens = parse_title_list(reply);
        let documents = filter_candidates(candidates, |title| {
            tokens.iter().any(|t| titles_match(self.policy, t, title))
        });
        let unmatched: Vec<String> = tokens
            .into_iter()
            .filter(|t| !candidates.iter().any(|d| titles_match(self.policy, t, &d.title)))
            .collect();
        Selection {
            documents,
            unmatched,
        }
    }
}

#[async_trait]
impl RelevanceSelector for ModelSelector {
    async fn select(&self, question: &str, candidates: &[CorpusDocument]) -> Result<Selection> {
        if question.trim().is_empty() || candidates.is_empty() {
            debug!("nothing to classify");
            return Ok(Selection::default());
        }

        let titles: Vec<&str> = candidates.iter().map(|d| d.title.as_str()).collect();
        let messages = [
            Message::system(prompts::SELECT_SYSTEM_PROMPT),
            Message::user(prompts::select_user_prompt(question, &titles)),
        ];
        let reply = self.llm.chat(&messages).await?;
        debug!(reply = %reply, "classifier reply");

        let selection = self.match_reply(&reply, candidates);
        if !selection.unmatched.is_empty() {
            warn!(
                policy = ?self.policy,
                unmatched = ?selection.unmatched,
                "classifier named titles that match no candidate"
            );
        }
        if selection.documents.is_empty() {
            warn!(reply = %reply, "classifier selected no documents");
        }
        info!(selected = ?selection.titles(), "model selection done");
        Ok(selection)
    }

    fn name(&self) -> &'static str {
        "model"
    }
}

// ---------------------------------------------------------------------------
// Pattern extraction
// ---------------------------------------------------------------------------

/// Finds `<name>契約` phrases in the question and matches `<name>` against titles exactly.
pub struct PatternSelector;

/// A run of name characters (kanji, katakana, latin, digits, brackets, `&`, `・`)
/// ending right before the contract marker. Hiragana and punctuation end a name,
/// so particles like `は` or `の` never join it. A trailing `書` belongs to the
/// suffix and is consumed with the marker.
fn contract_phrase() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"([\p{{Han}}\p{{Katakana}}ー・&＆A-Za-zＡ-Ｚａ-ｚ0-9０-９()（）\[\]［］_\-]+?){}(?:書)?",
            CONTRACT_MARKER
        ))
        .expect("static regex")
    })
}

impl PatternSelector {
    /// Name fragments in `question` that precede the contract marker, in order.
    pub fn fragments(question: &str) -> Vec<String> {
        contract_phrase()
            .captures_iter(question)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl RelevanceSelector for PatternSelector {
    async fn select(&self, question: &str, candidates: &[CorpusDocument]) -> Result<Selection> {
        if question.trim().is_empty() || candidates.is_empty() {
            return Ok(Selection::default());
        }

        let fragments = Self::fragments(question);
        let documents =
            filter_candidates(candidates, |title| fragments.iter().any(|f| f == title));
        let unmatched: Vec<String> = fragments
            .into_iter()
            .filter(|f| !candidates.iter().any(|d| &d.title == f))
            .collect();

        if !unmatched.is_empty() {
            debug!(?unmatched, "contract phrases without a matching title");
        }
        let selection = Selection {
            documents,
            unmatched,
        };
        info!(selected = ?selection.titles(), "pattern selection done");
        Ok(selection)
    }

    fn name(&self) -> &'static str {
        "pattern"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::types::SourceRef;
    use crate::llm::testing::ScriptedModel;

    fn doc(title: &str) -> CorpusDocument {
        CorpusDocument {
            source_id: SourceRef::new(format!("mem://{}", title)),
            title: title.to_string(),
            body: format!("{}の本文", title),
            pages: 1,
            digest: String::new(),
        }
    }

    fn corpus(titles: &[&str]) -> Vec<CorpusDocument> {
        titles.iter().map(|t| doc(t)).collect()
    }

    fn titles(selection: &Selection) -> Vec<&str> {
        selection.titles()
    }

    fn is_subset(selection: &Selection, candidates: &[CorpusDocument]) -> bool {
        selection.documents.iter().all(|d| candidates.contains(d))
    }

    #[tokio::test]
    async fn test_model_selects_named_titles() {
        let candidates = corpus(&["A契約", "B契約", "C契約"]);
        let llm = Arc::new(ScriptedModel::new(&["A契約,C契約"]));
        let selector = ModelSelector::new(llm.clone(), TitleMatch::Exact);

        let selection = selector.select("AとCの違いは？", &candidates).await.unwrap();
        assert_eq!(titles(&selection), vec!["A契約", "C契約"]);
        assert!(selection.unmatched.is_empty());
        assert!(is_subset(&selection, &candidates));

        let request = llm.request(0);
        assert_eq!(request[0].role, "system");
        assert_eq!(request[0].content, prompts::SELECT_SYSTEM_PROMPT);
        assert_eq!(
            request[1].content,
            "【質問】AとCの違いは？\n【契約書のタイトルの候補】\nA契約,B契約,C契約"
        );
    }

    #[tokio::test]
    async fn test_model_result_follows_candidate_order() {
        let candidates = corpus(&["A契約", "B契約", "C契約"]);
        let llm = Arc::new(ScriptedModel::new(&["C契約,A契約,C契約"]));
        let selector = ModelSelector::new(llm, TitleMatch::Exact);
        let selection = selector.select("質問", &candidates).await.unwrap();
        assert_eq!(titles(&selection), vec!["A契約", "C契約"]);
    }

    #[tokio::test]
    async fn test_model_exact_rejects_near_miss() {
        let candidates = corpus(&["A契約", "B契約"]);
        let llm = Arc::new(ScriptedModel::new(&["A契約, B契約"]));
        let selector = ModelSelector::new(llm, TitleMatch::Exact);
        let selection = selector.select("質問", &candidates).await.unwrap();
        assert_eq!(titles(&selection), vec!["A契約"]);
        assert_eq!(selection.unmatched, vec![" B契約"]);
    }

    #[tokio::test]
    async fn test_model_normalized_accepts_near_miss() {
        let candidates = corpus(&["A契約", "B契約"]);
        let llm = Arc::new(ScriptedModel::new(&["A契約, B 契約\n"]));
        let selector = ModelSelector::new(llm, TitleMatch::Normalized);
        let selection = selector.select("質問", &candidates).await.unwrap();
        assert_eq!(titles(&selection), vec!["A契約", "B契約"]);
        assert!(selection.unmatched.is_empty());
    }

    #[tokio::test]
    async fn test_model_malformed_reply_selects_nothing() {
        let candidates = corpus(&["A契約", "B契約"]);
        let llm = Arc::new(ScriptedModel::new(&["- A契約\n- B契約"]));
        let selector = ModelSelector::new(llm, TitleMatch::Exact);
        let selection = selector.select("質問", &candidates).await.unwrap();
        assert!(selection.documents.is_empty());
        assert_eq!(selection.unmatched.len(), 1);
    }

    #[tokio::test]
    async fn test_model_hallucinated_title_is_not_fabricated() {
        let candidates = corpus(&["A契約"]);
        let llm = Arc::new(ScriptedModel::new(&["Z契約"]));
        let selector = ModelSelector::new(llm, TitleMatch::Normalized);
        let selection = selector.select("質問", &candidates).await.unwrap();
        assert!(selection.documents.is_empty());
        assert!(is_subset(&selection, &candidates));
    }

    #[tokio::test]
    async fn test_model_skips_call_on_empty_input() {
        let llm = Arc::new(ScriptedModel::new(&[]));
        let selector = ModelSelector::new(llm.clone(), TitleMatch::Exact);

        let selection = selector.select("", &corpus(&["A契約"])).await.unwrap();
        assert!(selection.documents.is_empty());
        let selection = selector.select("質問", &[]).await.unwrap();
        assert!(selection.documents.is_empty());
        assert_eq!(llm.request_count(), 0);
    }

    #[tokio::test]
    async fn test_model_backend_failure_is_fatal() {
        let llm = Arc::new(ScriptedModel::failing("connection refused"));
        let selector = ModelSelector::new(llm, TitleMatch::Exact);
        let err = selector.select("質問", &corpus(&["A契約"])).await.unwrap_err();
        assert!(matches!(err, crate::error::RagError::Generation(_)));
    }

    #[test]
    fn test_fragments() {
        assert_eq!(
            PatternSelector::fragments("ソフトウェア開発業務委託契約について、委託料はいくらですか"),
            vec!["ソフトウェア開発業務委託"]
        );
        assert_eq!(
            PatternSelector::fragments("この質問はコールセンター業務委託契約書と技術検証（PoC）契約の比較です"),
            vec!["コールセンター業務委託", "技術検証（PoC）"]
        );
        assert!(PatternSelector::fragments("契約の成立前に交わされた口頭の約束は有効か？").is_empty());
    }

    #[tokio::test]
    async fn test_pattern_selects_literal_title() {
        let candidates = corpus(&["コールセンター業務委託", "ソフトウェア開発業務委託", "コンサルティング業務委託"]);
        let selection = PatternSelector
            .select("ソフトウェア開発業務委託契約について、委託料はいくらですか", &candidates)
            .await
            .unwrap();
        assert_eq!(titles(&selection), vec!["ソフトウェア開発業務委託"]);
        assert!(is_subset(&selection, &candidates));
    }

    #[tokio::test]
    async fn test_pattern_two_contracts_joined_by_dot() {
        let question = "コールセンター業務委託契約書・コンサルティング業務委託契約書の違いは？";
        assert_eq!(
            PatternSelector::fragments(question),
            vec!["コールセンター業務委託", "コンサルティング業務委託"]
        );

        let candidates = corpus(&["コンサルティング業務委託", "ソフトウェア開発業務委託", "コールセンター業務委託"]);
        let selection = PatternSelector.select(question, &candidates).await.unwrap();
        assert_eq!(
            titles(&selection),
            vec!["コンサルティング業務委託", "コールセンター業務委託"]
        );
        assert!(selection.unmatched.is_empty());
    }

    #[tokio::test]
    async fn test_pattern_misses_paraphrase() {
        let candidates = corpus(&["ソフトウェア開発業務委託"]);
        let selection = PatternSelector
            .select("ソフトウェアの開発を委託する契約の委託料は？", &candidates)
            .await
            .unwrap();
        assert!(selection.documents.is_empty());
    }

    #[tokio::test]
    async fn test_pattern_empty_inputs() {
        let selection = PatternSelector.select("", &corpus(&["A"])).await.unwrap();
        assert!(selection.documents.is_empty());
        let selection = PatternSelector.select("A契約", &[]).await.unwrap();
        assert!(selection.documents.is_empty());
    }

    #[test]
    fn test_selector_for_config() {
        let llm: Arc<dyn ChatModel> = Arc::new(ScriptedModel::new(&[]));
        let mut config = RagConfig::default();
        assert_eq!(selector_for(&config, llm.clone()).name(), "model");
        config.selector = SelectorKind::Pattern;
        assert_eq!(selector_for(&config, llm).name(), "pattern");
    }
}
