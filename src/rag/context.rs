use crate::docs::types::CorpusDocument;

/// Blank line between documents in the assembled context.
pub const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Join the selected bodies in selection order. No dedup, no cap; empty in, empty out.
pub fn assemble(documents: &[CorpusDocument]) -> String {
    documents
        .iter()
        .map(|d| d.body.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR)
}
