use std::fmt;

/// Fetch location of one corpus member. Unique within a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased file extension of the location, ignoring query and fragment.
    pub fn extension(&self) -> Option<String> {
        let path = self.0.split(['?', '#']).next().unwrap_or(&self.0);
        let file = path.rsplit('/').next()?;
        let (_, ext) = file.rsplit_once('.')?;
        Some(ext.to_lowercase())
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decoded contract, alive for a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusDocument {
    pub source_id: SourceRef,
    /// Derived from the first page; see `docs::title::derive_title`.
    pub title: String,
    /// Every page's text, newlines removed, in page order.
    pub body: String,
    pub pages: usize,
    /// blake3 hex of the fetched bytes.
    pub digest: String,
}
