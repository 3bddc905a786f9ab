use std::sync::OnceLock;

use regex::Regex;

/// Marker that ends a contract's name on its cover page. Also covers `契約書`.
pub const CONTRACT_MARKER: &str = "契約";

/// Page-number marker `1` together with any whitespace around it.
fn page_number_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*1\s*").expect("static regex"))
}

/// Strip newlines and ASCII spaces, then the page-number marker.
pub fn normalize_first_page(text: &str) -> String {
    let compact: String = text.chars().filter(|c| *c != '\n' && *c != ' ').collect();
    page_number_marker().replace_all(&compact, "").into_owned()
}

/// Derive a document title from the raw text of its first page.
///
/// The normalized page is cut at the first [`CONTRACT_MARKER`] and the prefix
/// kept. Without a marker the whole normalized page is the title.
pub fn derive_title(first_page: &str) -> String {
    let normalized = normalize_first_page(first_page);
    match normalized.split_once(CONTRACT_MARKER) {
        Some((prefix, _)) => prefix.to_string(),
        None => normalized,
    }
}

/// Body text of one page: newlines removed, nothing else touched.
pub fn page_body(text: &str) -> String {
    text.replace('\n', "")
}
