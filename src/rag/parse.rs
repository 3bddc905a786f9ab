use crate::state::TitleMatch;

/// Separator the classifier is told to put between titles.
pub const TITLE_SEPARATOR: char = ',';

/// Split a classifier reply into title tokens. Empty tokens are dropped;
/// nothing else is touched, so exact matching sees the model's bytes.
pub fn parse_title_list(reply: &str) -> Vec<String> {
    reply
        .split(TITLE_SEPARATOR)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Key a title or token is compared by under `policy`.
pub fn match_key(policy: TitleMatch, text: &str) -> String {
    match policy {
        TitleMatch::Exact => text.to_string(),
        TitleMatch::Normalized => text
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase(),
    }
}

pub fn titles_match(policy: TitleMatch, token: &str, title: &str) -> bool {
    match policy {
        TitleMatch::Exact => token == title,
        TitleMatch::Normalized => match_key(policy, token) == match_key(policy, title),
    }
}
