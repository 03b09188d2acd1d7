/// Check whether a lowercased haystack contains a term.
///
/// Multi-word terms match as plain substrings; single-word terms must match
/// on word boundaries so "hi" does not fire inside "this".
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.contains(' ') {
        return haystack.contains(term);
    }
    haystack
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .any(|word| word.trim_matches('\'') == term)
}

/// Lowercase a message once for the keyword scanners.
pub fn normalize(message: &str) -> String {
    message.to_lowercase()
}
