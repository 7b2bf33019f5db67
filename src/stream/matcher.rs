use std::collections::HashSet;

/// Case-insensitive substring matcher over one snapshot of tracked terms.
///
/// An option listed by several polls appears once per listing and yields one
/// vote per listing.
#[derive(Debug, Clone)]
pub struct TermMatcher {
    terms: Vec<(String, String)>,
}

impl TermMatcher {
    pub fn new(terms: Vec<String>) -> Self {
        let terms = terms
            .into_iter()
            .filter(|t| !t.is_empty())
            .map(|t| {
                let lower = t.to_lowercase();
                (t, lower)
            })
            .collect();
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// The `track` request parameter: distinct terms joined by commas.
    pub fn track_param(&self) -> String {
        let mut seen = HashSet::new();
        self.terms
            .iter()
            .map(|(t, _)| t.as_str())
            .filter(|t| seen.insert(*t))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Terms contained in `text`, in tracked order, once per listing.
    pub fn matches<'a>(&'a self, text: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        let text = text.to_lowercase();
        self.terms
            .iter()
            .filter(move |(_, lower)| text.contains(lower.as_str()))
            .map(|(term, _)| term.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(terms: &[&str]) -> TermMatcher {
        TermMatcher::new(terms.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_matches_case_insensitively() {
        let m = matcher(&["coke", "pepsi"]);
        let hits: Vec<_> = m.matches("I love coke and Pepsi").collect();
        assert_eq!(hits, vec!["coke", "pepsi"]);
    }

    #[test]
    fn test_keeps_original_spelling_of_term() {
        let m = matcher(&["Dr Pepper"]);
        let hits: Vec<_> = m.matches("DR PEPPER all day").collect();
        assert_eq!(hits, vec!["Dr Pepper"]);
    }

    #[test]
    fn test_one_vote_per_term_per_item() {
        let m = matcher(&["coke"]);
        assert_eq!(m.matches("coke coke COKE").count(), 1);
    }

    #[test]
    fn test_substring_match_counts() {
        let m = matcher(&["cat"]);
        assert_eq!(m.matches("concatenate").count(), 1);
        assert_eq!(m.matches("dog").count(), 0);
    }

    #[test]
    fn test_duplicate_terms_vote_once_per_listing() {
        let m = matcher(&["coke", "", "coke", "Coke"]);
        assert_eq!(m.len(), 3);
        assert_eq!(m.track_param(), "coke,Coke");
        let hits: Vec<_> = m.matches("coke!").collect();
        assert_eq!(hits, vec!["coke", "coke", "Coke"]);
    }

    #[test]
    fn test_no_terms() {
        let m = matcher(&[]);
        assert!(m.is_empty());
        assert_eq!(m.matches("anything").count(), 0);
    }
}
